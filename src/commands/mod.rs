//! Subcommand handlers.
//!
//! Each file in this module corresponds to one user-facing command:
//!
//! | File          | Invocation                          | Description                         |
//! |---------------|-------------------------------------|-------------------------------------|
//! | `init.rs`     | `git-backup init SRC [DEST...]`     | Set up source and destination repos |
//! | `commit.rs`   | `git-backup commit [SRC]`           | Commit new files, pull destinations |
//! | `info.rs`     | `git-backup info`                   | Show sources and destination state  |

pub mod commit;
pub mod info;
pub mod init;
