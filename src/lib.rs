//! Prints a summary of every unseen message in an IMAP mailbox without
//! marking anything as read.

pub mod checker;
pub mod config;
pub mod error;
pub mod imap_cli;
pub mod logging;
pub mod message;

pub use checker::{check_unseen, run};
pub use config::ConnectionConfig;
pub use error::{report, CheckError};
pub use imap_cli::ImapCli;
pub use message::Message;
