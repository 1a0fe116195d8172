//! The unseen-mail check: select, search, fetch, print.

use std::io::{Read, Write};

use log::{debug, info};

use crate::config::ConnectionConfig;
use crate::error::CheckError;
use crate::imap_cli::ImapCli;

/// Connects with `config`, prints every unseen message of `config.mailbox`
/// to `out` and returns how many were printed.
///
/// The session is logged out whether or not the check succeeds.
pub fn check_unseen<W: Write>(config: &ConnectionConfig, out: &mut W) -> Result<usize, CheckError> {
    let mut cli = ImapCli::connect(config)?;
    run(&mut cli, &config.mailbox, out)
}

/// Runs the check over an established session.
pub fn run<T, W>(cli: &mut ImapCli<T>, mailbox: &str, out: &mut W) -> Result<usize, CheckError>
where
    T: Read + Write,
    W: Write,
{
    let exists = cli.select(mailbox)?;
    info!("selected {} ({} messages)", mailbox, exists);

    let uids = cli.unseen_uids()?;
    info!("{} unseen in {}", uids.len(), mailbox);

    let messages = cli.fetch_messages(&uids)?;
    for msg in &messages {
        debug!("uid {}: {} bytes of text", msg.uid, msg.text_len);
        writeln!(out, "{}", msg).map_err(CheckError::Output)?;
    }
    out.flush().map_err(CheckError::Output)?;

    Ok(messages.len())
}
