use std::io::{self, Write};
use std::net::TcpStream;
use std::time::Duration;

use imap::types::Uid;

use crate::config::ConfigError;

/// Errors returned while opening the connection, before any login.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("cannot resolve {host}:{port}: {source}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("no address found for {0}")]
    NoAddress(String),

    #[error("TCP connection failed: {0}")]
    Tcp(#[source] io::Error),

    #[error("TLS connector error: {0}")]
    TlsConnector(#[source] native_tls::Error),

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(#[source] native_tls::HandshakeError<TcpStream>),

    #[error("no IMAP greeting: {0}")]
    Greeting(#[source] imap::Error),
}

/// A fetched message that cannot be turned into a summary.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("message {0} has no header section")]
    MissingHeader(Uid),

    #[error("message {uid} has a malformed header: {source}")]
    Header {
        uid: Uid,
        #[source]
        source: mailparse::MailParseError,
    },
}

/// Every way a check can fail, one variant per step.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Connect(#[from] ConnectError),

    #[error("authentication timed out after {} ms", .0.as_millis())]
    AuthTimeout(Duration),

    #[error("authentication failed: {0}")]
    Auth(#[source] imap::Error),

    #[error("cannot select mailbox {mailbox}: {source}")]
    Select {
        mailbox: String,
        #[source]
        source: imap::Error,
    },

    #[error("search failed: {0}")]
    Search(#[source] imap::Error),

    #[error("fetch failed: {0}")]
    Fetch(#[source] imap::Error),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("cannot write output: {0}")]
    Output(#[source] io::Error),
}

/// Writes the single user-facing failure line.
pub fn report<W: Write>(err: &CheckError, w: &mut W) -> io::Result<()> {
    writeln!(w, "Error: {}", err)
}
