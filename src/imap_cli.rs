use std::fmt;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use imap::types::Uid;
use log::{debug, info};

use crate::config::ConnectionConfig;
use crate::error::{CheckError, ConnectError, ParseError};
use crate::message::Message;

/// Fetch items requested per message. `PEEK` keeps `\Seen` untouched.
pub const FETCH_QUERY: &str = "(UID BODY.PEEK[HEADER] BODY.PEEK[TEXT])";

/// Byte stream an IMAP session can run over, plain or TLS.
pub trait Transport: Read + Write + Send + fmt::Debug {}

impl<T: Read + Write + Send + fmt::Debug> Transport for T {}

/// An authenticated session. Logs out when dropped.
pub struct ImapCli<T: Read + Write> {
    session: imap::Session<T>,
}

impl ImapCli<Box<dyn Transport>> {
    /// Opens a connection and logs in. Connecting, the greeting and the login
    /// exchange all share `config.auth_timeout`.
    pub fn connect(config: &ConnectionConfig) -> Result<Self, CheckError> {
        let timeout = config.auth_timeout;
        let tcp = open_tcp(&config.host, config.port, timeout).map_err(|e| match e {
            ConnectError::Tcp(ref io) if is_timeout(io) => CheckError::AuthTimeout(timeout),
            e => e.into(),
        })?;
        tcp.set_read_timeout(Some(timeout))
            .and_then(|_| tcp.set_write_timeout(Some(timeout)))
            .map_err(ConnectError::Tcp)?;
        let timeouts = tcp.try_clone().map_err(ConnectError::Tcp)?;

        let stream: Box<dyn Transport> = if config.use_tls {
            let connector = native_tls::TlsConnector::new().map_err(ConnectError::TlsConnector)?;
            let tls = connector.connect(&config.host, tcp).map_err(|e| match e {
                // A blocking socket only reports WouldBlock when its timeout fires.
                native_tls::HandshakeError::WouldBlock(_) => CheckError::AuthTimeout(timeout),
                e => ConnectError::TlsHandshake(e).into(),
            })?;
            Box::new(tls)
        } else {
            Box::new(tcp)
        };

        let mut client = imap::Client::new(stream);
        client.read_greeting().map_err(|e| match e {
            imap::Error::Io(ref io) if is_timeout(io) => CheckError::AuthTimeout(timeout),
            e => ConnectError::Greeting(e).into(),
        })?;
        debug!("greeting received from {}:{}", config.host, config.port);

        let cli = Self::login(client, &config.user, config.password.as_str()).map_err(|e| match e {
            CheckError::Auth(imap::Error::Io(ref io)) if is_timeout(io) => {
                CheckError::AuthTimeout(timeout)
            }
            e => e,
        })?;

        // The timeouts only bound authentication.
        if let Err(e) = timeouts
            .set_read_timeout(None)
            .and_then(|_| timeouts.set_write_timeout(None))
        {
            debug!("cannot clear socket timeouts: {}", e);
        }

        info!(
            "logged in to {}:{} as {} (tls: {})",
            config.host, config.port, config.user, config.use_tls
        );
        Ok(cli)
    }
}

impl<T: Read + Write> ImapCli<T> {
    /// Logs in over an already greeted client.
    pub fn login(client: imap::Client<T>, user: &str, password: &str) -> Result<Self, CheckError> {
        let session = client
            .login(user, password)
            .map_err(|(e, _client)| CheckError::Auth(e))?;
        Ok(Self { session })
    }

    /// Selects `mailbox` and returns its message count.
    pub fn select(&mut self, mailbox: &str) -> Result<u32, CheckError> {
        let mb = self
            .session
            .select(mailbox)
            .map_err(|source| CheckError::Select {
                mailbox: mailbox.to_string(),
                source,
            })?;
        Ok(mb.exists)
    }

    /// UIDs of messages without `\Seen`, ascending.
    pub fn unseen_uids(&mut self) -> Result<Vec<Uid>, CheckError> {
        let unseen = self
            .session
            .uid_search("UNSEEN")
            .map_err(CheckError::Search)?;
        let mut uids: Vec<Uid> = unseen.into_iter().collect();
        uids.sort_unstable();
        Ok(uids)
    }

    /// Fetches header and text of `uids` without marking them seen. `uids` must
    /// be ascending; the result follows that order and UIDs the server did not
    /// return are skipped.
    pub fn fetch_messages(&mut self, uids: &[Uid]) -> Result<Vec<Message>, CheckError> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let uid_set = uids
            .iter()
            .map(|uid| uid.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let fetched = self
            .session
            .uid_fetch(uid_set, FETCH_QUERY)
            .map_err(CheckError::Fetch)?;

        // Unsolicited FETCH responses (flag changes from other clients) may be
        // interleaved; only header-bearing items for requested UIDs count.
        let mut messages = Vec::with_capacity(uids.len());
        let mut headerless = Vec::new();
        for fetch in fetched.iter() {
            let uid = match fetch.uid {
                Some(uid) if uids.binary_search(&uid).is_ok() => uid,
                other => {
                    debug!("ignoring unsolicited fetch (seq {}, uid {:?})", fetch.message, other);
                    continue;
                }
            };
            match fetch.header() {
                Some(header) => messages.push(Message::parse(uid, header, fetch.text())?),
                None => headerless.push(uid),
            }
        }
        messages.sort_by_key(|m| m.uid);
        messages.dedup_by_key(|m| m.uid);

        if let Some(uid) = headerless
            .into_iter()
            .find(|uid| messages.binary_search_by_key(uid, |m| m.uid).is_err())
        {
            return Err(ParseError::MissingHeader(uid).into());
        }
        Ok(messages)
    }
}

impl<T: Read + Write> Drop for ImapCli<T> {
    fn drop(&mut self) {
        match self.session.logout() {
            Ok(()) => debug!("logged out"),
            Err(e) => debug!("logout failed: {}", e),
        }
    }
}

fn open_tcp(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, ConnectError> {
    let addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ConnectError::Resolve {
            host: host.to_string(),
            port,
            source,
        })?;

    let mut last_err = None;
    for addr in addrs {
        debug!("connecting to {}", addr);
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(match last_err {
        Some(e) => ConnectError::Tcp(e),
        None => ConnectError::NoAddress(format!("{}:{}", host, port)),
    })
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
