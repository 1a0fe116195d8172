use std::fmt;

use imap::types::Uid;
use mailparse::MailHeaderMap;

use crate::error::ParseError;

/// Summary of one unseen message, as printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub uid: Uid,
    pub subject: String,
    pub sender: String,
    /// Size of the fetched TEXT section in bytes, 0 when the server sent none.
    pub text_len: usize,
}

impl Message {
    /// Builds a summary from the raw `BODY[HEADER]` and `BODY[TEXT]` sections.
    ///
    /// Only the first `Subject` and `From` values are used. Encoded words are
    /// decoded; an absent header yields an empty string.
    pub fn parse(uid: Uid, header: &[u8], text: Option<&[u8]>) -> Result<Self, ParseError> {
        let (headers, _) =
            mailparse::parse_headers(header).map_err(|source| ParseError::Header { uid, source })?;

        Ok(Self {
            uid,
            subject: headers.get_first_value("Subject").unwrap_or_default(),
            sender: headers.get_first_value("From").unwrap_or_default(),
            text_len: text.map_or(0, <[u8]>::len),
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Message ID: {}", self.uid)?;
        writeln!(f, "Subject: {}", self.subject)?;
        writeln!(f, "From: {}", self.sender)?;
        write!(f, "---")
    }
}
