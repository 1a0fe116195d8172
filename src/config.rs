use serde_derive::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 993;
pub const DEFAULT_AUTH_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_MAILBOX: &str = "INBOX";

/// Environment variable holding the path of the config file.
pub const CONFIG_PATH_VAR: &str = "MAIL_CHECKER_CONFIG";

const ENV_PREFIX: &str = "MAIL_CHECKER_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: String, value: String },

    #[error("missing required setting `{0}`")]
    Missing(&'static str),
}

/// Account password. Never printed by `Debug`.
#[derive(Deserialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

/// Everything needed to reach and authenticate against one mailbox.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub user: String,
    pub password: Password,
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
    pub auth_timeout: Duration,
    pub mailbox: String,
}

/// On-disk layout, every key optional so the environment can fill the gaps.
#[derive(Deserialize, Debug, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub imap: ImapSection,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct ImapSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<Password>,
    pub tls: Option<bool>,
    pub auth_timeout_ms: Option<u64>,
    pub mailbox: Option<String>,
}

pub fn read_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let conf = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&conf).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

impl ImapSection {
    /// Overlays `MAIL_CHECKER_*` values found through `lookup` onto the file values.
    pub fn overlay_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            let key = format!("{}{}", ENV_PREFIX, name);
            lookup(&key).map(|value| (key, value))
        };

        if let Some((_, v)) = var("HOST") {
            self.host = Some(v);
        }
        if let Some((key, v)) = var("PORT") {
            self.port = Some(parse_num(&key, &v)?);
        }
        if let Some((_, v)) = var("USER") {
            self.user = Some(v);
        }
        if let Some((_, v)) = var("PASSWORD") {
            self.password = Some(Password::new(v));
        }
        if let Some((key, v)) = var("TLS") {
            self.tls = Some(parse_bool(&key, &v)?);
        }
        if let Some((key, v)) = var("AUTH_TIMEOUT_MS") {
            self.auth_timeout_ms = Some(parse_num(&key, &v)?);
        }
        if let Some((_, v)) = var("MAILBOX") {
            self.mailbox = Some(v);
        }
        Ok(self)
    }

    pub fn into_connection_config(self) -> Result<ConnectionConfig, ConfigError> {
        Ok(ConnectionConfig {
            host: self.host.ok_or(ConfigError::Missing("host"))?,
            user: self.user.ok_or(ConfigError::Missing("user"))?,
            password: self.password.ok_or(ConfigError::Missing("password"))?,
            port: self.port.unwrap_or(DEFAULT_PORT),
            use_tls: self.tls.unwrap_or(true),
            auth_timeout: Duration::from_millis(
                self.auth_timeout_ms.unwrap_or(DEFAULT_AUTH_TIMEOUT_MS),
            ),
            mailbox: self
                .mailbox
                .unwrap_or_else(|| DEFAULT_MAILBOX.to_string()),
        })
    }
}

/// Builds the effective config: optional file, then environment, then the
/// command line mailbox override.
pub fn load<F>(
    path: Option<&Path>,
    lookup: F,
    mailbox: Option<&str>,
) -> Result<ConnectionConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let file = match path {
        Some(path) => read_config(path)?,
        None => FileConfig::default(),
    };
    let mut section = file.imap.overlay_env(lookup)?;
    if let Some(mailbox) = mailbox {
        section.mailbox = Some(mailbox.to_string());
    }
    section.into_connection_config()
}

fn parse_num<T: std::str::FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}
