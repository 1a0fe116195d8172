use std::io::Write;

use flexi_logger::{DeferredNow, FlexiLoggerError, Logger, LoggerHandle};
use log::Record;
use time::format_description::well_known::Rfc3339;
use time::UtcOffset;

/// Level used when `RUST_LOG` is unset, indexed by the number of `-v` flags.
pub fn level_for(verbosity: u64) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Starts logging to stderr. The returned handle must outlive the program.
pub fn init(verbosity: u64) -> Result<LoggerHandle, FlexiLoggerError> {
    Logger::try_with_env_or_str(level_for(verbosity))?
        .format(log_format)
        .start()
}

fn log_format(
    w: &mut dyn Write,
    now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    let ts = now
        .now()
        .to_offset(UtcOffset::UTC)
        .format(&Rfc3339)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    write!(
        w,
        "{} {} [{}] {}",
        ts,
        record.level(),
        record.module_path().unwrap_or("<unnamed>"),
        record.args()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(level_for(0), "warn");
        assert_eq!(level_for(1), "info");
        assert_eq!(level_for(2), "debug");
        assert_eq!(level_for(7), "trace");
    }

    #[test]
    fn format_line() {
        let mut out = Vec::new();
        let mut now = DeferredNow::new();
        log_format(
            &mut out,
            &mut now,
            &Record::builder()
                .args(format_args!("logged in"))
                .level(log::Level::Info)
                .module_path(Some("mail_checker::imap_cli"))
                .build(),
        )
        .unwrap();

        let line = String::from_utf8(out).unwrap();
        assert!(line.ends_with(" INFO [mail_checker::imap_cli] logged in"), "{}", line);
        let ts = line.split(' ').next().unwrap();
        assert!(ts.ends_with('Z'), "{}", line);
    }
}
