use std::io;
use std::path::PathBuf;
use std::process;

use clap::{crate_version, App, Arg};
use log::debug;

use mail_checker::{check_unseen, config, report, CheckError};

fn main() {
    let matches = App::new("mail-checker")
        .version(crate_version!())
        .about("Prints subject and sender of unseen messages without marking them read")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .takes_value(true)
                .help("TOML file with an [imap] section (default: $MAIL_CHECKER_CONFIG)"),
        )
        .arg(
            Arg::with_name("mailbox")
                .short("m")
                .long("mailbox")
                .value_name("NAME")
                .takes_value(true)
                .help("Mailbox to check (default: INBOX)"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Raises log verbosity, repeatable"),
        )
        .get_matches();

    let _logger = match mail_checker::logging::init(matches.occurrences_of("verbose")) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("cannot start logger: {}", e);
            None
        }
    };

    let config_path = matches
        .value_of("config")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(config::CONFIG_PATH_VAR).map(PathBuf::from));

    let result = config::load(
        config_path.as_deref(),
        |key| std::env::var(key).ok(),
        matches.value_of("mailbox"),
    )
    .map_err(CheckError::from)
    .and_then(|config| {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        check_unseen(&config, &mut out)
    });

    match result {
        Ok(count) => debug!("printed {} messages", count),
        Err(e) => {
            debug!("check failed: {:?}", e);
            let _ = report(&e, &mut io::stderr());
            process::exit(1);
        }
    }
}
