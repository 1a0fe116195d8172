//! Connection setup against local listeners.

use std::io::{self, Write};
use std::net::TcpListener;
use std::thread;
use std::time::{Duration, Instant};

use mail_checker::config::Password;
use mail_checker::{check_unseen, CheckError, ConnectionConfig, ImapCli};

fn config(port: u16, use_tls: bool, auth_timeout_ms: u64) -> ConnectionConfig {
    ConnectionConfig {
        user: "user".to_string(),
        password: Password::new("secret"),
        host: "127.0.0.1".to_string(),
        port,
        use_tls,
        auth_timeout: Duration::from_millis(auth_timeout_ms),
        mailbox: "INBOX".to_string(),
    }
}

#[test]
fn silent_server_times_out() {
    // Never accepted: the kernel completes the handshake, nobody greets.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let started = Instant::now();
    let err = ImapCli::connect(&config(port, false, 300)).err().unwrap();

    assert!(matches!(err, CheckError::AuthTimeout(d) if d == Duration::from_millis(300)));
    assert_eq!(err.to_string(), "authentication timed out after 300 ms");
    assert!(started.elapsed() < Duration::from_secs(5));
    drop(listener);
}

#[test]
fn silent_server_times_out_during_tls_handshake() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let err = ImapCli::connect(&config(port, true, 300)).err().unwrap();

    assert!(matches!(err, CheckError::AuthTimeout(_)), "{:?}", err);
    drop(listener);
}

#[test]
fn refused_port_is_a_connect_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = ImapCli::connect(&config(port, false, 1000)).err().unwrap();

    assert!(matches!(err, CheckError::Connect(_)), "{:?}", err);
    assert!(err.to_string().starts_with("TCP connection failed"), "{}", err);
}

#[test]
fn plain_tcp_check() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let header = "Subject: Hello\r\nFrom: a@example.com\r\n\r\n";
    let script = format!(
        "* OK IMAP4rev1 ready\r\n\
         a1 OK LOGIN completed\r\n\
         * 1 EXISTS\r\na2 OK [READ-WRITE] SELECT completed\r\n\
         * SEARCH 42\r\na3 OK SEARCH completed\r\n\
         * 1 FETCH (UID 42 BODY[HEADER] {{{}}}\r\n{})\r\na4 OK FETCH completed\r\n\
         * BYE logging out\r\na5 OK LOGOUT completed\r\n",
        header.len(),
        header
    );

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.write_all(script.as_bytes()).unwrap();
        // Drain until the client hangs up after LOGOUT.
        let mut sent = Vec::new();
        io::copy(&mut stream, &mut sent).unwrap();
        String::from_utf8(sent).unwrap()
    });

    let mut out = Vec::new();
    let count = check_unseen(&config(port, false, 2000), &mut out).unwrap();
    let sent = server.join().unwrap();

    assert_eq!(count, 1);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Message ID: 42\nSubject: Hello\nFrom: a@example.com\n---\n"
    );
    assert!(sent.starts_with("a1 LOGIN "), "{}", sent);
    assert!(sent.ends_with("a5 LOGOUT\r\n"), "{}", sent);
}
