//! Sends composed messages through the SMTP transport to a scripted
//! loopback server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

use mailforge_core::{Cipher, ContentSource, Error, Mailer, MessageRequest, SmtpTransport};

struct Step {
    expect_prefix: &'static str,
    reply: &'static str,
}

const fn step(expect_prefix: &'static str, reply: &'static str) -> Step {
    Step {
        expect_prefix,
        reply,
    }
}

/// Spawns a server answering each step in order; `"DATA-BODY"` consumes
/// lines up to the terminating `.`.
fn scripted_server(steps: Vec<Step>) -> (u16, JoinHandle<Vec<String>>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut writer = stream.try_clone().unwrap();
        let mut reader = BufReader::new(stream);
        let mut received = Vec::new();

        writer.write_all(b"220 mx.example.com ESMTP\r\n").unwrap();
        for step in steps {
            if step.expect_prefix == "DATA-BODY" {
                loop {
                    let line = read_line(&mut reader);
                    let done = line == ".";
                    received.push(line);
                    if done {
                        break;
                    }
                }
            } else {
                let line = read_line(&mut reader);
                assert!(
                    line.starts_with(step.expect_prefix),
                    "expected {:?}, got {line:?}",
                    step.expect_prefix
                );
                received.push(line);
            }
            writer.write_all(step.reply.as_bytes()).unwrap();
        }
        received
    });

    (port, handle)
}

fn read_line(reader: &mut BufReader<TcpStream>) -> String {
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    line.trim_end_matches(['\r', '\n']).to_string()
}

fn mailer(port: u16) -> Mailer<SmtpTransport> {
    Mailer::new(
        "127.0.0.1",
        port,
        Some(Cipher::Plain),
        SmtpTransport::with_client_hostname("client.test"),
    )
}

#[test]
fn test_send_with_login() {
    let (port, server) = scripted_server(vec![
        step("EHLO client.test", "250-mx.example.com\r\n250 AUTH PLAIN LOGIN\r\n"),
        step("AUTH PLAIN", "235 2.7.0 Accepted\r\n"),
        step("MAIL FROM:<me@example.com>", "250 OK\r\n"),
        step("RCPT TO:<jon@example.com>", "250 OK\r\n"),
        step("RCPT TO:<boss@example.com>", "250 OK\r\n"),
        step("DATA", "354 Go ahead\r\n"),
        step("DATA-BODY", "250 Queued\r\n"),
        step("QUIT", "221 Bye\r\n"),
    ]);

    let mut mailer = mailer(port);
    mailer.login("me@example.com", "secret").unwrap();
    assert!(mailer.is_connected());

    let message = mailer
        .send(
            MessageRequest::new()
                .to("Jon Doe <jon@example.com>")
                .bcc("boss@example.com")
                .subject("Report")
                .plaintext("See attached.")
                .attach(ContentSource::text("a,b\n").with_name("report.csv")),
        )
        .unwrap();
    mailer.quit().unwrap();
    assert!(!mailer.is_connected());

    let received = server.join().unwrap();
    assert!(received.contains(&"From: me@example.com".to_string()));
    assert!(received.contains(&"To: Jon Doe <jon@example.com>".to_string()));
    assert!(received.contains(&"Subject: Report".to_string()));
    assert!(
        received
            .iter()
            .any(|line| line.starts_with("Content-Type: multipart/mixed; boundary="))
    );
    // Header forms; the envelope got bare addresses (RCPT TO steps above).
    assert_eq!(
        message.recipients(),
        ["Jon Doe <jon@example.com>", "boss@example.com"]
    );
}

#[test]
fn test_login_survives_send() {
    let (port, server) = scripted_server(vec![
        step("EHLO", "250-mx.example.com\r\n250 AUTH PLAIN\r\n"),
        step("AUTH PLAIN", "235 2.7.0 Accepted\r\n"),
        step("MAIL FROM:<me@example.com>", "250 OK\r\n"),
        step("RCPT TO:<a@example.com>", "250 OK\r\n"),
        step("DATA", "354 Go ahead\r\n"),
        step("DATA-BODY", "250 Queued\r\n"),
        // No second AUTH: the session stays authenticated.
        step("MAIL FROM:<me@example.com>", "250 OK\r\n"),
        step("RCPT TO:<b@example.com>", "250 OK\r\n"),
        step("DATA", "354 Go ahead\r\n"),
        step("DATA-BODY", "250 Queued\r\n"),
        step("QUIT", "221 Bye\r\n"),
    ]);

    let mut mailer = mailer(port);
    mailer.login("me@example.com", "secret").unwrap();
    mailer
        .send(MessageRequest::new().to("a@example.com").plaintext("one"))
        .unwrap();

    mailer.login("me@example.com", "secret").unwrap();
    let err = mailer.login("other@example.com", "secret").unwrap_err();
    assert!(matches!(err, Error::Auth(ref m) if m.contains("already authenticated")));
    assert!(mailer.is_connected());

    mailer
        .send(MessageRequest::new().to("b@example.com").plaintext("two"))
        .unwrap();
    mailer.quit().unwrap();

    let received = server.join().unwrap();
    assert_eq!(
        received.iter().filter(|l| l.starts_with("AUTH")).count(),
        1
    );
}

#[test]
fn test_auth_not_offered() {
    let (port, server) = scripted_server(vec![step("EHLO", "250 mx.example.com\r\n")]);

    let err = mailer(port).login("me", "secret").unwrap_err();
    assert!(matches!(err, Error::UnsupportedAuth(_)));
    server.join().unwrap();
}

#[test]
fn test_no_usable_mechanism() {
    let (port, server) = scripted_server(vec![step(
        "EHLO",
        "250-mx.example.com\r\n250 AUTH XOAUTH2\r\n",
    )]);

    let err = mailer(port).login("me", "secret").unwrap_err();
    assert!(matches!(err, Error::Auth(ref m) if m.contains("No suitable authentication method")));
    server.join().unwrap();
}

#[test]
fn test_credentials_rejected() {
    let (port, server) = scripted_server(vec![
        step("EHLO", "250-mx.example.com\r\n250 AUTH PLAIN\r\n"),
        step("AUTH PLAIN", "535 5.7.8 Authentication credentials invalid\r\n"),
    ]);

    let mut mailer = mailer(port);
    let err = mailer.login("me", "wrong").unwrap_err();
    assert!(matches!(err, Error::Auth(ref m) if m.contains("username/password")));
    assert_eq!(mailer.user(), None);
    assert!(!mailer.is_connected());
    server.join().unwrap();
}

#[test]
fn test_recipient_refused() {
    let (port, server) = scripted_server(vec![
        step("EHLO", "250 mx.example.com\r\n"),
        step("MAIL FROM:<me@example.com>", "250 OK\r\n"),
        step("RCPT TO:<nobody@example.com>", "550 5.1.1 No such user\r\n"),
    ]);

    let mut mailer = mailer(port);
    let err = mailer
        .send(
            MessageRequest::new()
                .from("me@example.com")
                .to("nobody@example.com")
                .plaintext("hi"),
        )
        .unwrap_err();

    assert!(matches!(err, Error::Transport(ref m) if m.contains("No such user")));
    assert!(!mailer.is_connected());
    server.join().unwrap();
}

#[test]
fn test_connection_refused() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = mailer(port).connect().unwrap_err();
    assert!(matches!(err, Error::Connect(ref m) if m.contains(&format!("127.0.0.1:{port}"))));
}
