//! End-to-end composition tests against a recording transport.
//!
//! Nothing here touches the network: remote content is served by a stub
//! fetcher that counts requests, and the transport records every call.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;

use mailforge_core::{
    Cipher, ContentSource, Disposition, Error, Fetch, FetchedResource, Mailer, MessageRequest,
    MessageTree, Result, TextKind, Transport,
};
use serde_json::json;

#[derive(Debug, Default)]
struct RecordingTransport {
    connected: bool,
    connects: Vec<(String, u16, Cipher)>,
    logins: Vec<(String, String)>,
    sent: Vec<(String, Vec<String>, Vec<u8>)>,
}

impl Transport for RecordingTransport {
    fn connect(&mut self, host: &str, port: u16, cipher: Cipher) -> Result<()> {
        self.connects.push((host.to_string(), port, cipher));
        self.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn login(&mut self, user: &str, password: &str) -> Result<()> {
        self.logins.push((user.to_string(), password.to_string()));
        Ok(())
    }

    fn send_mail(&mut self, from: &str, recipients: &[String], message: &[u8]) -> Result<()> {
        self.sent
            .push((from.to_string(), recipients.to_vec(), message.to_vec()));
        Ok(())
    }

    fn quit(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct StubFetch {
    resources: HashMap<String, FetchedResource>,
    requests: RefCell<Vec<String>>,
}

impl StubFetch {
    fn serving(url: &str, body: &[u8], content_type: &str) -> Self {
        let mut resources = HashMap::new();
        resources.insert(
            url.to_string(),
            FetchedResource {
                body: body.to_vec(),
                content_type: Some(content_type.to_string()),
                filename: None,
            },
        );
        Self {
            resources,
            requests: RefCell::default(),
        }
    }

    fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl Fetch for StubFetch {
    fn fetch(&self, url: &str) -> Result<FetchedResource> {
        self.requests.borrow_mut().push(url.to_string());
        self.resources
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Download {
                url: url.to_string(),
                reason: "Not Found".to_string(),
            })
    }
}

const LOGO_URL: &str = "https://cdn.example.com/img/logo.png";

fn mailer() -> Mailer<RecordingTransport, StubFetch> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Mailer::new("mail.example.com", 587, None, RecordingTransport::default())
        .with_fetcher(StubFetch::serving(LOGO_URL, b"\x89PNG", "image/png"))
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[test]
fn test_scenario_plaintext_only() {
    let mut mailer = mailer();
    let request = MessageRequest::new()
        .from("me@example.com")
        .to("a@example.com")
        .plaintext("hi");

    let message = mailer.send(request).unwrap();

    assert!(matches!(message.tree(), MessageTree::Leaf(t) if t.kind() == TextKind::Plain));
    assert_eq!(message.headers().get("To"), Some("a@example.com"));

    let transport = mailer.transport();
    assert_eq!(transport.sent.len(), 1);
    let (from, recipients, bytes) = &transport.sent[0];
    assert_eq!(from, "me@example.com");
    assert_eq!(recipients, &vec!["a@example.com".to_string()]);
    assert!(text(bytes).contains("Content-Type: text/plain; charset=utf-8\r\n"));
}

#[test]
fn test_scenario_alternative_with_inline() {
    let mut mailer = mailer();
    let request = MessageRequest::new()
        .from("me@example.com")
        .to("a@example.com")
        .plaintext("hi")
        .html("<b>hi</b><img src=\"cid:x@y\">")
        .inline("x@y", ContentSource::url(LOGO_URL));

    let message = mailer.send(request).unwrap();

    let MessageTree::Related { body, inlines } = message.tree() else {
        panic!("expected related root, got {}", message.tree().essence());
    };
    assert!(matches!(
        body.as_ref(),
        MessageTree::Alternative { plain, html } if plain.text() == "hi" && html.text().starts_with("<b>")
    ));
    assert_eq!(inlines.len(), 1);
    let inline = &inlines[0];
    assert_eq!(inline.disposition(), Disposition::Inline);
    assert_eq!(inline.content_id(), Some("x@y"));
    assert_eq!(inline.content().name, "logo.png");
    assert_eq!(inline.content().essence(), "image/png");
    assert_eq!(inline.content().data, b"\x89PNG");

    assert_eq!(mailer.fetcher().request_count(), 1);
    assert!(text(message.as_bytes()).contains("Content-ID: <x@y>\r\n"));
}

#[test]
fn test_scenario_integer_attachment() {
    let mut mailer = mailer();
    let result = MessageRequest::from_value(&json!({
        "from": "me@example.com",
        "to": ["a@example.com"],
        "plaintext": "hi",
        "attachments": [42, {"url": LOGO_URL}]
    }))
    .and_then(|request| mailer.send(request));

    assert!(matches!(result, Err(Error::InvalidContentType(_))));
    assert_eq!(mailer.fetcher().request_count(), 0);
    assert!(mailer.transport().connects.is_empty());
    assert!(mailer.transport().sent.is_empty());
}

#[test]
fn test_raw_bytes_attachment() {
    let mailer = mailer();
    let message = mailer
        .compose(
            MessageRequest::new()
                .from("me@example.com")
                .to("a@example.com")
                .attach(ContentSource::bytes(vec![0, 1, 2])),
        )
        .unwrap();

    let MessageTree::Mixed {
        content: None,
        attachments,
    } = message.tree()
    else {
        panic!("expected attachment-only mixed root");
    };
    let content = attachments[0].content();
    assert_eq!(content.essence(), "application/octet-stream");
    assert_eq!(content.name, "Unnamed attachment 0.dat");
    assert!(text(message.as_bytes()).contains(
        "Content-Disposition: attachment; filename=\"Unnamed attachment 0.dat\"\r\n"
    ));
}

#[test]
fn test_file_attachment() {
    let mut file = tempfile::Builder::new()
        .prefix("invoice")
        .suffix(".csv")
        .tempfile()
        .unwrap();
    file.write_all(b"id,total\n1,9.99\n").unwrap();
    let base_name = file.path().file_name().unwrap().to_string_lossy().into_owned();

    let mailer = mailer();
    let message = mailer
        .compose(
            MessageRequest::new()
                .from("me@example.com")
                .to("a@example.com")
                .html("<p>invoice</p>")
                .attach(ContentSource::file(file.path())),
        )
        .unwrap();

    let MessageTree::Mixed {
        content: Some(content),
        attachments,
    } = message.tree()
    else {
        panic!("expected mixed root with content");
    };
    assert!(matches!(content.as_ref(), MessageTree::Leaf(t) if t.kind() == TextKind::Html));
    assert_eq!(attachments[0].content().data, b"id,total\n1,9.99\n");
    assert_eq!(attachments[0].content().name, base_name);
    assert_eq!(attachments[0].content().essence(), "text/csv");
}

#[test]
fn test_inline_without_body_fetches_nothing() {
    let mailer = mailer();
    let err = mailer
        .compose(
            MessageRequest::new()
                .from("me@example.com")
                .to("a@example.com")
                .inline("x@y", ContentSource::url(LOGO_URL))
                .attach(ContentSource::bytes(vec![1])),
        )
        .unwrap_err();

    assert!(matches!(err, Error::DanglingInline));
    assert_eq!(mailer.fetcher().request_count(), 0);
}

#[test]
fn test_bad_content_id_fetches_nothing() {
    let mailer = mailer();
    let err = mailer
        .compose(
            MessageRequest::new()
                .from("me@example.com")
                .to("a@example.com")
                .html("<img src=\"cid:logo\">")
                .inline("logo", ContentSource::url(LOGO_URL)),
        )
        .unwrap_err();

    assert!(matches!(err, Error::InvalidContentId(_)));
    assert_eq!(mailer.fetcher().request_count(), 0);
}

#[test]
fn test_empty_message() {
    let err = mailer()
        .compose(MessageRequest::new().from("me@example.com").to("a@example.com"))
        .unwrap_err();
    assert!(matches!(err, Error::EmptyMessage));
}

#[test]
fn test_no_recipients_after_dropping_invalid() {
    let mut mailer = mailer();
    let err = mailer
        .send(
            MessageRequest::new()
                .from("me@example.com")
                .to("not an address")
                .cc("Broken <")
                .plaintext("hi"),
        )
        .unwrap_err();

    assert!(matches!(err, Error::NoRecipients));
    assert!(mailer.transport().sent.is_empty());
}

#[test]
fn test_recipient_order_and_bcc() {
    let message = mailer()
        .compose(
            MessageRequest::new()
                .from("me@example.com")
                .bcc("c@example.com")
                .cc("b@example.com")
                .to("a@example.com")
                .to("a@example.com")
                .plaintext("hi"),
        )
        .unwrap();

    assert_eq!(
        message.recipients(),
        ["a@example.com", "a@example.com", "b@example.com", "c@example.com"]
    );
    assert_eq!(message.headers().get("Bcc"), Some("c@example.com"));
}

#[test]
fn test_sender_derived_from_login() {
    let mut mailer = mailer();
    mailer.login("jon", "secret").unwrap();

    let message = mailer
        .send(MessageRequest::new().to("a@example.com").plaintext("hi"))
        .unwrap();
    assert_eq!(message.from(), "jon@mail.example.com");
    assert_eq!(message.headers().get("From"), Some("jon@mail.example.com"));

    let transport = mailer.transport();
    assert_eq!(
        transport.connects,
        vec![("mail.example.com".to_string(), 587, Cipher::StartTls)]
    );
    assert_eq!(
        transport.logins,
        vec![("jon".to_string(), "secret".to_string())]
    );

    mailer.quit().unwrap();
    assert_eq!(mailer.user(), None);
    assert!(!mailer.is_connected());
}

#[test]
fn test_sender_with_domain_used_verbatim() {
    let mut mailer = mailer();
    mailer.login("jon@example.org", "secret").unwrap();
    let message = mailer
        .compose(MessageRequest::new().to("a@example.com").plaintext("hi"))
        .unwrap();
    assert_eq!(message.from(), "jon@example.org");
}

#[test]
fn test_invalid_sender() {
    let mailer = mailer();
    let err = mailer
        .compose(MessageRequest::new().to("a@example.com").plaintext("hi"))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidSender(_)));

    let err = mailer
        .compose(
            MessageRequest::new()
                .from("Nobody <")
                .to("a@example.com")
                .plaintext("hi"),
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidSender(_)));
}

#[test]
fn test_reply_to_and_header_override() {
    let message = mailer()
        .compose(
            MessageRequest::new()
                .from("Me <me@example.com>")
                .to("a@example.com")
                .reply_to("Desk <desk@example.com>")
                .subject("computed")
                .plaintext("hi")
                .header("Subject", "override")
                .header("X-Campaign", "q3"),
        )
        .unwrap();

    let headers = message.headers();
    assert_eq!(headers.get("Reply-To"), Some("Desk <desk@example.com>"));
    assert_eq!(headers.get("From"), Some("Me <me@example.com>"));
    assert_eq!(headers.get("Subject"), Some("override"));
    assert_eq!(headers.get("X-Campaign"), Some("q3"));
}

#[test]
fn test_invalid_reply_to_is_dropped() {
    let message = mailer()
        .compose(
            MessageRequest::new()
                .from("me@example.com")
                .to("a@example.com")
                .reply_to("nobody <")
                .plaintext("hi"),
        )
        .unwrap();
    assert!(!message.headers().contains("Reply-To"));
}

#[test]
fn test_download_failure() {
    let mut mailer = mailer();
    let err = mailer
        .send(
            MessageRequest::new()
                .from("me@example.com")
                .to("a@example.com")
                .plaintext("hi")
                .attach(ContentSource::url("https://cdn.example.com/missing.pdf")),
        )
        .unwrap_err();

    assert!(matches!(err, Error::Download { ref reason, .. } if reason == "Not Found"));
    assert!(mailer.transport().sent.is_empty());
}

#[test]
fn test_json_request_with_single_recipient() {
    let mut mailer = mailer();
    let request = MessageRequest::from_json(
        r#"{
            "from": {"fullname": "Me", "mail": "me@example.com"},
            "to": "a@example.com",
            "subject": "Grüße",
            "plaintext": "hi",
            "inlines": [{"cid": "logo@example.com", "data": [1, 2], "type": "image/gif"}],
            "html": "<img src=\"cid:logo@example.com\">"
        }"#,
    )
    .unwrap();

    let message = mailer.send(request).unwrap();
    assert_eq!(message.recipients(), ["a@example.com"]);
    assert_eq!(message.headers().get("From"), Some("Me <me@example.com>"));
    assert!(message.headers().get("Subject").unwrap().starts_with("=?utf-8?B?"));

    let MessageTree::Related { inlines, .. } = message.tree() else {
        panic!("expected related root");
    };
    // Inline data is named after the content id.
    assert_eq!(inlines[0].content().name, "logo");
    assert_eq!(inlines[0].content().essence(), "image/gif");
}

#[test]
fn test_port_zero_uses_cipher_default() {
    let mut mailer = Mailer::new("mx", 0, Some(Cipher::Ssl), RecordingTransport::default());
    mailer.connect().unwrap();
    assert_eq!(
        mailer.transport().connects,
        vec![("mx".to_string(), 465, Cipher::Ssl)]
    );
}

#[test]
fn test_line_break_in_recipient_cannot_add_headers() {
    let mut mailer = mailer();
    let message = mailer
        .send(
            MessageRequest::new()
                .from("me@example.com")
                .to("Victim <a@example.com\r\nBcc: evil@attacker.test>")
                .cc("b@example.com")
                .plaintext("hi"),
        )
        .unwrap();

    let bytes = text(message.as_bytes());
    assert!(!bytes.contains("evil@attacker.test"));
    assert!(!message.headers().contains("To"));
    assert_eq!(message.recipients(), ["b@example.com"]);
    assert_eq!(
        mailer.transport().sent[0].1,
        vec!["b@example.com".to_string()]
    );
}

#[test]
fn test_line_break_in_sender_or_reply_to() {
    let mailer = mailer();
    let err = mailer
        .compose(
            MessageRequest::new()
                .from("me@example.com\r\nBcc: evil@attacker.test")
                .to("a@example.com")
                .plaintext("hi"),
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidSender(_)));

    let message = mailer
        .compose(
            MessageRequest::new()
                .from("me@example.com")
                .to("a@example.com")
                .reply_to("Desk <desk@example.com\r\nBcc: evil@attacker.test>")
                .plaintext("hi"),
        )
        .unwrap();
    assert!(!message.headers().contains("Reply-To"));
    assert!(!text(message.as_bytes()).contains("evil@attacker.test"));

    let mut mailer = self::mailer();
    mailer.login("jon\r\nBcc: evil@attacker.test", "pw").unwrap();
    let err = mailer
        .compose(MessageRequest::new().to("a@example.com").plaintext("hi"))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidSender(_)));
}
