#![allow(clippy::unwrap_used)]
// Integration tests for `RouterOsConnection` against a scripted fake device.
//
// The RouterOS API is not HTTP, so instead of wiremock these tests run a
// real `TcpListener` that speaks the wire framing via the public codec.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use secrecy::SecretString;
use tokio::net::TcpListener;

use certship_api::routeros::codec;
use certship_api::{Error, RouterOsConnection};

// ── Fake device ─────────────────────────────────────────────────────

type SentenceLog = Arc<Mutex<Vec<Vec<String>>>>;

/// Scripted replies per command word. Each incoming sentence is recorded,
/// then every reply sentence for its first word is written back.
struct FakeRouter {
    replies: HashMap<String, Vec<Vec<String>>>,
}

impl FakeRouter {
    fn new() -> Self {
        let mut replies = HashMap::new();
        replies.insert("/login".to_owned(), vec![vec!["!done".to_owned()]]);
        Self { replies }
    }

    fn on(mut self, command: &str, reply_sentences: &[&[&str]]) -> Self {
        self.replies.insert(
            command.to_owned(),
            reply_sentences
                .iter()
                .map(|s| s.iter().map(|w| (*w).to_owned()).collect())
                .collect(),
        );
        self
    }

    /// Bind on an ephemeral port and serve one connection.
    async fn serve(self) -> (u16, SentenceLog) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let log: SentenceLog = Arc::new(Mutex::new(Vec::new()));
        let log_clone = Arc::clone(&log);

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            loop {
                let Ok(sentence) = codec::read_sentence(&mut stream).await else {
                    break;
                };
                let command = sentence[0].clone();
                log_clone.lock().unwrap().push(sentence);

                if command == "/quit" {
                    let farewell = ["!fatal", "session terminated on request"];
                    let _ = codec::write_sentence(&mut stream, farewell).await;
                    break;
                }

                match self.replies.get(&command) {
                    Some(replies) => {
                        for reply in replies {
                            codec::write_sentence(&mut stream, reply).await.unwrap();
                        }
                    }
                    None => {
                        let trap = format!("=message=no such command {command}");
                        codec::write_sentence(&mut stream, ["!trap", trap.as_str()])
                            .await
                            .unwrap();
                        codec::write_sentence(&mut stream, ["!done"]).await.unwrap();
                    }
                }
            }
        });

        (port, log)
    }
}

fn secret(s: &str) -> SecretString {
    s.to_owned().into()
}

async fn connect(port: u16) -> RouterOsConnection {
    RouterOsConnection::connect_plain("127.0.0.1", port, Duration::from_secs(5))
        .await
        .unwrap()
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_success() {
    let (port, log) = FakeRouter::new().serve().await;

    let mut conn = connect(port).await;
    conn.login("admin", &secret("hunter2")).await.unwrap();

    let sentences = log.lock().unwrap().clone();
    assert_eq!(
        sentences[0],
        vec!["/login", "=name=admin", "=password=hunter2"]
    );
}

#[tokio::test]
async fn test_login_rejected() {
    let (port, _log) = FakeRouter::new()
        .on(
            "/login",
            &[&["!trap", "=message=invalid user name or password (6)"], &["!done"]],
        )
        .serve()
        .await;

    let mut conn = connect(port).await;
    let result = conn.login("admin", &secret("wrong")).await;

    match result {
        Err(Error::Authentication { message }) => {
            assert!(message.contains("invalid user name"), "got: {message}");
        }
        other => panic!("expected Authentication error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_challenge_login_unsupported() {
    let (port, _log) = FakeRouter::new()
        .on("/login", &[&["!done", "=ret=00112233445566778899aabbccddeeff"]])
        .serve()
        .await;

    let mut conn = connect(port).await;
    let result = conn.login("admin", &secret("pw")).await;

    assert!(matches!(result, Err(Error::ChallengeLoginUnsupported)));
}

// ── File operations ─────────────────────────────────────────────────

#[tokio::test]
async fn test_upload_file_sends_name_and_contents() {
    let (port, log) = FakeRouter::new()
        .on("/file/add", &[&["!done"]])
        .serve()
        .await;

    let mut conn = connect(port).await;
    conn.login("admin", &secret("pw")).await.unwrap();
    conn.upload_file("gw.crt", "-----BEGIN CERTIFICATE-----\nAAA\n-----END CERTIFICATE-----\n")
        .await
        .unwrap();

    let sentences = log.lock().unwrap().clone();
    assert_eq!(sentences[1][0], "/file/add");
    assert_eq!(sentences[1][1], "=name=gw.crt");
    assert!(sentences[1][2].starts_with("=contents=-----BEGIN CERTIFICATE-----"));
}

#[tokio::test]
async fn test_ensure_absent_tolerates_missing_file() {
    let (port, _log) = FakeRouter::new()
        .on("/file/remove", &[&["!trap", "=message=no such item"], &["!done"]])
        .serve()
        .await;

    let mut conn = connect(port).await;
    conn.login("admin", &secret("pw")).await.unwrap();

    // Plain remove surfaces the trap...
    // (fresh connection state: the fake replies the same way every time)
    assert!(conn.remove_file("gw.crt").await.unwrap_err().is_no_such_item());
    // ...but the idempotent form treats it as success.
    conn.ensure_file_absent("gw.crt").await.unwrap();
}

#[tokio::test]
async fn test_remove_surfaces_other_traps() {
    let (port, _log) = FakeRouter::new()
        .on("/file/remove", &[&["!trap", "=message=not enough permissions"], &["!done"]])
        .serve()
        .await;

    let mut conn = connect(port).await;
    conn.login("admin", &secret("pw")).await.unwrap();

    let err = conn.ensure_file_absent("gw.crt").await.unwrap_err();
    assert!(matches!(err, Error::Trap { .. }));
}

// ── Certificate import ──────────────────────────────────────────────

#[tokio::test]
async fn test_import_drains_streamed_replies() {
    let (port, log) = FakeRouter::new()
        .on(
            "/certificate/import",
            &[
                &["!re", "=certificates-imported=1"],
                &["!re", "=private-keys-imported=0"],
                &["!done"],
            ],
        )
        .serve()
        .await;

    let mut conn = connect(port).await;
    conn.login("admin", &secret("pw")).await.unwrap();
    conn.import_certificate("gw.crt").await.unwrap();

    let sentences = log.lock().unwrap().clone();
    assert_eq!(
        sentences[1],
        vec!["/certificate/import", "=file-name=gw.crt", "=trusted=yes"]
    );
}

// ── Session teardown ────────────────────────────────────────────────

#[tokio::test]
async fn test_close_sends_quit() {
    let (port, log) = FakeRouter::new().serve().await;

    let mut conn = connect(port).await;
    conn.login("admin", &secret("pw")).await.unwrap();
    conn.close().await.unwrap();

    let sentences = log.lock().unwrap().clone();
    assert_eq!(sentences.last().unwrap()[0], "/quit");
}

#[tokio::test]
async fn test_fatal_reply_kills_command() {
    let (port, _log) = FakeRouter::new()
        .on("/file/add", &[&["!fatal", "session torn down"]])
        .serve()
        .await;

    let mut conn = connect(port).await;
    conn.login("admin", &secret("pw")).await.unwrap();

    let err = conn.upload_file("gw.crt", "x").await.unwrap_err();
    assert!(matches!(err, Error::Fatal { .. }));
}

// ── Timeouts ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unresponsive_device_times_out() {
    // Accept the connection but never reply.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        // Hold the socket open without reading or writing.
        tokio::time::sleep(Duration::from_secs(60)).await;
        drop(stream);
    });

    let mut conn = RouterOsConnection::connect_plain("127.0.0.1", port, Duration::from_millis(200))
        .await
        .unwrap();
    let result = conn.login("admin", &secret("pw")).await;

    assert!(matches!(result, Err(Error::Timeout { .. })));
}

#[tokio::test]
async fn test_connect_refused() {
    // Nothing listening here.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let result = RouterOsConnection::connect_plain("127.0.0.1", port, Duration::from_secs(2)).await;
    assert!(matches!(result, Err(Error::Io(_))));
}
