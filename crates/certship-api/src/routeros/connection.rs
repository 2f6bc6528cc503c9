// RouterOS API connection: socket ownership, login, command/reply loop.
//
// A connection is single-session: connect (plain or TLS), login, run
// commands, close. The management TLS port presents the device's own
// self-signed certificate, so verification is disabled for that bootstrap
// connection -- same stance as `danger_accept_invalid_certs` on the HTTP
// side.

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::{debug, trace, warn};

use crate::error::Error;
use crate::routeros::codec;

// ── Replies ─────────────────────────────────────────────────────────

/// The category word that opens every reply sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// `!re` -- one data record of a streamed response.
    Data,
    /// `!done` -- command finished.
    Done,
    /// `!trap` -- command-level error (session still usable).
    Trap,
    /// `!fatal` -- session-level error, the connection is dead.
    Fatal,
}

/// One parsed reply sentence.
#[derive(Debug, Clone)]
pub struct Reply {
    pub kind: ReplyKind,
    attributes: Vec<(String, String)>,
}

impl Reply {
    fn parse(words: Vec<String>) -> Result<Self, Error> {
        let mut iter = words.into_iter();
        let first = iter.next().ok_or_else(|| Error::Protocol {
            message: "empty reply sentence".into(),
        })?;

        let kind = match first.as_str() {
            "!re" => ReplyKind::Data,
            "!done" => ReplyKind::Done,
            "!trap" => ReplyKind::Trap,
            "!fatal" => ReplyKind::Fatal,
            other => {
                return Err(Error::Protocol {
                    message: format!("unexpected reply word {other:?}"),
                });
            }
        };

        let mut attributes = Vec::new();
        for word in iter {
            if let Some(rest) = word.strip_prefix('=') {
                let (name, value) = rest.split_once('=').unwrap_or((rest, ""));
                attributes.push((name.to_owned(), value.to_owned()));
            } else if word.starts_with('.') {
                // API attribute (.tag etc.) -- unused by this client.
                trace!(word, "ignoring API attribute word");
            } else {
                // `!fatal` carries its reason as a bare word.
                attributes.push(("message".to_owned(), word));
            }
        }

        Ok(Self { kind, attributes })
    }

    /// Look up a reply attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    fn message(&self) -> String {
        self.attribute("message")
            .unwrap_or("no error detail provided")
            .to_owned()
    }
}

// ── Stream ──────────────────────────────────────────────────────────

/// Plain-TCP or TLS transport under one connection type.
enum ApiStream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

impl AsyncRead for ApiStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ApiStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_write(cx, buf),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_flush(cx),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_shutdown(cx),
            Self::Tls(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

// ── TLS without verification ────────────────────────────────────────

mod danger {
    use rustls::DigitallySignedStruct;
    use rustls::client::danger::{
        HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
    };
    use rustls::crypto::CryptoProvider;
    use rustls_pki_types::{CertificateDer, ServerName, UnixTime};

    /// Accepts any server certificate. The device's management cert is
    /// self-signed and is exactly what certship is about to replace.
    #[derive(Debug)]
    pub struct NoVerification(pub std::sync::Arc<CryptoProvider>);

    impl ServerCertVerifier for NoVerification {
        fn verify_server_cert(
            &self,
            _end_entity: &CertificateDer<'_>,
            _intermediates: &[CertificateDer<'_>],
            _server_name: &ServerName<'_>,
            _ocsp_response: &[u8],
            _now: UnixTime,
        ) -> Result<ServerCertVerified, rustls::Error> {
            Ok(ServerCertVerified::assertion())
        }

        fn verify_tls12_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            rustls::crypto::verify_tls12_signature(
                message,
                cert,
                dss,
                &self.0.signature_verification_algorithms,
            )
        }

        fn verify_tls13_signature(
            &self,
            message: &[u8],
            cert: &CertificateDer<'_>,
            dss: &DigitallySignedStruct,
        ) -> Result<HandshakeSignatureValid, rustls::Error> {
            rustls::crypto::verify_tls13_signature(
                message,
                cert,
                dss,
                &self.0.signature_verification_algorithms,
            )
        }

        fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
            self.0.signature_verification_algorithms.supported_schemes()
        }
    }
}

// ── Connection ──────────────────────────────────────────────────────

/// One authenticated RouterOS API session.
///
/// Exclusively owned by a single upload attempt; callers must `close`
/// (or drop) it before the next device.
pub struct RouterOsConnection {
    stream: ApiStream,
    timeout: Duration,
    peer: String,
}

async fn timed<T>(
    timeout: Duration,
    fut: impl Future<Output = Result<T, Error>>,
) -> Result<T, Error> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| Error::Timeout {
            timeout_secs: timeout.as_secs(),
        })?
}

impl RouterOsConnection {
    /// Connect over the unencrypted API port (default 8728).
    pub async fn connect_plain(host: &str, port: u16, timeout: Duration) -> Result<Self, Error> {
        debug!("connecting to RouterOS API at {host}:{port} (plain)");
        let stream = timed(timeout, async {
            Ok(TcpStream::connect((host, port)).await?)
        })
        .await?;
        Ok(Self {
            stream: ApiStream::Plain(stream),
            timeout,
            peer: format!("{host}:{port}"),
        })
    }

    /// Connect over the TLS API port (default 8729).
    ///
    /// Certificate verification is disabled -- the device presents a
    /// self-signed cert at this bootstrap stage.
    pub async fn connect_tls(host: &str, port: u16, timeout: Duration) -> Result<Self, Error> {
        debug!("connecting to RouterOS API at {host}:{port} (TLS)");

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let tls_config = rustls::ClientConfig::builder_with_provider(Arc::clone(&provider))
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::Tls(e.to_string()))?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(danger::NoVerification(provider)))
            .with_no_client_auth();

        let server_name = rustls_pki_types::ServerName::try_from(host.to_owned())
            .map_err(|e| Error::Tls(format!("invalid server name {host:?}: {e}")))?;

        let stream = timed(timeout, async {
            let tcp = TcpStream::connect((host, port)).await?;
            let tls = TlsConnector::from(Arc::new(tls_config))
                .connect(server_name, tcp)
                .await?;
            Ok(tls)
        })
        .await?;

        Ok(Self {
            stream: ApiStream::Tls(Box::new(stream)),
            timeout,
            peer: format!("{host}:{port}"),
        })
    }

    /// Authenticate with the post-6.43 plain login.
    ///
    /// Older firmware answers with an MD5 challenge in `=ret=`; that flow
    /// is not supported and is reported as such.
    pub async fn login(&mut self, username: &str, password: &SecretString) -> Result<(), Error> {
        debug!("logging in to {} as {username}", self.peer);

        let words = [
            "/login".to_owned(),
            format!("=name={username}"),
            format!("=password={}", password.expose_secret()),
        ];

        let (_, done) = match self.run(&words).await {
            Ok(replies) => replies,
            Err(Error::Trap { message }) => return Err(Error::Authentication { message }),
            Err(e) => return Err(e),
        };

        if done.attribute("ret").is_some() {
            return Err(Error::ChallengeLoginUnsupported);
        }

        debug!("login successful");
        Ok(())
    }

    /// Execute one command sentence, collecting `!re` data replies until
    /// `!done`. A `!trap` fails the command after the device finishes the
    /// sentence; `!fatal` fails immediately (the session is gone).
    pub async fn command<S: AsRef<str> + Sync>(&mut self, words: &[S]) -> Result<Vec<Reply>, Error> {
        self.run(words).await.map(|(data, _)| data)
    }

    async fn run<S: AsRef<str> + Sync>(
        &mut self,
        words: &[S],
    ) -> Result<(Vec<Reply>, Reply), Error> {
        trace!(command = words.first().map(AsRef::as_ref), "sending sentence");
        timed(self.timeout, codec::write_sentence(&mut self.stream, words)).await?;

        let mut data = Vec::new();
        let mut trap: Option<Error> = None;
        loop {
            let sentence = timed(self.timeout, codec::read_sentence(&mut self.stream)).await?;
            let reply = Reply::parse(sentence)?;
            match reply.kind {
                ReplyKind::Data => data.push(reply),
                ReplyKind::Trap => {
                    trap = Some(Error::Trap {
                        message: reply.message(),
                    });
                }
                ReplyKind::Fatal => {
                    return Err(Error::Fatal {
                        message: reply.message(),
                    });
                }
                ReplyKind::Done => {
                    return match trap {
                        Some(err) => Err(err),
                        None => Ok((data, reply)),
                    };
                }
            }
        }
    }

    // ── File and certificate operations ──────────────────────────────

    /// Remove a file from device storage. Errors if the file is missing;
    /// use [`ensure_file_absent`](Self::ensure_file_absent) for the
    /// idempotent variant.
    pub async fn remove_file(&mut self, name: &str) -> Result<(), Error> {
        let words = ["/file/remove".to_owned(), format!("=numbers={name}")];
        self.command(&words).await?;
        Ok(())
    }

    /// Idempotent delete: removing a file that does not exist is success.
    pub async fn ensure_file_absent(&mut self, name: &str) -> Result<(), Error> {
        match self.remove_file(name).await {
            Ok(()) => {
                debug!("removed stale file {name}");
                Ok(())
            }
            Err(e) if e.is_no_such_item() => {
                trace!("file {name} already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Write a file into device storage with the given contents.
    pub async fn upload_file(&mut self, name: &str, contents: &str) -> Result<(), Error> {
        debug!("uploading file {name} ({} bytes)", contents.len());
        let words = [
            "/file/add".to_owned(),
            format!("=name={name}"),
            format!("=contents={contents}"),
        ];
        self.command(&words).await?;
        Ok(())
    }

    /// Import a staged certificate or key file into the device's
    /// certificate store, marked trusted.
    ///
    /// Import replies are streamed progress records; they are logged and
    /// otherwise not consulted -- only a trap or transport error fails
    /// this step.
    pub async fn import_certificate(&mut self, file_name: &str) -> Result<(), Error> {
        debug!("importing {file_name}");
        let words = [
            "/certificate/import".to_owned(),
            format!("=file-name={file_name}"),
            "=trusted=yes".to_owned(),
        ];
        let replies = self.command(&words).await?;
        for reply in &replies {
            debug!(?reply, "import response");
        }
        Ok(())
    }

    /// End the session. Best-effort `/quit`; the device answers with a
    /// `!fatal` farewell and closes the socket, both of which are normal
    /// here.
    pub async fn close(mut self) -> Result<(), Error> {
        debug!("closing RouterOS session to {}", self.peer);
        timed(self.timeout, codec::write_sentence(&mut self.stream, ["/quit"])).await?;
        match timed(self.timeout, codec::read_sentence(&mut self.stream)).await {
            Ok(words) => trace!(?words, "quit acknowledged"),
            // The peer may drop the socket before (or instead of) replying.
            Err(Error::Io(e)) => trace!("socket closed during quit: {e}"),
            Err(e) => {
                warn!("error during session close: {e}");
                return Err(e);
            }
        }
        Ok(())
    }
}
