use thiserror::Error;

/// Top-level error type for the `certship-api` crate.
///
/// Covers every failure mode across both device protocols:
/// socket/TLS setup, RouterOS protocol errors, and Reolink CGI errors.
/// `certship-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected (wrong credentials, account disabled, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The device answered the login with a pre-6.43 MD5 challenge,
    /// which this client does not speak.
    #[error("Device requested legacy challenge login (RouterOS < 6.43), which is unsupported")]
    ChallengeLoginUnsupported,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Raw socket I/O error (RouterOS API).
    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A network round trip exceeded its deadline.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or connector setup error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── RouterOS protocol ───────────────────────────────────────────
    /// The device replied with a `!trap` sentence (command-level error).
    #[error("RouterOS error: {message}")]
    Trap { message: String },

    /// The device replied with `!fatal` -- the session is dead.
    #[error("RouterOS fatal error: {message}")]
    Fatal { message: String },

    /// Malformed wire data (bad length prefix, non-UTF-8 word, truncated
    /// sentence).
    #[error("RouterOS protocol error: {message}")]
    Protocol { message: String },

    // ── Reolink CGI ─────────────────────────────────────────────────
    /// Structured error from the camera (`code != 0` in the command
    /// envelope).
    #[error("Camera API error for {command} (rspCode {rsp_code}): {detail}")]
    CameraApi {
        command: String,
        rsp_code: i64,
        detail: String,
    },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// An operation that requires a token was called before login.
    #[error("Not logged in to the camera")]
    NotLoggedIn,
}

impl Error {
    /// RouterOS `!trap` for a delete of something that does not exist.
    ///
    /// The staging cleanup step treats this as success (idempotent delete).
    pub fn is_no_such_item(&self) -> bool {
        matches!(self, Self::Trap { message } if message.contains("no such item"))
    }
}
