// ── Core error types ──
//
// User-facing errors from certship-core. These are NOT protocol-specific --
// consumers never see raw socket errors or JSON parse failures directly.
// The `From<certship_api::Error>` impl translates wire-layer errors into
// domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    /// Every connection path to the device failed. For routers the reason
    /// concatenates both the secure and the plain attempt -- neither alone
    /// is enough to diagnose.
    #[error("Cannot connect to {target}: {reason}")]
    ConnectionFailed { target: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Device call timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Transport error: {message}")]
    Transport { message: String },

    // ── Device protocol errors ───────────────────────────────────────
    /// The device reported a protocol-level error mid-sequence.
    #[error("Device error: {message}")]
    DeviceProtocol { message: String },

    /// The device itself rejected the uploaded certificate. Distinct from
    /// transport failure: the sequence completed and the device said no.
    #[error("Device rejected the certificate: {message}")]
    Rejected { message: String },

    // ── Secret store errors ──────────────────────────────────────────
    #[error("Secret '{name}' not found: {reason}")]
    SecretNotFound { name: String, reason: String },

    #[error("Secret '{name}' is missing required key '{field}'")]
    MalformedSecret { name: String, field: String },

    // ── Reconciliation errors ────────────────────────────────────────
    /// Failure ensuring an auxiliary resource (Certificate, DNSEndpoint).
    /// The deploy loop downgrades these to warnings.
    #[error("Failed to ensure {resource}: {reason}")]
    Reconcile { resource: String, reason: String },

    // ── Configuration errors ─────────────────────────────────────────
    /// The inventory named a device type no driver exists for.
    #[error("Unsupported device type: {value}")]
    UnsupportedDeviceType { value: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

// ── Conversion from wire-layer errors ───────────────────────────────

impl From<certship_api::Error> for CoreError {
    fn from(err: certship_api::Error) -> Self {
        match err {
            certship_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            certship_api::Error::ChallengeLoginUnsupported => CoreError::AuthenticationFailed {
                message: err.to_string(),
            },
            certship_api::Error::NotLoggedIn => CoreError::AuthenticationFailed {
                message: "operation attempted without a session".into(),
            },
            certship_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            certship_api::Error::Transport(e) => CoreError::Transport {
                message: e.to_string(),
            },
            certship_api::Error::Io(e) => CoreError::Transport {
                message: e.to_string(),
            },
            certship_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid device URL: {e}"),
            },
            certship_api::Error::Tls(message) => CoreError::Transport { message },
            certship_api::Error::Trap { message } | certship_api::Error::Fatal { message } => {
                CoreError::DeviceProtocol { message }
            }
            certship_api::Error::Protocol { message } => CoreError::DeviceProtocol { message },
            certship_api::Error::CameraApi {
                command,
                rsp_code,
                detail,
            } => CoreError::DeviceProtocol {
                message: format!("{command} failed (rspCode {rsp_code}): {detail}"),
            },
            certship_api::Error::Deserialization { message, .. } => {
                CoreError::DeviceProtocol { message }
            }
        }
    }
}
