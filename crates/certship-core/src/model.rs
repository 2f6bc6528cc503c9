// ── Device and deployment model ──
//
// These types describe *what* to deploy and *where*. They carry credential
// material and connection tuning, but never touch disk or the network.
// The config crate constructs `DeviceTarget`s and hands them in.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::CoreError;

/// An issued TLS certificate/key pair, PEM-encoded.
///
/// Immutable once constructed -- the pair travels together so no driver
/// can ever install a cert without its matching key. The private key is
/// wrapped in `SecretString` and never appears in logs or `Debug` output.
#[derive(Clone)]
pub struct CertificateMaterial {
    pub cert_pem: String,
    pub key_pem: SecretString,
}

impl fmt::Debug for CertificateMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateMaterial")
            .field("cert_pem", &format!("<{} bytes>", self.cert_pem.len()))
            .field("key_pem", &"<redacted>")
            .finish()
    }
}

/// The closed set of device families certship can deploy to.
///
/// Parsed from the inventory's `device_type` tag; the original tool's tags
/// (`mikrotik`, `reolink`) are accepted as aliases. An unrecognized tag is
/// a per-device failure, never a process-fatal one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Router,
    Camera,
}

impl FromStr for DeviceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "router" | "mikrotik" => Ok(Self::Router),
            "camera" | "reolink" => Ok(Self::Camera),
            _ => Err(CoreError::UnsupportedDeviceType { value: s.to_owned() }),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Router => write!(f, "router"),
            Self::Camera => write!(f, "camera"),
        }
    }
}

/// Family-specific connection options, with the documented defaults.
#[derive(Debug, Clone)]
pub enum DeviceOptions {
    Router {
        /// Unencrypted management API port.
        plain_port: u16,
        /// TLS management API port, tried first.
        secure_port: u16,
    },
    Camera {
        /// HTTPS port.
        https_port: u16,
        /// Grace period between clearing the cert store and re-login.
        /// Empirically required for the firmware to settle, so it stays
        /// caller-tunable.
        relogin_delay: Duration,
    },
}

impl DeviceOptions {
    pub const DEFAULT_ROUTER_PLAIN_PORT: u16 = 8728;
    pub const DEFAULT_ROUTER_SECURE_PORT: u16 = 8729;
    pub const DEFAULT_CAMERA_HTTPS_PORT: u16 = 443;
    pub const DEFAULT_CAMERA_RELOGIN_DELAY: Duration = Duration::from_secs(5);

    pub fn router_defaults() -> Self {
        Self::Router {
            plain_port: Self::DEFAULT_ROUTER_PLAIN_PORT,
            secure_port: Self::DEFAULT_ROUTER_SECURE_PORT,
        }
    }

    pub fn camera_defaults() -> Self {
        Self::Camera {
            https_port: Self::DEFAULT_CAMERA_HTTPS_PORT,
            relogin_delay: Self::DEFAULT_CAMERA_RELOGIN_DELAY,
        }
    }

    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Router { .. } => DeviceKind::Router,
            Self::Camera { .. } => DeviceKind::Camera,
        }
    }
}

/// One device to deploy to. Constructed per run from the inventory,
/// discarded after the upload attempt.
///
/// The password is not here: it is resolved from the secret store right
/// before the upload, per device.
#[derive(Debug, Clone)]
pub struct DeviceTarget {
    /// Inventory name -- keys the outcome report and the DNS name.
    pub name: String,
    /// Device IP address or hostname.
    pub host: String,
    /// Management username.
    pub username: String,
    /// Device-local certificate name (the camera driver overrides this
    /// with its fixed firmware name).
    pub cert_name: String,
    /// Secret holding the issued certificate (`tls.crt` / `tls.key`).
    pub cert_secret: String,
    /// Secret holding the device password (`password` key).
    pub password_secret: String,
    /// Family-specific options; also determines the driver.
    pub options: DeviceOptions,
}

impl DeviceTarget {
    pub fn kind(&self) -> DeviceKind {
        self.options.kind()
    }
}

/// An inventory entry that failed validation. The deploy loop turns these
/// into failed outcomes without touching the network.
#[derive(Debug, Clone)]
pub struct InvalidDevice {
    pub name: String,
    pub reason: String,
}

/// The per-device result of one run.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub device_name: String,
    pub success: bool,
    /// Failure cause for diagnostics; `None` on success.
    pub cause: Option<String>,
}

impl UploadOutcome {
    pub fn succeeded(device_name: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            success: true,
            cause: None,
        }
    }

    pub fn failed(device_name: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self {
            device_name: device_name.into(),
            success: false,
            cause: Some(cause.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn device_kind_accepts_original_tags() {
        assert_eq!("mikrotik".parse::<DeviceKind>().unwrap(), DeviceKind::Router);
        assert_eq!("reolink".parse::<DeviceKind>().unwrap(), DeviceKind::Camera);
        assert_eq!("Router".parse::<DeviceKind>().unwrap(), DeviceKind::Router);
    }

    #[test]
    fn unknown_kind_is_per_device_error() {
        let err = "switch".parse::<DeviceKind>().unwrap_err();
        assert!(matches!(
            err,
            CoreError::UnsupportedDeviceType { value } if value == "switch"
        ));
    }

    #[test]
    fn material_debug_redacts_key() {
        let material = CertificateMaterial {
            cert_pem: "CERT".into(),
            key_pem: "KEY".to_owned().into(),
        };
        let debug = format!("{material:?}");
        assert!(!debug.contains("KEY"));
        assert!(debug.contains("redacted"));
    }
}
