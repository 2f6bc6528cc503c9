//! Device inventory for certship.
//!
//! The inventory is a JSON file the operator maintains:
//!
//! ```json
//! {
//!   "devices": [
//!     {
//!       "name": "gateway",
//!       "device_type": "router",
//!       "host": "192.168.88.1",
//!       "username": "admin",
//!       "cert_name": "gateway",
//!       "cert_secret": "gateway-tls",
//!       "password_secret": "gateway-password"
//!     }
//!   ]
//! }
//! ```
//!
//! Loading is two-phase: a structural `serde_json` parse (a malformed file
//! is fatal), then a per-device validation pass. A device with a missing
//! field or an unknown `device_type` becomes an [`InvalidDevice`] that the
//! deploy loop reports as a failed outcome — one bad entry never sinks the
//! whole run.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use certship_core::{DeviceKind, DeviceOptions, DeviceTarget, InvalidDevice};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read inventory file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("inventory file '{path}' is not valid JSON: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

// ── Raw inventory structs ───────────────────────────────────────────

/// The inventory file as parsed, before validation.
#[derive(Debug, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

/// One raw inventory entry. Every field an entry could possibly need is
/// optional at this stage; the validation pass decides what is required
/// for the declared device type. Keys we do not recognize are ignored so
/// a typo in one entry cannot take the whole inventory down with it.
#[derive(Debug, Default, Deserialize)]
pub struct DeviceEntry {
    pub name: Option<String>,
    pub device_type: Option<String>,
    pub host: Option<String>,
    pub username: Option<String>,
    pub cert_name: Option<String>,
    pub cert_secret: Option<String>,
    pub password_secret: Option<String>,

    /// Router: unencrypted API port (default 8728).
    pub port: Option<u16>,
    /// Router: TLS API port (default 8729).
    pub ssl_port: Option<u16>,
    /// Camera: HTTPS port (default 443).
    pub https_port: Option<u16>,
    /// Camera: seconds to wait between certificate clear and re-login
    /// (default 5.0).
    pub relogin_delay: Option<f64>,
}

// ── Loading ─────────────────────────────────────────────────────────

/// Read and parse the inventory file, then validate each entry.
///
/// File-level problems (unreadable, malformed JSON) are fatal; per-device
/// problems come back as `Err(InvalidDevice)` elements in the result list,
/// preserving inventory order.
pub fn load_devices(path: &Path) -> Result<Vec<Result<DeviceTarget, InvalidDevice>>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let inventory: Inventory =
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

    debug!(
        "loaded {} device entries from {}",
        inventory.devices.len(),
        path.display()
    );

    Ok(validate(inventory))
}

/// Validate every entry, preserving order.
pub fn validate(inventory: Inventory) -> Vec<Result<DeviceTarget, InvalidDevice>> {
    inventory
        .devices
        .into_iter()
        .enumerate()
        .map(|(index, entry)| validate_entry(index, entry))
        .collect()
}

fn validate_entry(index: usize, entry: DeviceEntry) -> Result<DeviceTarget, InvalidDevice> {
    // A nameless entry still needs an identity for the summary report.
    let name = entry
        .name
        .clone()
        .unwrap_or_else(|| format!("device #{}", index + 1));

    let invalid = |reason: String| InvalidDevice {
        name: name.clone(),
        reason,
    };

    let required = |field: &str, value: &Option<String>| {
        value
            .clone()
            .ok_or_else(|| invalid(format!("missing required field '{field}'")))
    };

    let device_type = required("device_type", &entry.device_type)?;
    let kind: DeviceKind = device_type
        .parse()
        .map_err(|e: certship_core::CoreError| invalid(e.to_string()))?;

    let options = match kind {
        DeviceKind::Router => DeviceOptions::Router {
            plain_port: entry.port.unwrap_or(DeviceOptions::DEFAULT_ROUTER_PLAIN_PORT),
            secure_port: entry
                .ssl_port
                .unwrap_or(DeviceOptions::DEFAULT_ROUTER_SECURE_PORT),
        },
        DeviceKind::Camera => DeviceOptions::Camera {
            https_port: entry
                .https_port
                .unwrap_or(DeviceOptions::DEFAULT_CAMERA_HTTPS_PORT),
            relogin_delay: entry
                .relogin_delay
                .map_or(DeviceOptions::DEFAULT_CAMERA_RELOGIN_DELAY, |secs| {
                    Duration::from_secs_f64(secs.max(0.0))
                }),
        },
    };

    Ok(DeviceTarget {
        host: required("host", &entry.host)?,
        username: required("username", &entry.username)?,
        cert_name: required("cert_name", &entry.cert_name)?,
        cert_secret: required("cert_secret", &entry.cert_secret)?,
        password_secret: required("password_secret", &entry.password_secret)?,
        name: entry
            .name
            .ok_or_else(|| invalid("missing required field 'name'".to_owned()))?,
        options,
    })
}

// ── Tests ───────────────────────────────────────────────────────────
