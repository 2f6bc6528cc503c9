// The uploader contract and driver dispatch.
//
// One trait, two drivers, and a closed enum binding device kinds to
// drivers -- no string dispatch and no `dyn`: adding a device family means
// adding a variant, and the compiler walks every match for you.

pub mod camera;
pub mod router;

use certship_api::TransportConfig;
use secrecy::SecretString;

use crate::error::CoreError;
use crate::model::{DeviceOptions, DeviceTarget};

pub use camera::CameraUploader;
pub use router::RouterUploader;

/// The capability every device driver implements: install a PEM
/// certificate/key pair under a logical name on the device.
///
/// Contract, on top of the signature:
/// - the driver owns exactly one fresh device session for the duration of
///   the call and releases it on every exit path;
/// - `Ok(())` means the device's active TLS identity is the uploaded pair,
///   or the device acknowledged a queued install (a reboot-needed caveat
///   is surfaced as a warning, not a failure);
/// - `Err` leaves the device's prior state unchanged or best-effort
///   restored, with no artifacts that would block a retry.
pub trait CertUploader {
    fn upload_certificate(
        &self,
        cert_pem: &str,
        key_pem: &SecretString,
        cert_name: &str,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// A driver bound to one device target, ready for a single upload call.
pub enum Driver {
    Router(RouterUploader),
    Camera(CameraUploader),
}

impl Driver {
    /// Bind the right driver for the target's device kind.
    ///
    /// The kind is a closed enum by the time we get here -- unsupported
    /// type tags were already rejected during inventory validation.
    pub fn for_target(
        target: &DeviceTarget,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, CoreError> {
        match target.options {
            DeviceOptions::Router {
                plain_port,
                secure_port,
            } => Ok(Self::Router(RouterUploader::new(
                &target.host,
                &target.username,
                password,
                plain_port,
                secure_port,
                transport.timeout,
            ))),
            DeviceOptions::Camera {
                https_port,
                relogin_delay,
            } => Ok(Self::Camera(CameraUploader::new(
                &target.host,
                &target.username,
                password,
                https_port,
                relogin_delay,
                transport,
            )?)),
        }
    }

    pub async fn upload_certificate(
        &self,
        cert_pem: &str,
        key_pem: &SecretString,
        cert_name: &str,
    ) -> Result<(), CoreError> {
        match self {
            Self::Router(driver) => driver.upload_certificate(cert_pem, key_pem, cert_name).await,
            Self::Camera(driver) => driver.upload_certificate(cert_pem, key_pem, cert_name).await,
        }
    }
}
