// Camera driver (Reolink).
//
// The firmware invalidates the active session when its certificate store
// is cleared, which forces the awkward sequence: login → clear → settle
// delay → login again → import → logout. The import call's own verdict
// decides success; logout runs unconditionally afterwards.

use std::time::Duration;

use secrecy::SecretString;
use tracing::{debug, info, warn};

use certship_api::{ReolinkClient, TransportConfig};

use crate::error::CoreError;
use crate::uploader::CertUploader;

/// The device-local certificate slot name. Reolink firmware only serves
/// the pair stored under this name, so the caller-supplied name is
/// ignored.
const DEVICE_CERT_NAME: &str = "server";

/// Single-use uploader for one camera.
pub struct CameraUploader {
    client: ReolinkClient,
    host: String,
    username: String,
    password: SecretString,
    relogin_delay: Duration,
}

impl CameraUploader {
    pub fn new(
        host: &str,
        username: &str,
        password: SecretString,
        https_port: u16,
        relogin_delay: Duration,
        transport: &TransportConfig,
    ) -> Result<Self, CoreError> {
        let client = ReolinkClient::new(host, https_port, transport)?;
        Ok(Self {
            client,
            host: host.to_owned(),
            username: username.to_owned(),
            password,
            relogin_delay,
        })
    }

    /// Build a driver around an existing client. Tests use this to point
    /// at a mock device over plain HTTP.
    pub fn with_client(
        client: ReolinkClient,
        host: &str,
        username: &str,
        password: SecretString,
        relogin_delay: Duration,
    ) -> Self {
        Self {
            client,
            host: host.to_owned(),
            username: username.to_owned(),
            password,
            relogin_delay,
        }
    }

    /// Everything between login and logout.
    async fn install(&self, cert_pem: &str, key_pem: &SecretString) -> Result<(), CoreError> {
        let info = self.client.device_info().await?;
        info!("connected to {} (model {})", info.name, info.model);

        info!("clearing existing certificates on {}", info.name);
        self.client.clear_certificates().await?;

        // The clear invalidated our session; give the firmware a moment
        // before authenticating again.
        debug!(
            "waiting {:.1}s before re-login",
            self.relogin_delay.as_secs_f64()
        );
        tokio::time::sleep(self.relogin_delay).await;
        self.client.login(&self.username, &self.password).await?;

        info!("uploading certificate to {}", info.name);
        let accepted = self
            .client
            .import_certificate(cert_pem, key_pem, DEVICE_CERT_NAME)
            .await?;

        if accepted {
            warn!("some camera models require a reboot to activate the new certificate");
            Ok(())
        } else {
            Err(CoreError::Rejected {
                message: format!("camera {} rejected the certificate import", info.name),
            })
        }
    }
}

impl CertUploader for CameraUploader {
    async fn upload_certificate(
        &self,
        cert_pem: &str,
        key_pem: &SecretString,
        _cert_name: &str,
    ) -> Result<(), CoreError> {
        // Login failure ends the attempt here: no clear, no import, and
        // no logout of a session that never existed.
        self.client
            .login(&self.username, &self.password)
            .await
            .map_err(CoreError::from)?;

        let result = self.install(cert_pem, key_pem).await;

        // Always log out; a logout failure never overrides the outcome.
        if let Err(e) = self.client.logout().await {
            warn!("error during logout from {}: {e}", self.host);
        }

        if result.is_ok() {
            info!("successfully uploaded certificate to {}", self.host);
        }
        result
    }
}
