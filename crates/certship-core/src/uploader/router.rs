// Router driver (MikroTik RouterOS).
//
// Installation sequence: connect (secure port first, plain fallback) →
// stage `<name>.crt` / `<name>.key` as device files (removing stale
// same-named files first) → import cert, then key, both trusted → close.
// The session is released on every exit path; close errors are logged,
// never escalated.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use certship_api::RouterOsConnection;

use crate::error::CoreError;
use crate::uploader::CertUploader;

/// Single-use uploader for one router. Establishes a fresh session per
/// `upload_certificate` call and tears it down before returning.
pub struct RouterUploader {
    host: String,
    username: String,
    password: SecretString,
    plain_port: u16,
    secure_port: u16,
    timeout: Duration,
}

impl RouterUploader {
    pub fn new(
        host: &str,
        username: &str,
        password: SecretString,
        plain_port: u16,
        secure_port: u16,
        timeout: Duration,
    ) -> Self {
        Self {
            host: host.to_owned(),
            username: username.to_owned(),
            password,
            plain_port,
            secure_port,
            timeout,
        }
    }

    /// Connect and authenticate, secure port first.
    ///
    /// Some firmware configurations disable the TLS management port, so a
    /// secure failure degrades -- loudly -- to the plain port with the
    /// same credentials. If both fail the error carries both causes;
    /// neither alone is enough to diagnose.
    async fn connect_with_fallback(&self) -> Result<RouterOsConnection, CoreError> {
        info!(
            "attempting secure connection to {}:{}",
            self.host, self.secure_port
        );
        let secure_err = match self.connect_and_login(true).await {
            Ok(conn) => {
                info!("connected to RouterOS API over TLS");
                return Ok(conn);
            }
            Err(e) => e,
        };

        warn!("secure connection failed: {secure_err}");
        info!(
            "falling back to plain connection to {}:{}",
            self.host, self.plain_port
        );
        match self.connect_and_login(false).await {
            Ok(conn) => {
                info!("connected to RouterOS API over plain TCP (unencrypted fallback)");
                Ok(conn)
            }
            Err(plain_err) => Err(CoreError::ConnectionFailed {
                target: self.host.clone(),
                reason: format!(
                    "secure port {}: {secure_err}; plain port {}: {plain_err}",
                    self.secure_port, self.plain_port
                ),
            }),
        }
    }

    async fn connect_and_login(&self, secure: bool) -> Result<RouterOsConnection, CoreError> {
        let mut conn = if secure {
            RouterOsConnection::connect_tls(&self.host, self.secure_port, self.timeout).await?
        } else {
            RouterOsConnection::connect_plain(&self.host, self.plain_port, self.timeout).await?
        };
        conn.login(&self.username, &self.password).await?;
        Ok(conn)
    }

    /// Staging + import, run against an open session.
    ///
    /// A failure mid-sequence aborts the remaining steps; already-staged
    /// files stay behind (accepted failure mode -- the next attempt's
    /// idempotent cleanup removes them).
    async fn install(
        &self,
        conn: &mut RouterOsConnection,
        cert_pem: &str,
        key_pem: &SecretString,
        cert_name: &str,
    ) -> Result<(), CoreError> {
        let cert_file = format!("{cert_name}.crt");
        let key_file = format!("{cert_name}.key");

        // Stale same-named files would make the import ambiguous.
        conn.ensure_file_absent(&cert_file).await?;
        conn.ensure_file_absent(&key_file).await?;

        info!("uploading certificate as {cert_file}");
        conn.upload_file(&cert_file, cert_pem).await?;
        info!("uploading private key as {key_file}");
        conn.upload_file(&key_file, key_pem.expose_secret()).await?;

        // Cert before key: the firmware attaches the key to an existing
        // certificate context.
        info!("importing certificate {cert_name}");
        conn.import_certificate(&cert_file).await?;
        conn.import_certificate(&key_file).await?;

        Ok(())
    }
}

impl CertUploader for RouterUploader {
    async fn upload_certificate(
        &self,
        cert_pem: &str,
        key_pem: &SecretString,
        cert_name: &str,
    ) -> Result<(), CoreError> {
        let mut conn = self.connect_with_fallback().await?;

        let result = self.install(&mut conn, cert_pem, key_pem, cert_name).await;

        // Teardown runs on every path; a close failure never changes the
        // already-determined outcome.
        if let Err(e) = conn.close().await {
            warn!("error closing RouterOS session to {}: {e}", self.host);
        }

        if result.is_ok() {
            info!("successfully uploaded certificate {cert_name} to {}", self.host);
        }
        result
    }
}
