// The orchestration loop.
//
// Devices are processed strictly sequentially: low device counts, readable
// logs, and some firmware misbehaves under concurrent management sessions.
// No error crosses a device boundary -- every failure ends up as that
// device's outcome and the loop moves on.

use certship_api::TransportConfig;
use tracing::{info, warn};

use crate::error::CoreError;
use crate::k8s::{Reconciler, SecretSource};
use crate::model::{DeviceTarget, InvalidDevice, UploadOutcome};
use crate::uploader::Driver;

pub use crate::k8s::IssuerKind;

/// Run-level settings shared by every device.
#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub issuer_name: String,
    pub issuer_kind: IssuerKind,
    pub domain_suffix: String,
    pub transport: TransportConfig,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            issuer_name: "letsencrypt-prod".into(),
            issuer_kind: IssuerKind::default(),
            domain_suffix: ".local".into(),
            transport: TransportConfig::default(),
        }
    }
}

/// Drives the per-device upload sequence.
///
/// Generic over the secret source so tests can feed it an in-memory fake.
/// `reconciler: None` skips resource reconciliation entirely
/// (`--skip-resources`).
pub struct Deployer<S> {
    secrets: S,
    reconciler: Option<Reconciler>,
    options: DeployOptions,
}

impl<S: SecretSource> Deployer<S> {
    pub fn new(secrets: S, reconciler: Option<Reconciler>, options: DeployOptions) -> Self {
        Self {
            secrets,
            reconciler,
            options,
        }
    }

    /// Process every device in order and return one outcome per device.
    ///
    /// Invalid inventory entries become failed outcomes without touching
    /// the network; nothing here ever aborts the batch.
    pub async fn run(
        &self,
        devices: Vec<Result<DeviceTarget, InvalidDevice>>,
    ) -> Vec<UploadOutcome> {
        let mut outcomes = Vec::with_capacity(devices.len());

        for device in devices {
            let outcome = match device {
                Err(invalid) => {
                    warn!("skipping {}: {}", invalid.name, invalid.reason);
                    UploadOutcome::failed(invalid.name, invalid.reason)
                }
                Ok(target) => {
                    info!(
                        "processing {} ({} at {})",
                        target.name,
                        target.kind(),
                        target.host
                    );
                    match self.process(&target).await {
                        Ok(()) => UploadOutcome::succeeded(&target.name),
                        Err(e) => {
                            warn!("upload to {} failed: {e}", target.name);
                            UploadOutcome::failed(&target.name, e)
                        }
                    }
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }

    async fn process(&self, target: &DeviceTarget) -> Result<(), CoreError> {
        // Auxiliary resources first; their failure is a warning, not a
        // reason to skip the upload.
        if let Some(reconciler) = &self.reconciler {
            if let Err(e) = reconciler
                .ensure_certificate(
                    target,
                    &self.options.issuer_name,
                    self.options.issuer_kind,
                    &self.options.domain_suffix,
                )
                .await
            {
                warn!("{e} -- continuing with upload");
            }
            if let Err(e) = reconciler
                .ensure_dns_endpoint(target, &self.options.domain_suffix)
                .await
            {
                warn!("{e} -- continuing with upload");
            }
        }

        let password = self.secrets.password(&target.password_secret, "password").await?;
        let material = self.secrets.tls_certificate(&target.cert_secret).await?;

        let driver = Driver::for_target(target, password, &self.options.transport)?;
        driver
            .upload_certificate(&material.cert_pem, &material.key_pem, &target.cert_name)
            .await
    }
}

/// Whether the whole run passed -- the process exit signal.
pub fn all_succeeded(outcomes: &[UploadOutcome]) -> bool {
    outcomes.iter().all(|o| o.success)
}
