// certship-core: everything between "here is a device list" and "here is
// what happened". Device model, the uploader contract with its two
// drivers, the Kubernetes collaborators (secret store + resource
// reconciliation), and the sequential deploy loop.

pub mod deploy;
pub mod error;
pub mod k8s;
pub mod model;
pub mod uploader;

// ── Primary re-exports ──────────────────────────────────────────────
pub use certship_api::{TlsMode, TransportConfig};
pub use deploy::{DeployOptions, Deployer, IssuerKind, all_succeeded};
pub use error::CoreError;
pub use k8s::{KubeSecretStore, Reconciler, SecretSource};
pub use model::{
    CertificateMaterial, DeviceKind, DeviceOptions, DeviceTarget, InvalidDevice, UploadOutcome,
};
pub use uploader::{CameraUploader, CertUploader, Driver, RouterUploader};
