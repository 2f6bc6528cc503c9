//! CLI error types with miette diagnostics.
//!
//! Only run-fatal setup errors live here: a broken inventory file or an
//! unreachable cluster. Per-device failures are outcomes, not errors --
//! they go in the summary table and drive the exit code instead.

use miette::Diagnostic;
use thiserror::Error;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    /// At least one device upload failed.
    pub const FAILED: i32 = 1;
    pub const CONFIG: i32 = 3;
    pub const KUBERNETES: i32 = 4;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("could not load the device inventory")]
    #[diagnostic(
        code(certship::config),
        help("Check the --config path and the file's JSON syntax.")
    )]
    Config(#[from] certship_config::ConfigError),

    #[error("could not connect to the Kubernetes cluster")]
    #[diagnostic(
        code(certship::kubernetes),
        help(
            "certship reads certificates and passwords from Kubernetes secrets.\n\
             Check your kubeconfig, or the service account when running in-cluster."
        )
    )]
    Kubernetes(#[source] kube::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => exit_code::CONFIG,
            Self::Kubernetes(_) => exit_code::KUBERNETES,
        }
    }
}
