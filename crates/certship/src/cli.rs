//! Clap derive structures for the `certship` CLI.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use certship_core::{IssuerKind, TlsMode};

/// certship -- ship issued TLS certificates to network devices
#[derive(Debug, Parser)]
#[command(
    name = "certship",
    version,
    about = "Deploy TLS certificates from Kubernetes secrets to network devices",
    long_about = "Reads a device inventory, fetches each device's certificate and\n\
        password from Kubernetes secrets, and installs the certificate over the\n\
        device's own management API (MikroTik routers, Reolink cameras).\n\n\
        Optionally keeps a cert-manager Certificate and an external-dns\n\
        DNSEndpoint in sync for every device."
)]
pub struct Cli {
    /// Path to the device inventory JSON file
    #[arg(long, short = 'c', env = "CERTSHIP_CONFIG", value_name = "FILE")]
    pub config: PathBuf,

    /// Kubernetes namespace holding the secrets and resources
    #[arg(long, short = 'n', env = "CERTSHIP_NAMESPACE", default_value = "default")]
    pub namespace: String,

    /// Skip creating/updating Certificate and DNSEndpoint resources
    #[arg(long)]
    pub skip_resources: bool,

    /// cert-manager issuer name
    #[arg(long, env = "CERTSHIP_ISSUER", default_value = "letsencrypt-prod")]
    pub issuer: String,

    /// cert-manager issuer kind
    #[arg(long, value_enum, default_value_t = IssuerKindArg::Issuer)]
    pub issuer_kind: IssuerKindArg,

    /// Domain suffix appended to device names for DNS records
    #[arg(long, env = "CERTSHIP_DOMAIN_SUFFIX", default_value = ".example.com")]
    pub domain_suffix: String,

    /// Device connection timeout in seconds
    #[arg(long, env = "CERTSHIP_TIMEOUT", default_value = "30")]
    pub timeout: u64,

    /// Verify camera HTTPS certificates against the system trust store
    /// (the default accepts the self-signed certs devices ship with)
    #[arg(long, env = "CERTSHIP_VERIFY_TLS", conflicts_with = "ca_cert")]
    pub verify_tls: bool,

    /// Verify camera HTTPS certificates against a CA bundle (PEM file)
    #[arg(long, env = "CERTSHIP_CA_CERT", value_name = "FILE")]
    pub ca_cert: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

impl Cli {
    /// Resolve the TLS flags into a transport verification mode.
    pub fn tls_mode(&self) -> TlsMode {
        match (&self.ca_cert, self.verify_tls) {
            (Some(path), _) => TlsMode::CustomCa(path.clone()),
            (None, true) => TlsMode::System,
            (None, false) => TlsMode::DangerAcceptInvalid,
        }
    }
}

/// CLI-side mirror of [`IssuerKind`] so clap can parse it.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum IssuerKindArg {
    #[value(name = "Issuer")]
    Issuer,
    #[value(name = "ClusterIssuer")]
    ClusterIssuer,
}

impl From<IssuerKindArg> for IssuerKind {
    fn from(arg: IssuerKindArg) -> Self {
        match arg {
            IssuerKindArg::Issuer => Self::Issuer,
            IssuerKindArg::ClusterIssuer => Self::ClusterIssuer,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn tls_defaults_to_accepting_device_certs() {
        let cli = Cli::parse_from(["certship", "--config", "devices.json"]);
        assert!(matches!(cli.tls_mode(), TlsMode::DangerAcceptInvalid));
    }

    #[test]
    fn verify_tls_selects_the_system_store() {
        let cli = Cli::parse_from(["certship", "--config", "devices.json", "--verify-tls"]);
        assert!(matches!(cli.tls_mode(), TlsMode::System));
    }

    #[test]
    fn ca_cert_selects_a_custom_ca() {
        let cli = Cli::parse_from([
            "certship",
            "--config",
            "devices.json",
            "--ca-cert",
            "/etc/certship/ca.pem",
        ]);
        match cli.tls_mode() {
            TlsMode::CustomCa(path) => {
                assert_eq!(path, PathBuf::from("/etc/certship/ca.pem"));
            }
            other => panic!("expected custom CA mode, got {other:?}"),
        }
    }

    #[test]
    fn verify_tls_and_ca_cert_are_mutually_exclusive() {
        let err = Cli::try_parse_from([
            "certship",
            "--config",
            "devices.json",
            "--verify-tls",
            "--ca-cert",
            "ca.pem",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
