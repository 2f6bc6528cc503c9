// Declarative auxiliary resources.
//
// Each device gets a cert-manager `Certificate` (so the pair we ship is
// actually issued and renewed) and an external-dns `DNSEndpoint` (so the
// certificate's DNS name resolves to the device). Both are ensured with
// server-side apply: one idempotent call whether the object exists or not.

use std::fmt;

use kube::api::{Patch, PatchParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::Api;
use serde_json::json;
use tracing::info;

use crate::error::CoreError;
use crate::model::DeviceTarget;

/// Field manager name for server-side apply.
const FIELD_MANAGER: &str = "certship";

/// cert-manager issuer kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IssuerKind {
    #[default]
    Issuer,
    ClusterIssuer,
}

impl fmt::Display for IssuerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issuer => write!(f, "Issuer"),
            Self::ClusterIssuer => write!(f, "ClusterIssuer"),
        }
    }
}

/// Ensures the per-device cluster resources exist and are up to date.
pub struct Reconciler {
    certificates: Api<DynamicObject>,
    dns_endpoints: Api<DynamicObject>,
    namespace: String,
}

impl Reconciler {
    pub fn new(client: kube::Client, namespace: &str) -> Self {
        let cert_gvk = GroupVersionKind::gvk("cert-manager.io", "v1", "Certificate");
        let dns_gvk = GroupVersionKind::gvk("externaldns.k8s.io", "v1alpha1", "DNSEndpoint");

        Self {
            certificates: Api::namespaced_with(
                client.clone(),
                namespace,
                &ApiResource::from_gvk(&cert_gvk),
            ),
            dns_endpoints: Api::namespaced_with(
                client,
                namespace,
                &ApiResource::from_gvk(&dns_gvk),
            ),
            namespace: namespace.to_owned(),
        }
    }

    /// Ensure the cert-manager `Certificate` for a device.
    pub async fn ensure_certificate(
        &self,
        target: &DeviceTarget,
        issuer_name: &str,
        issuer_kind: IssuerKind,
        domain_suffix: &str,
    ) -> Result<(), CoreError> {
        let dns_name = format!("{}{domain_suffix}", target.name);
        let manifest = json!({
            "apiVersion": "cert-manager.io/v1",
            "kind": "Certificate",
            "metadata": {
                "name": target.cert_name,
                "namespace": self.namespace,
            },
            "spec": {
                "secretName": target.cert_secret,
                "issuerRef": {
                    "group": "cert-manager.io",
                    "kind": issuer_kind.to_string(),
                    "name": issuer_name,
                },
                "dnsNames": [dns_name],
            }
        });

        self.apply(&self.certificates, &target.cert_name, manifest, "Certificate")
            .await
    }

    /// Ensure the external-dns `DNSEndpoint` (A record) for a device.
    pub async fn ensure_dns_endpoint(
        &self,
        target: &DeviceTarget,
        domain_suffix: &str,
    ) -> Result<(), CoreError> {
        let name = format!("{}-dns", target.name);
        let dns_name = format!("{}{domain_suffix}", target.name);
        let manifest = json!({
            "apiVersion": "externaldns.k8s.io/v1alpha1",
            "kind": "DNSEndpoint",
            "metadata": {
                "name": name,
                "namespace": self.namespace,
            },
            "spec": {
                "endpoints": [{
                    "dnsName": dns_name,
                    "recordType": "A",
                    "targets": [target.host],
                }],
            }
        });

        self.apply(&self.dns_endpoints, &name, manifest, "DNSEndpoint")
            .await
    }

    async fn apply(
        &self,
        api: &Api<DynamicObject>,
        name: &str,
        manifest: serde_json::Value,
        kind: &str,
    ) -> Result<(), CoreError> {
        let params = PatchParams::apply(FIELD_MANAGER).force();
        api.patch(name, &params, &Patch::Apply(&manifest))
            .await
            .map_err(|e| CoreError::Reconcile {
                resource: format!("{kind}/{name}"),
                reason: e.to_string(),
            })?;

        info!("ensured {kind} {name}");
        Ok(())
    }
}
