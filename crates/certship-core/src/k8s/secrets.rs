// Secret store access.
//
// TLS secrets follow the `kubernetes.io/tls` convention (`tls.crt` /
// `tls.key`); device passwords live under a `password` key. kube hands us
// the values already base64-decoded.

use k8s_openapi::api::core::v1::Secret;
use kube::Api;
use secrecy::SecretString;
use tracing::debug;

use crate::error::CoreError;
use crate::model::CertificateMaterial;

/// Where certificate material and device passwords come from.
///
/// Abstracted so the deploy loop can run against an in-memory fake in
/// tests; the one real implementation is [`KubeSecretStore`]. Stateless
/// per call, safe to share across the sequential device loop.
pub trait SecretSource {
    /// Fetch an issued certificate/key pair from the store.
    fn tls_certificate(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<CertificateMaterial, CoreError>> + Send;

    /// Fetch a device password from the store.
    fn password(
        &self,
        name: &str,
        key: &str,
    ) -> impl Future<Output = Result<SecretString, CoreError>> + Send;
}

/// Namespaced Kubernetes secret reader.
pub struct KubeSecretStore {
    api: Api<Secret>,
    namespace: String,
}

impl KubeSecretStore {
    pub fn new(client: kube::Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            namespace: namespace.to_owned(),
        }
    }

    async fn field(&self, secret_name: &str, key: &str) -> Result<String, CoreError> {
        debug!(
            "fetching secret {secret_name} (key {key}) from namespace {}",
            self.namespace
        );

        let secret = self
            .api
            .get(secret_name)
            .await
            .map_err(|e| CoreError::SecretNotFound {
                name: secret_name.to_owned(),
                reason: e.to_string(),
            })?;

        let data = secret.data.unwrap_or_default();
        let bytes = data.get(key).ok_or_else(|| CoreError::MalformedSecret {
            name: secret_name.to_owned(),
            field: key.to_owned(),
        })?;

        String::from_utf8(bytes.0.clone()).map_err(|_| CoreError::MalformedSecret {
            name: secret_name.to_owned(),
            field: key.to_owned(),
        })
    }
}

impl SecretSource for KubeSecretStore {
    async fn tls_certificate(&self, name: &str) -> Result<CertificateMaterial, CoreError> {
        let cert_pem = self.field(name, "tls.crt").await?;
        let key_pem = self.field(name, "tls.key").await?;
        Ok(CertificateMaterial {
            cert_pem,
            key_pem: key_pem.into(),
        })
    }

    async fn password(&self, name: &str, key: &str) -> Result<SecretString, CoreError> {
        self.field(name, key).await.map(SecretString::from)
    }
}
