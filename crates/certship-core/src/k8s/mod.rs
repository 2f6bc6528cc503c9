// Kubernetes collaborators.
//
// Two concerns, both simple CRUD against the cluster: reading the issued
// certificate and device passwords out of namespaced secrets, and
// declaratively ensuring the auxiliary cert-manager / external-dns
// resources exist. Client construction uses kube's default inference
// (in-cluster config, falling back to the local kubeconfig).

pub mod resources;
pub mod secrets;

pub use resources::{IssuerKind, Reconciler};
pub use secrets::{KubeSecretStore, SecretSource};
