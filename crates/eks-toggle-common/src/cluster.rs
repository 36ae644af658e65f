//! Cluster descriptor as returned by the provider's describe-cluster call

/// Read-only view of one EKS cluster for the duration of an invocation.
///
/// `endpoint` and `certificate_authority` stay optional here because the
/// provider may omit them (e.g. while a cluster is still creating); consumers
/// that need them reject their absence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterDescriptor {
    /// Cluster name
    pub name: String,
    /// Region the cluster lives in
    pub region: String,
    /// API server URL
    pub endpoint: Option<String>,
    /// Base64-encoded PEM bundle of the cluster CA
    pub certificate_authority: Option<String>,
    /// Cluster ARN; falls back to the name when the provider omits it
    pub arn: String,
}

impl ClusterDescriptor {
    /// Identifier used for kubeconfig cluster/user/context names
    pub fn context_name(&self) -> &str {
        if self.arn.is_empty() {
            &self.name
        } else {
            &self.arn
        }
    }
}
