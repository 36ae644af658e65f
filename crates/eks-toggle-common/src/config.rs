//! Toggle configuration
//!
//! Loaded once at startup from a YAML file and shared read-only for the life
//! of the process. The file maps each toggleable cluster to the managed node
//! group it controls and names the Karpenter NodePool object to patch.
//!
//! ```yaml
//! defaultRegion: ap-northeast-1
//! nodePool:
//!   group: karpenter.sh
//!   version: v1beta1
//!   plural: nodepools
//!   name: default
//! clusters:
//!   eks-simulation-hpa: eks-node-group-hpa-1-2024082300130146580000000f
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, DEFAULT_REGION};

/// Coordinates of the cluster-scoped custom object holding the CPU limit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePoolRef {
    /// API group (e.g. "karpenter.sh")
    #[serde(default = "default_group")]
    pub group: String,
    /// API version (e.g. "v1beta1")
    #[serde(default = "default_version")]
    pub version: String,
    /// Resource plural (e.g. "nodepools")
    #[serde(default = "default_plural")]
    pub plural: String,
    /// Resource kind (e.g. "NodePool")
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Object name
    #[serde(default = "default_name")]
    pub name: String,
}

fn default_group() -> String {
    "karpenter.sh".to_string()
}

fn default_version() -> String {
    "v1beta1".to_string()
}

fn default_plural() -> String {
    "nodepools".to_string()
}

fn default_kind() -> String {
    "NodePool".to_string()
}

fn default_name() -> String {
    "default".to_string()
}

impl Default for NodePoolRef {
    fn default() -> Self {
        Self {
            group: default_group(),
            version: default_version(),
            plural: default_plural(),
            kind: default_kind(),
            name: default_name(),
        }
    }
}

/// Static mapping from cluster name to the managed node group it controls
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeGroupTargets(BTreeMap<String, String>);

impl NodeGroupTargets {
    /// Resolve the node group for a cluster.
    ///
    /// An unmapped cluster is a configuration error; it is never retried.
    pub fn resolve(&self, cluster: &str) -> Result<&str, Error> {
        self.0.get(cluster).map(String::as_str).ok_or_else(|| {
            Error::configuration_for(
                cluster,
                format!("cluster '{}' has no node group configured", cluster),
            )
        })
    }

    /// Configured cluster names, sorted
    pub fn clusters(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// True when no cluster is configured
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for NodeGroupTargets {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Process-wide configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleConfig {
    /// Region used when a request does not name one
    #[serde(default = "default_region")]
    pub default_region: String,
    /// Custom object carrying the CPU limit
    #[serde(default)]
    pub node_pool: NodePoolRef,
    /// Cluster name -> managed node group name
    pub clusters: NodeGroupTargets,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl ToggleConfig {
    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(input: &str) -> Result<Self, Error> {
        let config: ToggleConfig = crate::yaml::from_yaml(input, "ToggleConfig")?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate configuration from a file
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml(&content)
    }

    /// Check invariants the rest of the service relies on
    pub fn validate(&self) -> Result<(), Error> {
        if self.clusters.is_empty() {
            return Err(Error::configuration("no clusters configured"));
        }
        for (cluster, node_group) in &self.clusters.0 {
            if cluster.trim().is_empty() {
                return Err(Error::configuration("empty cluster name in clusters"));
            }
            if node_group.trim().is_empty() {
                return Err(Error::configuration_for(
                    cluster,
                    format!("cluster '{}' maps to an empty node group name", cluster),
                ));
            }
        }
        let np = &self.node_pool;
        if [&np.group, &np.version, &np.plural, &np.kind, &np.name]
            .iter()
            .any(|s| s.trim().is_empty())
        {
            return Err(Error::configuration(
                "nodePool group, version, plural, kind and name must be non-empty",
            ));
        }
        if self.default_region.trim().is_empty() {
            return Err(Error::configuration("defaultRegion must be non-empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIPPED: &str = include_str!("../../../deploy/clusters.yaml");

    #[test]
    fn shipped_config_is_valid() {
        let config = ToggleConfig::from_yaml(SHIPPED).unwrap();
        assert_eq!(config.default_region, "ap-northeast-1");
        assert_eq!(config.node_pool, NodePoolRef::default());
        assert_eq!(config.clusters.clusters().count(), 3);
    }

    #[test]
    fn shipped_config_resolves_hpa_simulation_cluster() {
        let config = ToggleConfig::from_yaml(SHIPPED).unwrap();
        assert_eq!(
            config.clusters.resolve("eks-simulation-hpa").unwrap(),
            "eks-node-group-hpa-1-2024082300130146580000000f"
        );
    }

    #[test]
    fn unmapped_cluster_is_configuration_error() {
        let config = ToggleConfig::from_yaml(SHIPPED).unwrap();
        let err = config.clusters.resolve("not-a-cluster").unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert_eq!(err.cluster(), Some("not-a-cluster"));
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let config = ToggleConfig::from_yaml("clusters:\n  a: ng-a\n").unwrap();
        assert_eq!(config.default_region, DEFAULT_REGION);
        assert_eq!(config.node_pool.group, "karpenter.sh");
        assert_eq!(config.node_pool.version, "v1beta1");
        assert_eq!(config.node_pool.name, "default");
    }

    #[test]
    fn node_pool_can_be_overridden() {
        let yaml = r#"
nodePool:
  version: v1
clusters:
  a: ng-a
"#;
        let config = ToggleConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.node_pool.group, "karpenter.sh");
        assert_eq!(config.node_pool.version, "v1");
        assert_eq!(config.node_pool.plural, "nodepools");
    }

    #[test]
    fn empty_cluster_map_rejected() {
        let err = ToggleConfig::from_yaml("clusters: {}\n").unwrap_err();
        assert!(err.to_string().contains("no clusters configured"));
    }

    #[test]
    fn missing_clusters_section_rejected() {
        assert!(ToggleConfig::from_yaml("defaultRegion: us-east-1\n").is_err());
    }

    #[test]
    fn empty_node_group_rejected() {
        let err = ToggleConfig::from_yaml("clusters:\n  a: \"\"\n").unwrap_err();
        assert_eq!(err.cluster(), Some("a"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ToggleConfig::load(Path::new("/nonexistent/clusters.yaml")).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
        assert!(err.to_string().contains("/nonexistent/clusters.yaml"));
    }

    #[test]
    fn targets_list_clusters_sorted() {
        let targets: NodeGroupTargets = [
            ("b".to_string(), "ng-b".to_string()),
            ("a".to_string(), "ng-a".to_string()),
        ]
        .into_iter()
        .collect();
        assert_eq!(targets.clusters().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(targets.resolve("a").unwrap(), "ng-a");
        assert!(targets.resolve("c").is_err());
    }
}
