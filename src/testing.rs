//! In-process fakes of the AWS backend shared by front-door tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use eks_toggle_common::audit::NoopIntentRecorder;
use eks_toggle_common::{ClusterDescriptor, Error as ToggleError, ToggleConfig, PROVIDER_EKS};
use eks_toggle_scaler::{
    ClusterApi, ControlPlaneConnector, NodeGroupScaling, NodePoolApi, RegionBackend,
    RegionClients, ScaleOrchestrator,
};

use crate::server::AppState;

/// Provider calls seen by the fakes
#[derive(Clone, Default)]
pub(crate) struct Calls {
    inner: Arc<Mutex<Vec<String>>>,
}

impl Calls {
    fn push(&self, call: String) {
        self.inner.lock().unwrap().push(call);
    }

    pub(crate) fn all(&self) -> Vec<String> {
        self.inner.lock().unwrap().clone()
    }
}

struct FakeClusters {
    calls: Calls,
    resize_fails: bool,
}

#[async_trait]
impl ClusterApi for FakeClusters {
    async fn describe_cluster(&self, name: &str) -> std::result::Result<ClusterDescriptor, ToggleError> {
        self.calls.push(format!("describe {}", name));
        Ok(ClusterDescriptor {
            name: name.to_string(),
            region: "ap-northeast-1".to_string(),
            endpoint: Some("https://example.eks.amazonaws.com".to_string()),
            certificate_authority: Some("Y2E=".to_string()),
            arn: format!("arn:aws:eks:ap-northeast-1:123456789012:cluster/{}", name),
        })
    }

    async fn update_nodegroup_scaling(
        &self,
        cluster: &str,
        node_group: &str,
        scaling: NodeGroupScaling,
    ) -> std::result::Result<Option<String>, ToggleError> {
        self.calls.push(format!(
            "resize {} {} {}",
            cluster, node_group, scaling.desired_size
        ));
        if self.resize_fails {
            Err(ToggleError::provider_for(cluster, PROVIDER_EKS, "throttled"))
        } else {
            Ok(None)
        }
    }

    async fn list_clusters(&self) -> std::result::Result<Vec<String>, ToggleError> {
        self.calls.push("list".to_string());
        Ok(vec!["eks-simulation-hpa".to_string(), "scratch".to_string()])
    }
}

struct FakeNodePools {
    calls: Calls,
}

#[async_trait]
impl NodePoolApi for FakeNodePools {
    async fn patch_cpu_limit(
        &self,
        name: &str,
        cpu_limit: u64,
    ) -> std::result::Result<Option<u64>, ToggleError> {
        self.calls.push(format!("patch {} {}", name, cpu_limit));
        Ok(Some(cpu_limit))
    }
}

struct FakeConnector {
    calls: Calls,
}

#[async_trait]
impl ControlPlaneConnector for FakeConnector {
    async fn connect(
        &self,
        _cluster: &ClusterDescriptor,
    ) -> std::result::Result<Box<dyn NodePoolApi>, ToggleError> {
        Ok(Box::new(FakeNodePools {
            calls: self.calls.clone(),
        }))
    }
}

struct FakeBackend {
    calls: Calls,
    resize_fails: bool,
}

#[async_trait]
impl RegionBackend for FakeBackend {
    async fn connect(&self, region: &str) -> std::result::Result<RegionClients, ToggleError> {
        self.calls.push(format!("connect {}", region));
        Ok(RegionClients {
            clusters: Box::new(FakeClusters {
                calls: self.calls.clone(),
                resize_fails: self.resize_fails,
            }),
            control_plane: Box::new(FakeConnector {
                calls: self.calls.clone(),
            }),
        })
    }
}

/// State wired to the fakes and the packaged cluster mapping
pub(crate) fn test_state(resize_fails: bool) -> (AppState, Calls) {
    let calls = Calls::default();
    let config =
        ToggleConfig::from_yaml(include_str!("../deploy/clusters.yaml")).unwrap();
    let orchestrator = ScaleOrchestrator::new(
        Arc::new(config),
        Arc::new(FakeBackend {
            calls: calls.clone(),
            resize_fails,
        }),
        Arc::new(NoopIntentRecorder),
    );
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
    };
    (state, calls)
}
