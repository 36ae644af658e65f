//! In-memory kubeconfig materialization
//!
//! Builds a single-context kubeconfig (cluster, user and context all named by
//! the cluster ARN) around a freshly minted token, and turns it into a kube
//! client. The document only ever exists in memory and is dropped together
//! with the client at the end of the invocation.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use serde::Serialize;
use tracing::debug;

use eks_toggle_common::{ClusterDescriptor, Error};

use crate::token::{EphemeralCredential, TokenMinter};

/// Connection timeout for control-plane clients
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Read timeout for control-plane clients
pub const READ_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct KubeconfigDocument {
    #[serde(rename = "apiVersion")]
    api_version: &'static str,
    kind: &'static str,
    clusters: Vec<NamedCluster>,
    users: Vec<NamedUser>,
    contexts: Vec<NamedContext>,
    #[serde(rename = "current-context")]
    current_context: String,
}

#[derive(Debug, Serialize)]
struct NamedCluster {
    name: String,
    cluster: ClusterEntry,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct ClusterEntry {
    server: String,
    certificate_authority_data: String,
}

#[derive(Debug, Serialize)]
struct NamedUser {
    name: String,
    user: UserEntry,
}

#[derive(Debug, Serialize)]
struct UserEntry {
    token: String,
}

#[derive(Debug, Serialize)]
struct NamedContext {
    name: String,
    context: ContextEntry,
}

#[derive(Debug, Serialize)]
struct ContextEntry {
    cluster: String,
    user: String,
}

/// Check the descriptor carries everything a client needs.
///
/// Runs before any network call so a half-created cluster fails fast.
fn validated_parts(descriptor: &ClusterDescriptor) -> Result<(&str, &str), Error> {
    let endpoint = descriptor
        .endpoint
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| {
            Error::configuration_for(
                &descriptor.name,
                format!("cluster '{}' has no API endpoint", descriptor.name),
            )
        })?;
    if !endpoint.starts_with("https://") {
        return Err(Error::configuration_for(
            &descriptor.name,
            format!("cluster '{}' API endpoint is not https", descriptor.name),
        ));
    }

    let ca = descriptor
        .certificate_authority
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| {
            Error::configuration_for(
                &descriptor.name,
                format!("cluster '{}' has no certificate authority data", descriptor.name),
            )
        })?;
    STANDARD.decode(ca).map_err(|e| {
        Error::configuration_for(
            &descriptor.name,
            format!(
                "cluster '{}' certificate authority data is not base64: {}",
                descriptor.name, e
            ),
        )
    })?;

    Ok((endpoint, ca))
}

fn build_document(
    descriptor: &ClusterDescriptor,
    credential: &EphemeralCredential,
) -> Result<KubeconfigDocument, Error> {
    let (endpoint, ca) = validated_parts(descriptor)?;
    let name = descriptor.context_name().to_string();

    Ok(KubeconfigDocument {
        api_version: "v1",
        kind: "Config",
        clusters: vec![NamedCluster {
            name: name.clone(),
            cluster: ClusterEntry {
                server: endpoint.to_string(),
                certificate_authority_data: ca.to_string(),
            },
        }],
        users: vec![NamedUser {
            name: name.clone(),
            user: UserEntry {
                token: credential.token().to_string(),
            },
        }],
        contexts: vec![NamedContext {
            name: name.clone(),
            context: ContextEntry {
                cluster: name.clone(),
                user: name.clone(),
            },
        }],
        current_context: name,
    })
}

/// Build the parsed kubeconfig for `descriptor` authenticated by `credential`.
pub fn materialize(
    descriptor: &ClusterDescriptor,
    credential: &EphemeralCredential,
) -> Result<Kubeconfig, Error> {
    let document = build_document(descriptor, credential)?;
    let yaml = serde_yaml::to_string(&document)
        .map_err(|e| Error::serialization_for_kind("Kubeconfig", e.to_string()))?;
    Kubeconfig::from_yaml(&yaml)
        .map_err(|e| Error::serialization_for_kind("Kubeconfig", e.to_string()))
}

/// Mint a token for `descriptor` and build a kube client around it.
pub async fn client_for_cluster(
    minter: &TokenMinter,
    descriptor: &ClusterDescriptor,
) -> Result<Client, Error> {
    // validate first so a malformed descriptor never triggers credential resolution
    validated_parts(descriptor)?;

    let credential = minter.mint(&descriptor.name, &descriptor.region).await?;
    let kubeconfig = materialize(descriptor, &credential)?;

    let mut config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| {
            Error::authentication_for(
                &descriptor.name,
                format!("failed to load kubeconfig: {}", e),
            )
        })?;
    config.connect_timeout = Some(CONNECT_TIMEOUT);
    config.read_timeout = Some(READ_TIMEOUT);

    let client = Client::try_from(config).map_err(|e| {
        Error::authentication_for(&descriptor.name, format!("failed to create client: {}", e))
    })?;

    debug!(cluster = %descriptor.name, "Control-plane client ready");
    Ok(client)
}
