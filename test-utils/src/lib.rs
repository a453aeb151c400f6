use anyhow::{Context, Result};
/// Test utilities for integration tests
/// Manages kind cluster lifecycle and in-cluster fixtures for the four
/// queryable resource kinds.
use std::process::Command;

pub const CLUSTER_NAME: &str = "clusterscope";
pub const QUERY_NAMESPACE: &str = "clusterscope-queries";

/// Test fixture that manages kind cluster lifecycle
pub struct KindCluster {
    cluster_name: String,
}

impl KindCluster {
    /// Get or create the test cluster
    /// Idempotent - safe to call multiple times
    pub fn setup() -> Result<Self> {
        let cluster = Self {
            cluster_name: CLUSTER_NAME.to_string(),
        };

        if !cluster.exists()? {
            println!("Creating kind cluster: {}", CLUSTER_NAME);
            cluster.create()?;
        } else {
            println!("Using existing kind cluster: {}", CLUSTER_NAME);
        }

        Ok(cluster)
    }

    /// Check if cluster exists
    fn exists(&self) -> Result<bool> {
        let output = Command::new("kind")
            .args(["get", "clusters"])
            .output()
            .context("Failed to execute 'kind get clusters'")?;

        if !output.status.success() {
            return Ok(false);
        }

        let clusters = String::from_utf8_lossy(&output.stdout);
        Ok(clusters
            .lines()
            .any(|line| line.trim() == self.cluster_name))
    }

    /// Create a single-node cluster and wait for it to become ready
    fn create(&self) -> Result<()> {
        let status = Command::new("kind")
            .args([
                "create",
                "cluster",
                "--name",
                &self.cluster_name,
                "--wait",
                "120s",
            ])
            .stdout(std::process::Stdio::inherit())
            .stderr(std::process::Stdio::inherit())
            .status()
            .context("Failed to spawn 'kind create cluster'")?;

        if !status.success() {
            anyhow::bail!("kind create cluster failed");
        }

        Ok(())
    }

    /// Get cluster name for kubectl context
    pub fn context_name(&self) -> String {
        format!("kind-{}", self.cluster_name)
    }
}

/// Delete the test cluster
/// Call this explicitly if you want to clean up
#[allow(dead_code)]
pub fn teardown_cluster() -> Result<()> {
    println!("Deleting kind cluster: {}", CLUSTER_NAME);

    let status = Command::new("kind")
        .args(["delete", "cluster", "--name", CLUSTER_NAME])
        .stdout(std::process::Stdio::inherit())
        .stderr(std::process::Stdio::inherit())
        .status()
        .context("Failed to delete cluster")?;

    if !status.success() {
        anyhow::bail!("Failed to delete cluster");
    }

    Ok(())
}

/// Recreate a clean fixture namespace, waiting out any previous deletion
pub async fn reset_namespace(
    name: &str,
    labels: std::collections::HashMap<String, String>,
) -> Result<()> {
    use k8s_openapi::api::core::v1::Namespace;
    use kube::{api::DeleteParams, Api, Client};

    let client = Client::try_default().await?;
    let namespaces: Api<Namespace> = Api::all(client);

    if namespaces.get_opt(name).await?.is_some() {
        namespaces
            .delete(name, &DeleteParams::default())
            .await
            .context("Failed to delete fixture namespace")?;

        // Namespace deletion is asynchronous; wait until it is gone
        for _ in 0..60 {
            if namespaces.get_opt(name).await?.is_none() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        }
    }

    let namespace = serde_json::json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "labels": labels,
        },
    });

    let pp = kube::api::PostParams::default();
    namespaces
        .create(&pp, &serde_json::from_value(namespace)?)
        .await
        .context("Failed to create fixture namespace")?;

    Ok(())
}

/// Helper to create a labeled pod running a pause container
pub async fn create_test_pod(
    namespace: &str,
    name: &str,
    labels: std::collections::HashMap<String, String>,
) -> Result<()> {
    use k8s_openapi::api::core::v1::Pod;
    use kube::{Api, Client};

    let client = Client::try_default().await?;
    let pods: Api<Pod> = Api::namespaced(client, namespace);

    let pod = serde_json::json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": name,
            "labels": labels,
        },
        "spec": {
            "containers": [{
                "name": "pause",
                "image": "registry.k8s.io/pause:3.9",
            }],
        },
    });

    let pp = kube::api::PostParams::default();
    pods.create(&pp, &serde_json::from_value(pod)?)
        .await
        .context("Failed to create test pod")?;

    Ok(())
}

/// Helper to create a ClusterIP service selecting pods labeled `app`
pub async fn create_test_service(
    namespace: &str,
    name: &str,
    labels: std::collections::HashMap<String, String>,
    app: &str,
) -> Result<()> {
    use k8s_openapi::api::core::v1::Service;
    use kube::{Api, Client};

    let client = Client::try_default().await?;
    let services: Api<Service> = Api::namespaced(client, namespace);

    let service = serde_json::json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {
            "name": name,
            "labels": labels,
        },
        "spec": {
            "type": "ClusterIP",
            "selector": {"app": app},
            "ports": [{"port": 80}],
        },
    });

    let pp = kube::api::PostParams::default();
    services
        .create(&pp, &serde_json::from_value(service)?)
        .await
        .context("Failed to create test service")?;

    Ok(())
}

/// Helper to create a pause-container deployment
pub async fn create_test_deployment(
    namespace: &str,
    name: &str,
    labels: std::collections::HashMap<String, String>,
    replicas: i32,
) -> Result<()> {
    use k8s_openapi::api::apps::v1::Deployment;
    use kube::{Api, Client};

    let client = Client::try_default().await?;
    let deployments: Api<Deployment> = Api::namespaced(client, namespace);

    let deployment = serde_json::json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "name": name,
            "labels": labels,
        },
        "spec": {
            "replicas": replicas,
            "selector": {"matchLabels": {"app": name}},
            "template": {
                "metadata": {"labels": {"app": name}},
                "spec": {
                    "containers": [{
                        "name": "pause",
                        "image": "registry.k8s.io/pause:3.9",
                    }],
                },
            },
        },
    });

    let pp = kube::api::PostParams::default();
    deployments
        .create(&pp, &serde_json::from_value(deployment)?)
        .await
        .context("Failed to create test deployment")?;

    Ok(())
}

/// Helper to delete a test pod
pub async fn delete_test_pod(namespace: &str, name: &str) -> Result<()> {
    use k8s_openapi::api::core::v1::Pod;
    use kube::{Api, Client};

    let client = Client::try_default().await?;
    let pods: Api<Pod> = Api::namespaced(client, namespace);

    let dp = kube::api::DeleteParams::default();
    pods.delete(name, &dp)
        .await
        .context("Failed to delete pod")?;

    Ok(())
}

/// Helper to wait for a pod to reach a status phase
pub async fn wait_for_pod_phase(namespace: &str, name: &str, phase: &str) -> Result<()> {
    use k8s_openapi::api::core::v1::Pod;
    use kube::{Api, Client};
    use std::time::Duration;
    use tokio::time::sleep;

    let client = Client::try_default().await?;
    let pods: Api<Pod> = Api::namespaced(client, namespace);

    for _ in 0..60 {
        let pod = pods.get(name).await?;

        if let Some(status) = &pod.status {
            if status.phase.as_deref() == Some(phase) {
                return Ok(());
            }
        }

        sleep(Duration::from_secs(1)).await;
    }

    anyhow::bail!("Pod {} did not reach phase {} in time", name, phase)
}
