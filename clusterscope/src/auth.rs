use crate::config::Config;
use crate::error::{QueryError, QueryResult};
use async_trait::async_trait;
use kube::config::KubeConfigOptions;
use kube::{Client, Config as KubeConfig};

/// Capability that yields an authenticated cluster connection.
///
/// The facade calls [`typed_client`](ClusterAuth::typed_client) exactly once
/// at construction time. [`dynamic_client`](ClusterAuth::dynamic_client) is
/// the contract's second variant for dynamically-typed resource access
/// (`kube::api::DynamicObject`); in kube-rs the same `Client` serves both,
/// so the default implementation delegates.
#[async_trait]
pub trait ClusterAuth: Send + Sync {
    /// Yield a client for strongly-typed queries.
    async fn typed_client(&self) -> QueryResult<Client>;

    /// Yield a client for dynamically-typed, discovery-driven access.
    async fn dynamic_client(&self) -> QueryResult<Client> {
        self.typed_client().await
    }
}

/// Production connection provider backed by kubeconfig resolution.
///
/// Without an explicit context this uses the default chain:
/// 1. In-cluster service account (when running in K8s)
/// 2. KUBECONFIG environment variable
/// 3. ~/.kube/config
#[derive(Debug, Clone, Default)]
pub struct KubeconfigAuth {
    context: Option<String>,
}

impl KubeconfigAuth {
    pub fn new() -> Self {
        Self { context: None }
    }

    /// Authenticate against a named kubeconfig context.
    pub fn with_context(context: impl Into<String>) -> Self {
        Self {
            context: Some(context.into()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            context: config.context.clone(),
        }
    }
}

#[async_trait]
impl ClusterAuth for KubeconfigAuth {
    async fn typed_client(&self) -> QueryResult<Client> {
        let client = match &self.context {
            Some(context) => {
                let options = KubeConfigOptions {
                    context: Some(context.clone()),
                    ..KubeConfigOptions::default()
                };
                let kube_config = KubeConfig::from_kubeconfig(&options).await.map_err(|e| {
                    QueryError::Unavailable {
                        action: format!("loading kubeconfig context {:?}", context),
                        source: Box::new(e),
                    }
                })?;
                Client::try_from(kube_config).map_err(|e| QueryError::Unavailable {
                    action: "initializing cluster client".to_string(),
                    source: Box::new(e),
                })?
            }
            None => Client::try_default()
                .await
                .map_err(|e| QueryError::Unavailable {
                    action: "initializing cluster client".to_string(),
                    source: Box::new(e),
                })?,
        };

        tracing::debug!("cluster client initialized");
        Ok(client)
    }
}
