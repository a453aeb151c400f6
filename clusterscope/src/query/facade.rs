use crate::auth::ClusterAuth;
use crate::config::Config;
use crate::error::QueryResult;
use crate::query::reader::TypedReader;
use crate::query::traits::{ClusterQuery, NamespacedQuery};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Pod, Service};
use kube::Client;
use std::sync::Arc;
use std::time::Duration;

/// Single entry point to the typed query surface.
///
/// Holds one query component per resource kind behind its interface type.
/// Construction obtains the connection handle from the provider exactly
/// once; on failure nothing is wired and the error propagates with its
/// cause. After construction every accessor is infallible.
pub struct ClusterApi {
    pods: Arc<dyn NamespacedQuery<Pod>>,
    services: Arc<dyn NamespacedQuery<Service>>,
    deployments: Arc<dyn NamespacedQuery<Deployment>>,
    namespaces: Arc<dyn ClusterQuery<Namespace>>,
}

impl ClusterApi {
    /// Build a facade from a connection provider.
    pub async fn connect<A>(auth: &A) -> QueryResult<Self>
    where
        A: ClusterAuth + ?Sized,
    {
        let client = auth.typed_client().await?;
        Ok(Self::assemble(client, None))
    }

    /// Build a facade from a connection provider, applying the configured
    /// per-call deadline to every component.
    pub async fn connect_with<A>(auth: &A, config: &Config) -> QueryResult<Self>
    where
        A: ClusterAuth + ?Sized,
    {
        let client = auth.typed_client().await?;
        Ok(Self::assemble(client, config.deadline))
    }

    /// Wire a facade from an explicit connection handle.
    pub fn from_client(client: Client) -> Self {
        Self::assemble(client, None)
    }

    /// Wire a facade from externally built components, for substituting
    /// mocks in tests.
    pub fn from_parts(
        pods: Arc<dyn NamespacedQuery<Pod>>,
        services: Arc<dyn NamespacedQuery<Service>>,
        deployments: Arc<dyn NamespacedQuery<Deployment>>,
        namespaces: Arc<dyn ClusterQuery<Namespace>>,
    ) -> Self {
        Self {
            pods,
            services,
            deployments,
            namespaces,
        }
    }

    fn assemble(client: Client, deadline: Option<Duration>) -> Self {
        fn reader<K>(client: &Client, deadline: Option<Duration>) -> TypedReader<K> {
            match deadline {
                Some(limit) => TypedReader::with_deadline(client.clone(), limit),
                None => TypedReader::new(client.clone()),
            }
        }

        tracing::info!("cluster query facade assembled");

        Self {
            pods: Arc::new(reader::<Pod>(&client, deadline)),
            services: Arc::new(reader::<Service>(&client, deadline)),
            deployments: Arc::new(reader::<Deployment>(&client, deadline)),
            namespaces: Arc::new(reader::<Namespace>(&client, deadline)),
        }
    }

    /// Pod query interface.
    pub fn pods(&self) -> Arc<dyn NamespacedQuery<Pod>> {
        Arc::clone(&self.pods)
    }

    /// Service query interface.
    pub fn services(&self) -> Arc<dyn NamespacedQuery<Service>> {
        Arc::clone(&self.services)
    }

    /// Deployment query interface.
    pub fn deployments(&self) -> Arc<dyn NamespacedQuery<Deployment>> {
        Arc::clone(&self.deployments)
    }

    /// Namespace query interface.
    pub fn namespaces(&self) -> Arc<dyn ClusterQuery<Namespace>> {
        Arc::clone(&self.namespaces)
    }
}
