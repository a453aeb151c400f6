use crate::error::QueryResult;
use async_trait::async_trait;

/// Read-only query surface for a namespace-scoped resource kind.
///
/// One contract serves Pods, Services, and Deployments; implementations are
/// stateless and safe for concurrent use. An empty selector matches
/// everything in the namespace; zero matches is success, not an error.
#[async_trait]
pub trait NamespacedQuery<K>: Send + Sync {
    /// Fetch a single record by identity. `namespace` and `name` must be
    /// non-empty.
    async fn get_by_name(&self, namespace: &str, name: &str) -> QueryResult<K>;

    /// List records whose labels satisfy `label_selector`.
    async fn list_by_label(&self, namespace: &str, label_selector: &str) -> QueryResult<Vec<K>>;

    /// List records whose fields satisfy `field_selector`.
    async fn list_by_field(&self, namespace: &str, field_selector: &str) -> QueryResult<Vec<K>>;
}

/// Read-only query surface for a cluster-scoped resource kind (Namespaces).
///
/// Identical contract to [`NamespacedQuery`] minus the namespace argument.
#[async_trait]
pub trait ClusterQuery<K>: Send + Sync {
    /// Fetch a single record by name. `name` must be non-empty.
    async fn get_by_name(&self, name: &str) -> QueryResult<K>;

    /// List records whose labels satisfy `label_selector`.
    async fn list_by_label(&self, label_selector: &str) -> QueryResult<Vec<K>>;

    /// List records whose fields satisfy `field_selector`.
    async fn list_by_field(&self, field_selector: &str) -> QueryResult<Vec<K>>;
}
