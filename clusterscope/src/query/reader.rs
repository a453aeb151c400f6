use crate::error::{classify_kube_error, require_nonempty, QueryError, QueryResult};
use crate::query::traits::{ClusterQuery, NamespacedQuery};
use async_trait::async_trait;
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::api::ListParams;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

/// Real query component: a direct translator from the query contract to a
/// single `kube::Api` call against the shared connection handle.
///
/// One generic component serves every resource kind, so the contract cannot
/// drift between kinds. Stateless beyond the injected client and the
/// optional deadline; safe for concurrent use.
pub struct TypedReader<K> {
    client: Client,
    deadline: Option<Duration>,
    _kind: PhantomData<fn() -> K>,
}

impl<K> TypedReader<K> {
    /// Create a reader over an injected connection handle.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            deadline: None,
            _kind: PhantomData,
        }
    }

    /// Create a reader whose calls fail with `DeadlineExceeded` when the
    /// backing call overruns `deadline`.
    pub fn with_deadline(client: Client, deadline: Duration) -> Self {
        Self {
            client,
            deadline: Some(deadline),
            _kind: PhantomData,
        }
    }
}

impl<K> Clone for TypedReader<K> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            deadline: self.deadline,
            _kind: PhantomData,
        }
    }
}

pub(crate) fn kind_of<K>() -> String
where
    K: Resource<DynamicType = ()>,
{
    K::kind(&()).into_owned()
}

impl<K> TypedReader<K>
where
    K: Resource<DynamicType = ()>,
{
    /// Drive one backing call under the configured deadline and classify
    /// its failure, attaching the operation context.
    async fn run<T, F>(&self, action: &str, key: &str, call: F) -> QueryResult<T>
    where
        F: Future<Output = Result<T, kube::Error>> + Send,
    {
        let outcome = match self.deadline {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(QueryError::DeadlineExceeded {
                        action: action.to_string(),
                    })
                }
            },
            None => call.await,
        };

        outcome.map_err(|e| classify_kube_error(&kind_of::<K>(), key, action, e))
    }
}

fn label_params(label_selector: &str) -> ListParams {
    if label_selector.is_empty() {
        ListParams::default()
    } else {
        ListParams::default().labels(label_selector)
    }
}

fn field_params(field_selector: &str) -> ListParams {
    if field_selector.is_empty() {
        ListParams::default()
    } else {
        ListParams::default().fields(field_selector)
    }
}

#[async_trait]
impl<K> NamespacedQuery<K> for TypedReader<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug
        + Send
        + Sync,
{
    async fn get_by_name(&self, namespace: &str, name: &str) -> QueryResult<K> {
        let kind = kind_of::<K>();
        require_nonempty(&kind, "namespace", namespace)?;
        require_nonempty(&kind, "name", name)?;

        tracing::debug!(kind = %kind, %namespace, %name, "get by name");

        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let action = format!("getting {} {:?} in namespace {:?}", kind, name, namespace);
        self.run(&action, name, api.get(name)).await
    }

    async fn list_by_label(&self, namespace: &str, label_selector: &str) -> QueryResult<Vec<K>> {
        let kind = kind_of::<K>();
        require_nonempty(&kind, "namespace", namespace)?;

        tracing::debug!(kind = %kind, %namespace, selector = %label_selector, "list by label");

        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let params = label_params(label_selector);
        let action = format!(
            "listing {} in namespace {:?} by label {:?}",
            kind, namespace, label_selector
        );
        let list = self.run(&action, label_selector, api.list(&params)).await?;
        Ok(list.items)
    }

    async fn list_by_field(&self, namespace: &str, field_selector: &str) -> QueryResult<Vec<K>> {
        let kind = kind_of::<K>();
        require_nonempty(&kind, "namespace", namespace)?;

        tracing::debug!(kind = %kind, %namespace, selector = %field_selector, "list by field");

        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let params = field_params(field_selector);
        let action = format!(
            "listing {} in namespace {:?} by field {:?}",
            kind, namespace, field_selector
        );
        let list = self.run(&action, field_selector, api.list(&params)).await?;
        Ok(list.items)
    }
}

#[async_trait]
impl<K> ClusterQuery<K> for TypedReader<K>
where
    K: Resource<Scope = ClusterResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug
        + Send
        + Sync,
{
    async fn get_by_name(&self, name: &str) -> QueryResult<K> {
        let kind = kind_of::<K>();
        require_nonempty(&kind, "name", name)?;

        tracing::debug!(kind = %kind, %name, "get by name");

        let api: Api<K> = Api::all(self.client.clone());
        let action = format!("getting {} {:?}", kind, name);
        self.run(&action, name, api.get(name)).await
    }

    async fn list_by_label(&self, label_selector: &str) -> QueryResult<Vec<K>> {
        let kind = kind_of::<K>();

        tracing::debug!(kind = %kind, selector = %label_selector, "list by label");

        let api: Api<K> = Api::all(self.client.clone());
        let params = label_params(label_selector);
        let action = format!("listing {} by label {:?}", kind, label_selector);
        let list = self.run(&action, label_selector, api.list(&params)).await?;
        Ok(list.items)
    }

    async fn list_by_field(&self, field_selector: &str) -> QueryResult<Vec<K>> {
        let kind = kind_of::<K>();

        tracing::debug!(kind = %kind, selector = %field_selector, "list by field");

        let api: Api<K> = Api::all(self.client.clone());
        let params = field_params(field_selector);
        let action = format!("listing {} by field {:?}", kind, field_selector);
        let list = self.run(&action, field_selector, api.list(&params)).await?;
        Ok(list.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Request, Response, StatusCode};
    use hyper::Body;
    use k8s_openapi::api::core::v1::{Namespace, Pod};
    use serde_json::json;
    use tower::BoxError;

    fn json_response(status: StatusCode, body: serde_json::Value) -> Response<Body> {
        Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn not_found_response(path: &str) -> Response<Body> {
        json_response(
            StatusCode::NOT_FOUND,
            json!({
                "kind": "Status",
                "apiVersion": "v1",
                "status": "Failure",
                "message": format!("{:?} not found", path),
                "reason": "NotFound",
                "code": 404
            }),
        )
    }

    /// A kube::Client over an in-process service speaking just enough of the
    /// API to exercise the reader end to end.
    fn canned_client() -> Client {
        let service = tower::service_fn(|req: Request<Body>| async move {
            let path = req.uri().path().to_string();
            let response = match path.as_str() {
                "/api/v1/namespaces/default/pods/test-pod" => json_response(
                    StatusCode::OK,
                    json!({
                        "apiVersion": "v1",
                        "kind": "Pod",
                        "metadata": {"name": "test-pod", "namespace": "default"},
                        "status": {"phase": "Running"}
                    }),
                ),
                "/api/v1/namespaces/default/pods" => json_response(
                    StatusCode::OK,
                    json!({
                        "apiVersion": "v1",
                        "kind": "PodList",
                        "metadata": {"resourceVersion": "1"},
                        "items": [
                            {
                                "metadata": {
                                    "name": "test-pod-1",
                                    "namespace": "default",
                                    "labels": {"app": "test-app"}
                                }
                            },
                            {
                                "metadata": {
                                    "name": "test-pod-2",
                                    "namespace": "default",
                                    "labels": {"app": "test-app"}
                                }
                            }
                        ]
                    }),
                ),
                "/api/v1/namespaces/test-namespace" => json_response(
                    StatusCode::OK,
                    json!({
                        "apiVersion": "v1",
                        "kind": "Namespace",
                        "metadata": {
                            "name": "test-namespace",
                            "labels": {"environment": "test"}
                        },
                        "status": {"phase": "Active"}
                    }),
                ),
                other => not_found_response(other),
            };
            Ok::<_, BoxError>(response)
        });
        Client::new(service, "default")
    }

    /// A client whose backing service always fails at the transport level.
    fn refused_client() -> Client {
        let service = tower::service_fn(|_req: Request<Body>| async move {
            Err::<Response<Body>, BoxError>("connection refused".into())
        });
        Client::new(service, "default")
    }

    /// A client whose backing service answers too slowly for any deadline
    /// used in these tests.
    fn slow_client() -> Client {
        let service = tower::service_fn(|_req: Request<Body>| async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, BoxError>(json_response(
                StatusCode::OK,
                json!({
                    "apiVersion": "v1",
                    "kind": "PodList",
                    "metadata": {"resourceVersion": "1"},
                    "items": []
                }),
            ))
        });
        Client::new(service, "default")
    }

    #[tokio::test]
    async fn test_get_by_name_returns_record() {
        let reader: TypedReader<Pod> = TypedReader::new(canned_client());

        let pod = reader.get_by_name("default", "test-pod").await.unwrap();

        assert_eq!(pod.metadata.name.as_deref(), Some("test-pod"));
        assert_eq!(pod.metadata.namespace.as_deref(), Some("default"));
        assert_eq!(pod.status.unwrap().phase.as_deref(), Some("Running"));
    }

    #[tokio::test]
    async fn test_get_by_name_not_found() {
        let reader: TypedReader<Pod> = TypedReader::new(canned_client());

        let err = reader
            .get_by_name("default", "nonexistent-pod")
            .await
            .unwrap_err();

        match err {
            QueryError::NotFound { kind, name } => {
                assert_eq!(kind, "Pod");
                assert_eq!(name, "nonexistent-pod");
            }
            e => panic!("Expected NotFound, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_get_by_name_empty_name_short_circuits() {
        // The backend refuses every request; getting InvalidArgument back
        // proves validation fired before any call went out.
        let reader: TypedReader<Pod> = TypedReader::new(refused_client());

        let err = reader.get_by_name("default", "").await.unwrap_err();

        match err {
            QueryError::InvalidArgument { kind, reason } => {
                assert_eq!(kind, "Pod");
                assert!(reason.contains("name"));
            }
            e => panic!("Expected InvalidArgument, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_list_by_label_unwraps_envelope() {
        let reader: TypedReader<Pod> = TypedReader::new(canned_client());

        let pods = reader.list_by_label("default", "app=test-app").await.unwrap();

        assert_eq!(pods.len(), 2);
        let names: Vec<_> = pods
            .iter()
            .map(|p| p.metadata.name.as_deref().unwrap())
            .collect();
        assert!(names.contains(&"test-pod-1"));
        assert!(names.contains(&"test-pod-2"));
    }

    #[tokio::test]
    async fn test_cluster_scoped_get() {
        let reader: TypedReader<Namespace> = TypedReader::new(canned_client());

        let ns = ClusterQuery::get_by_name(&reader, "test-namespace")
            .await
            .unwrap();

        assert_eq!(ns.metadata.name.as_deref(), Some("test-namespace"));
        assert_eq!(
            ns.metadata.labels.as_ref().unwrap().get("environment"),
            Some(&"test".to_string())
        );
        assert_eq!(ns.status.unwrap().phase.as_deref(), Some("Active"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_unavailable() {
        let reader: TypedReader<Pod> = TypedReader::new(refused_client());

        let err = reader.get_by_name("default", "test-pod").await.unwrap_err();

        match err {
            QueryError::Unavailable { action, .. } => {
                assert!(action.contains("test-pod"));
            }
            e => panic!("Expected Unavailable, got {:?}", e),
        }
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let reader: TypedReader<Pod> =
            TypedReader::with_deadline(slow_client(), Duration::from_millis(10));

        let err = reader.list_by_label("default", "").await.unwrap_err();

        match err {
            QueryError::DeadlineExceeded { action } => {
                assert!(action.contains("default"));
            }
            e => panic!("Expected DeadlineExceeded, got {:?}", e),
        }
    }
}
