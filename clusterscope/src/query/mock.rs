use crate::error::{require_nonempty, QueryError, QueryResult};
use crate::query::reader::kind_of;
use crate::query::traits::{ClusterQuery, NamespacedQuery};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec, DeploymentStatus};
use k8s_openapi::api::core::v1::{
    Namespace, NamespaceStatus, Pod, PodSpec, PodStatus, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::Resource;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

/// Mock query component for unit testing: one generic in-memory
/// implementation of both query contracts.
///
/// Selector strings are evaluated locally, supporting the operators real
/// selectors use for filtering (`=`, `==`, `!=`, comma-joined clauses); a
/// clause without an operator is rejected as `InvalidArgument`, mirroring
/// the API server.
pub struct MockReader<K> {
    objects: Arc<Mutex<HashMap<String, K>>>,
}

impl<K> Clone for MockReader<K> {
    fn clone(&self) -> Self {
        Self {
            objects: Arc::clone(&self.objects),
        }
    }
}

impl<K> Default for MockReader<K>
where
    K: Resource,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> MockReader<K>
where
    K: Resource,
{
    /// Create a mock with no records.
    pub fn new() -> Self {
        Self {
            objects: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Register a record under its (namespace, name) identity.
    pub fn add(&self, obj: K) {
        let meta = obj.meta();
        let key = make_key(
            meta.namespace.as_deref().unwrap_or(""),
            meta.name.as_deref().unwrap_or(""),
        );
        self.objects.lock().unwrap().insert(key, obj);
    }
}

fn make_key(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace, name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchOp {
    Equals,
    NotEquals,
}

struct Clause {
    key: String,
    op: MatchOp,
    value: String,
}

/// Parse a comma-joined selector string. An empty selector yields no
/// clauses, i.e. match-all.
fn parse_selector(kind: &str, selector: &str) -> QueryResult<Vec<Clause>> {
    if selector.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut clauses = Vec::new();
    for raw in selector.split(',') {
        let raw = raw.trim();
        let (key, op, value) = if let Some((key, value)) = raw.split_once("!=") {
            (key, MatchOp::NotEquals, value)
        } else if let Some((key, value)) = raw.split_once("==") {
            (key, MatchOp::Equals, value)
        } else if let Some((key, value)) = raw.split_once('=') {
            (key, MatchOp::Equals, value)
        } else {
            return Err(QueryError::InvalidArgument {
                kind: kind.to_string(),
                reason: format!("unparsable selector clause {:?}", raw),
            });
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(QueryError::InvalidArgument {
                kind: kind.to_string(),
                reason: format!("selector clause {:?} has an empty key", raw),
            });
        }

        clauses.push(Clause {
            key: key.to_string(),
            op,
            value: value.trim().to_string(),
        });
    }

    Ok(clauses)
}

fn matches_labels(labels: Option<&BTreeMap<String, String>>, clauses: &[Clause]) -> bool {
    static EMPTY: BTreeMap<String, String> = BTreeMap::new();
    let labels = labels.unwrap_or(&EMPTY);

    clauses.iter().all(|clause| {
        let actual = labels.get(&clause.key);
        match clause.op {
            MatchOp::Equals => actual == Some(&clause.value),
            MatchOp::NotEquals => actual != Some(&clause.value),
        }
    })
}

/// Resolve a dotted field path (`status.phase`, `spec.nodeName`) against the
/// JSON rendition of a record. An unset field compares as the empty string.
fn field_at(doc: &serde_json::Value, path: &str) -> String {
    let mut current = doc;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return String::new(),
        }
    }
    match current {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn matches_fields(doc: &serde_json::Value, clauses: &[Clause]) -> bool {
    clauses.iter().all(|clause| {
        let actual = field_at(doc, &clause.key);
        match clause.op {
            MatchOp::Equals => actual == clause.value,
            MatchOp::NotEquals => actual != clause.value,
        }
    })
}

impl<K> MockReader<K>
where
    K: Resource<DynamicType = ()> + Clone + Serialize,
{
    fn get_record(&self, namespace: &str, name: &str) -> QueryResult<K> {
        let objects = self.objects.lock().unwrap();
        objects
            .get(&make_key(namespace, name))
            .cloned()
            .ok_or_else(|| QueryError::NotFound {
                kind: kind_of::<K>(),
                name: name.to_string(),
            })
    }

    /// Snapshot the records in one namespace scope ("" for cluster-scoped).
    fn scoped(&self, namespace: &str) -> Vec<K> {
        let prefix = format!("{}/", namespace);
        let objects = self.objects.lock().unwrap();
        objects
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(_, obj)| obj.clone())
            .collect()
    }

    fn filter_by_label(&self, namespace: &str, selector: &str) -> QueryResult<Vec<K>> {
        let clauses = parse_selector(&kind_of::<K>(), selector)?;
        Ok(self
            .scoped(namespace)
            .into_iter()
            .filter(|obj| matches_labels(obj.meta().labels.as_ref(), &clauses))
            .collect())
    }

    fn filter_by_field(&self, namespace: &str, selector: &str) -> QueryResult<Vec<K>> {
        let kind = kind_of::<K>();
        let clauses = parse_selector(&kind, selector)?;
        let mut matching = Vec::new();
        for obj in self.scoped(namespace) {
            let doc = serde_json::to_value(&obj).map_err(|e| QueryError::Unknown {
                action: format!("rendering {} record for field matching", kind),
                source: Box::new(e),
            })?;
            if matches_fields(&doc, &clauses) {
                matching.push(obj);
            }
        }
        Ok(matching)
    }
}

#[async_trait]
impl<K> NamespacedQuery<K> for MockReader<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Serialize
        + Debug
        + Send
        + Sync,
{
    async fn get_by_name(&self, namespace: &str, name: &str) -> QueryResult<K> {
        let kind = kind_of::<K>();
        require_nonempty(&kind, "namespace", namespace)?;
        require_nonempty(&kind, "name", name)?;
        self.get_record(namespace, name)
    }

    async fn list_by_label(&self, namespace: &str, label_selector: &str) -> QueryResult<Vec<K>> {
        require_nonempty(&kind_of::<K>(), "namespace", namespace)?;
        self.filter_by_label(namespace, label_selector)
    }

    async fn list_by_field(&self, namespace: &str, field_selector: &str) -> QueryResult<Vec<K>> {
        require_nonempty(&kind_of::<K>(), "namespace", namespace)?;
        self.filter_by_field(namespace, field_selector)
    }
}

#[async_trait]
impl<K> ClusterQuery<K> for MockReader<K>
where
    K: Resource<Scope = ClusterResourceScope, DynamicType = ()>
        + Clone
        + Serialize
        + Debug
        + Send
        + Sync,
{
    async fn get_by_name(&self, name: &str) -> QueryResult<K> {
        require_nonempty(&kind_of::<K>(), "name", name)?;
        self.get_record("", name)
    }

    async fn list_by_label(&self, label_selector: &str) -> QueryResult<Vec<K>> {
        self.filter_by_label("", label_selector)
    }

    async fn list_by_field(&self, field_selector: &str) -> QueryResult<Vec<K>> {
        self.filter_by_field("", field_selector)
    }
}

fn object_meta(namespace: Option<&str>, name: &str, labels: &[(&str, &str)]) -> ObjectMeta {
    let labels: BTreeMap<String, String> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        labels: if labels.is_empty() { None } else { Some(labels) },
        ..Default::default()
    }
}

/// Helper to create a test pod with a phase and an optional node assignment.
pub fn test_pod(
    namespace: &str,
    name: &str,
    labels: &[(&str, &str)],
    phase: &str,
    node_name: Option<&str>,
) -> Pod {
    Pod {
        metadata: object_meta(Some(namespace), name, labels),
        spec: node_name.map(|node| PodSpec {
            node_name: Some(node.to_string()),
            ..Default::default()
        }),
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
    }
}

/// Helper to create a test service exposing one port.
pub fn test_service(namespace: &str, name: &str, labels: &[(&str, &str)], port: i32) -> Service {
    Service {
        metadata: object_meta(Some(namespace), name, labels),
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            ports: Some(vec![ServicePort {
                port,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Helper to create a test deployment with all replicas ready.
pub fn test_deployment(
    namespace: &str,
    name: &str,
    labels: &[(&str, &str)],
    replicas: i32,
) -> Deployment {
    Deployment {
        metadata: object_meta(Some(namespace), name, labels),
        spec: Some(DeploymentSpec {
            replicas: Some(replicas),
            ..Default::default()
        }),
        status: Some(DeploymentStatus {
            ready_replicas: Some(replicas),
            ..Default::default()
        }),
    }
}

/// Helper to create a test namespace.
pub fn test_namespace(name: &str, labels: &[(&str, &str)]) -> Namespace {
    Namespace {
        metadata: object_meta(None, name, labels),
        status: Some(NamespaceStatus {
            phase: Some("Active".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}
