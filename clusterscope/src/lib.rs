pub mod auth;
pub mod config;
pub mod error;
pub mod query;

// Re-exports for convenience
pub use auth::{ClusterAuth, KubeconfigAuth};
pub use config::Config;
pub use error::{QueryError, QueryResult};
pub use query::{ClusterApi, ClusterQuery, MockReader, NamespacedQuery, TypedReader};
