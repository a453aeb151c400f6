use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Kubeconfig context to authenticate against; `None` uses the default
    /// resolution chain (in-cluster, then `KUBECONFIG`, then `~/.kube/config`).
    pub context: Option<String>,
    /// Deadline applied to every query issued through a facade built with
    /// [`crate::ClusterApi::connect_with`]; `None` leaves calls unbounded.
    pub deadline: Option<Duration>,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let deadline = match env::var("CLUSTERSCOPE_DEADLINE_SECS") {
            Ok(raw) => Some(Duration::from_secs(raw.parse()?)),
            Err(_) => None,
        };

        Ok(Self {
            context: env::var("CLUSTERSCOPE_CONTEXT").ok(),
            deadline,
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}
