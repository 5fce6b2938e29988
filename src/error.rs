//! Error types for the verification framework

use std::time::Duration;

use thiserror::Error;

/// Failure to read from a cluster-state data source or unit lister
///
/// The snapshot accessor absorbs these; they only reach callers that use a
/// [`ClusterSource`](crate::source::ClusterSource) directly.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl SourceError {
    pub fn is_not_found(&self) -> bool {
        match self {
            SourceError::NotFound(_) => true,
            SourceError::Kube(kube::Error::Api(ae)) => ae.code == 404,
            _ => false,
        }
    }
}

/// Failure of a wait operation
#[derive(Error, Debug)]
pub enum WaitError {
    #[error(
        "{description}: timed out after {elapsed:?} ({attempts} attempts), last observed: {last_observed}"
    )]
    Timeout {
        /// What was being waited for, naming the cluster and expected value
        description: String,
        elapsed: Duration,
        attempts: u32,
        /// Debug rendering of the last value returned by the predicate
        last_observed: String,
    },
}

impl WaitError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, WaitError::Timeout { .. })
    }
}

/// Failure to set up or run a port-forward tunnel
#[derive(Error, Debug)]
pub enum TunnelError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pod '{pod}' did not expose port {port} through the port-forward")]
    PortUnavailable { pod: String, port: u16 },

    #[error("Port-forward join error: {0}")]
    Join(String),
}

/// Failure to run SQL against a cluster member
#[derive(Error, Debug)]
pub enum SqlError {
    #[error("Failed setting up port-forwarding for pod {pod}: {source}")]
    Tunnel {
        pod: String,
        #[source]
        source: TunnelError,
    },

    #[error("Cluster {0} does not declare a MySQL user")]
    MissingCredentials(String),

    #[error("err: {source}, query: {query}")]
    Query {
        query: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Failure of the bundled MySQL driver
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("MySQL error: {0}")]
    Mysql(#[from] mysql_async::Error),

    #[error("Statement did not complete within {0:?}")]
    Timeout(Duration),
}

/// Invalid framework configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    InvalidVar {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to infer kube config: {0}")]
    Infer(#[from] kube::config::InferConfigError),

    #[error("Failed to create kube client: {0}")]
    Client(#[from] kube::Error),
}
