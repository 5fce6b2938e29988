//! Convergence verification for operator-managed MySQL clusters
//!
//! The framework observes a `MysqlCluster` resource until it converges:
//! a condition is reported, enough replicas are ready, the raft roles form a
//! single-leader topology, or a pod holding a given role shows up. Waits
//! poll at a fixed interval and fail with a descriptive timeout.
//!
//! ```rust,ignore
//! let framework = Framework::connect(FrameworkConfig::from_env()?).await?;
//! let key = ClusterKey::new("sample", "default");
//!
//! framework
//!     .cluster_eventually_condition(&key, READY, ConditionStatus::True, TIMEOUT)
//!     .await?;
//! let topology = framework.cluster_eventually_raft_status(&key).await?;
//! framework.wait_service_available(&key, "leader").await?;
//! ```

pub mod accessor;
pub mod config;
pub mod crd;
pub mod error;
pub mod framework;
pub mod labels;
pub mod matchers;
pub mod poll;
pub mod snapshot;
pub mod source;
pub mod sql;
pub mod topology;
pub mod tunnel;

pub use accessor::{Observation, SnapshotAccessor};
pub use config::{FrameworkConfig, MYSQL_PORT};
pub use crd::{MysqlCluster, MysqlClusterSpec, MysqlClusterStatus};
pub use error::{ConfigError, DriverError, SourceError, SqlError, TunnelError, WaitError};
pub use framework::Framework;
pub use labels::{LabelSelector, cluster_labels};
pub use matchers::{
    contains_condition, find_first, has_cluster_condition, has_node_condition, has_replica_count,
    has_valid_topology,
};
pub use poll::{Matcher, PollProfile, wait_until};
pub use snapshot::{
    ClusterKey, ClusterSnapshot, Condition, ConditionStatus, NodeRole, NodeState,
    cluster_condition_types, node_condition_types,
};
pub use source::{ClusterSource, KubeClusterSource, KubePodLister, UnitLister, UnitRef};
pub use sql::{
    MysqlDsn, MysqlRunner, QueryRunner, Row, exec_sql_on_node, exec_sql_on_node_with,
};
pub use topology::{Topology, classify_topology, is_valid_topology};
pub use tunnel::Tunnel;
