//! Point-in-time view of a MysqlCluster used for one poll evaluation
//!
//! A [`ClusterSnapshot`] is built fresh from the custom resource on every
//! poll tick and discarded after the matcher has looked at it. Status strings
//! published by the operator are parsed into typed enums here so the rest of
//! the framework never compares raw strings.

use std::fmt;
use std::str::FromStr;

use kube::ResourceExt;

use crate::crd::{ClusterCondition, MysqlCluster, NodeCondition, NodeStatus};

/// Cluster condition types published by the operator
pub mod cluster_condition_types {
    pub const INITIALIZING: &str = "Initializing";
    pub const READY: &str = "Ready";
    pub const ERROR: &str = "Error";
    pub const CLOSED: &str = "Closed";
    pub const SCALE_IN: &str = "ScaleIn";
    pub const SCALE_OUT: &str = "ScaleOut";
}

/// Node condition types published by the operator
pub mod node_condition_types {
    /// Replication on the member is lagging behind the leader
    pub const LAGGED: &str = "Lagged";
    pub const LEADER: &str = "Leader";
    pub const READ_ONLY: &str = "ReadOnly";
    /// Replication threads are running
    pub const REPLICATING: &str = "Replicating";
}

/// Identifies a cluster resource by name and namespace
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClusterKey {
    pub name: String,
    pub namespace: String,
}

impl ClusterKey {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Key of an existing resource; a missing namespace falls back to `default`
    pub fn from_cluster(cluster: &MysqlCluster) -> Self {
        Self::new(
            cluster.name_any(),
            cluster.namespace().unwrap_or_else(|| "default".to_string()),
        )
    }
}

impl fmt::Display for ClusterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Status of a condition
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

impl ConditionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        }
    }
}

impl FromStr for ConditionStatus {
    type Err = std::convert::Infallible;

    /// Anything other than `True`/`False` is treated as `Unknown`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "True" => ConditionStatus::True,
            "False" => ConditionStatus::False,
            _ => ConditionStatus::Unknown,
        })
    }
}

impl fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named status fact about a cluster or a node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Condition {
    pub type_: String,
    pub status: ConditionStatus,
}

impl Condition {
    pub fn new(type_: impl Into<String>, status: ConditionStatus) -> Self {
        Self {
            type_: type_.into(),
            status,
        }
    }

    /// True when both type and status match; every other field is ignored
    pub fn is(&self, type_: &str, status: ConditionStatus) -> bool {
        self.type_ == type_ && self.status == status
    }
}

impl From<&ClusterCondition> for Condition {
    fn from(c: &ClusterCondition) -> Self {
        Self::new(c.type_.clone(), c.status.parse().unwrap_or_default())
    }
}

impl From<&NodeCondition> for Condition {
    fn from(c: &NodeCondition) -> Self {
        Self::new(c.type_.clone(), c.status.parse().unwrap_or_default())
    }
}

/// Raft role string the sidecar publishes for the leader
pub const RAFT_LEADER: &str = "LEADER";

/// Raft role string the sidecar publishes for a follower
pub const RAFT_FOLLOWER: &str = "FOLLOWER";

/// Position of a member in the single-leader replication topology
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NodeRole {
    Leader,
    Follower,
    #[default]
    Unknown,
}

impl NodeRole {
    /// Parse the raft role reported by the sidecar
    ///
    /// Only the exact `LEADER` and `FOLLOWER` strings are known roles;
    /// `CANDIDATE`, `INVALID` and any other spelling map to `Unknown`.
    pub fn from_raft(role: &str) -> Self {
        match role {
            RAFT_LEADER => NodeRole::Leader,
            RAFT_FOLLOWER => NodeRole::Follower,
            _ => NodeRole::Unknown,
        }
    }

    /// Value of the `role` pod label for this role
    pub fn label_value(&self) -> &'static str {
        match self {
            NodeRole::Leader => "leader",
            NodeRole::Follower => "follower",
            NodeRole::Unknown => "unknown",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Leader => f.write_str("Leader"),
            NodeRole::Follower => f.write_str("Follower"),
            NodeRole::Unknown => f.write_str("Unknown"),
        }
    }
}

/// State of one member within a snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeState {
    pub name: String,
    pub role: NodeRole,
    pub conditions: Vec<Condition>,
}

impl NodeState {
    pub fn new(name: impl Into<String>, role: NodeRole) -> Self {
        Self {
            name: name.into(),
            role,
            conditions: Vec::new(),
        }
    }

    pub fn with_condition(mut self, type_: &str, status: ConditionStatus) -> Self {
        self.conditions.push(Condition::new(type_, status));
        self
    }
}

impl From<&NodeStatus> for NodeState {
    fn from(node: &NodeStatus) -> Self {
        Self {
            name: node.name.clone(),
            role: NodeRole::from_raft(&node.raft_status.role),
            conditions: node.conditions.iter().map(Condition::from).collect(),
        }
    }
}

/// Immutable view of a cluster resource taken by a single fetch
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterSnapshot {
    pub name: String,
    pub namespace: String,
    pub desired_replicas: i32,
    pub ready_replicas: i32,
    pub conditions: Vec<Condition>,
    pub nodes: Vec<NodeState>,
}

impl ClusterSnapshot {
    pub fn key(&self) -> ClusterKey {
        ClusterKey::new(self.name.clone(), self.namespace.clone())
    }

    /// Member with the given name, if the operator reports it
    pub fn node(&self, name: &str) -> Option<&NodeState> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

impl From<&MysqlCluster> for ClusterSnapshot {
    fn from(cluster: &MysqlCluster) -> Self {
        let key = ClusterKey::from_cluster(cluster);
        let status = cluster.status.as_ref();

        Self {
            name: key.name,
            namespace: key.namespace,
            desired_replicas: cluster.desired_replicas(),
            ready_replicas: status.map(|s| s.ready_nodes).unwrap_or(0),
            conditions: status
                .map(|s| s.conditions.iter().map(Condition::from).collect())
                .unwrap_or_default(),
            nodes: status
                .map(|s| s.nodes.iter().map(NodeState::from).collect())
                .unwrap_or_default(),
        }
    }
}
