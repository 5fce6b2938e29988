use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// MysqlCluster is the Schema for the mysqlclusters API
///
/// Only the fields the verification framework reads are modelled; unknown
/// fields published by the operator are ignored on deserialization.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    group = "mysql.radondb.com",
    version = "v1alpha1",
    kind = "MysqlCluster",
    plural = "mysqlclusters",
    shortname = "mysql",
    namespaced,
    status = "MysqlClusterStatus",
    printcolumn = r#"{"name":"Replicas", "type":"integer", "jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Ready", "type":"integer", "jsonPath":".status.readyNodes"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MysqlClusterSpec {
    /// Desired number of MySQL members
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Database user and schema declared for the cluster
    #[serde(default)]
    pub mysql_opts: MysqlOpts,

    /// Pod-level settings
    #[serde(default)]
    pub pod_policy: PodPolicy,
}

/// Replica count the operator assumes when the spec leaves it unset
pub const DEFAULT_REPLICAS: i32 = 3;

/// Database the operator creates when the spec leaves it unset
pub const DEFAULT_DATABASE: &str = "radondb";

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MysqlOpts {
    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodPolicy {
    /// Image of the raft sidecar running next to mysqld
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidecar_image: Option<String>,
}

/// Status of the MysqlCluster as reported by the operator
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MysqlClusterStatus {
    /// Number of members passing readiness
    #[serde(default)]
    pub ready_nodes: i32,

    /// Cluster-level conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ClusterCondition>,

    /// Per-member status
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeStatus>,
}

/// Kubernetes-style condition attached to the cluster
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCondition {
    #[serde(rename = "type")]
    pub type_: String,

    /// True, False or Unknown
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Status of a single member
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default)]
    pub raft_status: RaftStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<NodeCondition>,
}

/// Raft view reported by the member's sidecar
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RaftStatus {
    /// LEADER, FOLLOWER, CANDIDATE, ...
    #[serde(default)]
    pub role: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leader: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<String>,
}

/// Condition attached to a single member
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeCondition {
    #[serde(rename = "type")]
    pub type_: String,

    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl MysqlCluster {
    /// Replica count from the spec, falling back to the operator default
    pub fn desired_replicas(&self) -> i32 {
        self.spec.replicas.unwrap_or(DEFAULT_REPLICAS)
    }

    /// Database name from the spec, falling back to the operator default
    pub fn database(&self) -> &str {
        self.spec
            .mysql_opts
            .database
            .as_deref()
            .unwrap_or(DEFAULT_DATABASE)
    }
}
