//! Label sets identifying the pods of a cluster
//!
//! Every pod the operator creates for a cluster carries the canonical
//! [`cluster_labels`]; the member's current replication role is published
//! under [`ROLE_LABEL`].

use std::collections::BTreeMap;
use std::fmt;

/// Label holding the owning cluster's name
pub const CLUSTER_LABEL: &str = "cluster-membership";

/// Label holding the component name
pub const COMPONENT_LABEL: &str = "component";

/// Component value shared by every MySQL pod
pub const COMPONENT: &str = "mysql";

/// Label holding the member's replication role (`leader`, `follower`)
pub const ROLE_LABEL: &str = "role";

/// Canonical labels of every pod belonging to `cluster_name`
pub fn cluster_labels(cluster_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (CLUSTER_LABEL.to_string(), cluster_name.to_string()),
        (COMPONENT_LABEL.to_string(), COMPONENT.to_string()),
    ])
}

/// Conjunction of exact-match label requirements
///
/// Renders as the comma-separated `key=value` form accepted by
/// `ListParams::labels`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: BTreeMap<String, String>,
}

impl LabelSelector {
    pub fn from_set(labels: BTreeMap<String, String>) -> Self {
        Self {
            requirements: labels,
        }
    }

    /// Selector matching every pod of a cluster
    pub fn for_cluster(cluster_name: &str) -> Self {
        Self::from_set(cluster_labels(cluster_name))
    }

    /// Add an equality requirement; a later value for the same key wins
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.requirements.insert(key.into(), value.into());
        self
    }

    /// Restrict to members currently holding `role`
    pub fn with_role(self, role: &str) -> Self {
        self.with(ROLE_LABEL, role)
    }

    pub fn requirements(&self) -> &BTreeMap<String, String> {
        &self.requirements
    }

    /// Whether a pod with `labels` would be selected
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements
            .iter()
            .all(|(k, v)| labels.get(k).is_some_and(|actual| actual == v))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .requirements
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        f.write_str(&rendered.join(","))
    }
}
