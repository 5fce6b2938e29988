//! Structural matchers over fetched cluster state
//!
//! Each matcher accepts an [`Observation`] and rejects `Unavailable`, so a
//! failed fetch counts as "not yet" rather than as a match. Conditions are
//! compared on type and status only.

use crate::accessor::Observation;
use crate::poll::Matcher;
use crate::snapshot::{Condition, ConditionStatus};
use crate::topology::is_valid_topology;

/// First condition accepted by `pred`
pub fn find_first<P>(conditions: &[Condition], pred: P) -> Option<&Condition>
where
    P: Fn(&Condition) -> bool,
{
    conditions.iter().find(|c| pred(c))
}

/// Whether any condition has the given type and status
pub fn contains_condition(conditions: &[Condition], type_: &str, status: ConditionStatus) -> bool {
    find_first(conditions, |c| c.is(type_, status)).is_some()
}

/// Matcher that checks if the cluster has a condition of `type_` with `status`
pub fn has_cluster_condition(
    type_: &str,
    status: ConditionStatus,
) -> impl Matcher<Observation> + use<> {
    let cond_type = type_.to_string();
    move |obs: &Observation| {
        obs.snapshot()
            .map(|s| contains_condition(&s.conditions, &cond_type, status))
            .unwrap_or(false)
    }
}

/// Matcher that checks a condition on the node named `node_name`
///
/// A node missing from the snapshot does not match.
pub fn has_node_condition(
    node_name: &str,
    type_: &str,
    status: ConditionStatus,
) -> impl Matcher<Observation> + use<> {
    let node_name = node_name.to_string();
    let cond_type = type_.to_string();
    move |obs: &Observation| {
        obs.snapshot()
            .and_then(|s| s.node(&node_name))
            .map(|n| contains_condition(&n.conditions, &cond_type, status))
            .unwrap_or(false)
    }
}

/// Matcher that checks if exactly `expected` replicas are ready
pub fn has_replica_count(expected: i32) -> impl Matcher<Observation> {
    move |obs: &Observation| {
        obs.snapshot()
            .map(|s| s.ready_replicas == expected)
            .unwrap_or(false)
    }
}

/// Matcher that checks the single-leader role invariant
pub fn has_valid_topology() -> impl Matcher<Observation> {
    |obs: &Observation| {
        obs.snapshot()
            .map(|s| is_valid_topology(&s.nodes))
            .unwrap_or(false)
    }
}
