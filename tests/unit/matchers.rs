//! Unit tests for condition and replica matchers

use mysql_e2e_framework::cluster_condition_types::{ERROR, READY};
use mysql_e2e_framework::node_condition_types::{LAGGED, REPLICATING};
use mysql_e2e_framework::{
    Condition, ConditionStatus, Matcher, NodeRole, NodeState, Observation, contains_condition,
    find_first, has_cluster_condition, has_node_condition, has_replica_count, has_valid_topology,
};

use crate::common::{SnapshotBuilder, healthy_nodes};

fn observed(builder: SnapshotBuilder) -> Observation {
    Observation::Available(builder.build())
}

mod condition_search_tests {
    use super::*;

    #[test]
    fn test_find_first_returns_earliest_match() {
        let conditions = vec![
            Condition::new(READY, ConditionStatus::False),
            Condition::new(ERROR, ConditionStatus::True),
            Condition::new(READY, ConditionStatus::True),
        ];

        let found = find_first(&conditions, |c| c.type_ == READY).unwrap();
        assert_eq!(found.status, ConditionStatus::False);
    }

    #[test]
    fn test_contains_condition_compares_type_and_status() {
        let conditions = vec![Condition::new(READY, ConditionStatus::True)];
        assert!(contains_condition(&conditions, READY, ConditionStatus::True));
        assert!(!contains_condition(&conditions, READY, ConditionStatus::False));
        assert!(!contains_condition(&conditions, ERROR, ConditionStatus::True));
        assert!(!contains_condition(&[], READY, ConditionStatus::True));
    }

    #[test]
    fn test_duplicate_types_are_all_searched() {
        let conditions = vec![
            Condition::new(READY, ConditionStatus::False),
            Condition::new(READY, ConditionStatus::True),
        ];
        assert!(contains_condition(&conditions, READY, ConditionStatus::True));
        assert!(contains_condition(&conditions, READY, ConditionStatus::False));
    }
}

mod cluster_condition_tests {
    use super::*;

    #[test]
    fn test_ready_true() {
        let obs = observed(SnapshotBuilder::new("sample").condition(READY, ConditionStatus::True));
        assert!(has_cluster_condition(READY, ConditionStatus::True).matches(&obs));
        assert!(!has_cluster_condition(READY, ConditionStatus::False).matches(&obs));
    }

    #[test]
    fn test_unavailable_never_matches() {
        assert!(!has_cluster_condition(READY, ConditionStatus::True).matches(&Observation::Unavailable));
        assert!(!has_replica_count(0).matches(&Observation::Unavailable));
        assert!(!has_valid_topology().matches(&Observation::Unavailable));
    }
}

mod node_condition_tests {
    use super::*;

    fn cluster_with_lagging_b() -> Observation {
        observed(
            SnapshotBuilder::new("sample")
                .node(
                    NodeState::new("a", NodeRole::Leader)
                        .with_condition(REPLICATING, ConditionStatus::False),
                )
                .node(
                    NodeState::new("b", NodeRole::Follower)
                        .with_condition(LAGGED, ConditionStatus::True)
                        .with_condition(REPLICATING, ConditionStatus::True),
                ),
        )
    }

    #[test]
    fn test_matches_condition_on_named_node() {
        let obs = cluster_with_lagging_b();
        assert!(has_node_condition("b", LAGGED, ConditionStatus::True).matches(&obs));
        assert!(has_node_condition("b", REPLICATING, ConditionStatus::True).matches(&obs));
    }

    #[test]
    fn test_condition_on_other_node_does_not_match() {
        let obs = cluster_with_lagging_b();
        assert!(!has_node_condition("a", LAGGED, ConditionStatus::True).matches(&obs));
        assert!(!has_node_condition("a", REPLICATING, ConditionStatus::True).matches(&obs));
    }

    #[test]
    fn test_missing_node_is_not_an_error() {
        let obs = cluster_with_lagging_b();
        assert!(!has_node_condition("zzz", LAGGED, ConditionStatus::True).matches(&obs));
    }
}

mod replica_and_topology_tests {
    use super::*;

    #[test]
    fn test_replica_count_is_exact() {
        let obs = observed(SnapshotBuilder::new("sample").ready_replicas(2));
        assert!(has_replica_count(2).matches(&obs));
        assert!(!has_replica_count(3).matches(&obs));
        assert!(!has_replica_count(1).matches(&obs));
    }

    #[test]
    fn test_valid_topology_matcher() {
        let obs = observed(SnapshotBuilder::new("sample").nodes(healthy_nodes()));
        assert!(has_valid_topology().matches(&obs));

        let no_nodes = observed(SnapshotBuilder::new("sample"));
        assert!(!has_valid_topology().matches(&no_nodes));
    }

    #[test]
    fn test_combined_matchers() {
        let obs = observed(
            SnapshotBuilder::new("sample")
                .ready_replicas(3)
                .nodes(healthy_nodes())
                .condition(READY, ConditionStatus::True),
        );
        let converged = has_replica_count(3)
            .and(has_valid_topology())
            .and(has_cluster_condition(READY, ConditionStatus::True));
        assert!(converged.matches(&obs));
        assert!(!has_cluster_condition(ERROR, ConditionStatus::True).matches(&obs));
        assert!(has_cluster_condition(ERROR, ConditionStatus::True).not().matches(&obs));
    }
}
