//! Single-leader role invariant
//!
//! A cluster topology is valid when exactly one member reports `Leader`,
//! every other member reports `Follower`, and no member reports anything
//! else. An unknown role invalidates the topology immediately.

use std::fmt;

use crate::snapshot::{NodeRole, NodeState};

/// Classification of a node list against the single-leader invariant
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Topology {
    /// Exactly one leader, everything else following
    Valid { leader: String },
    /// No members reported at all
    Empty,
    /// A member reported a role other than leader or follower
    UnknownRole { node: String },
    /// Every member is a follower; usually an election is in progress
    NoLeader,
    MultipleLeaders { leaders: Vec<String> },
}

impl Topology {
    pub fn is_valid(&self) -> bool {
        matches!(self, Topology::Valid { .. })
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::Valid { leader } => write!(f, "valid (leader: {})", leader),
            Topology::Empty => write!(f, "no nodes reported"),
            Topology::UnknownRole { node } => write!(f, "node '{}' has an unknown role", node),
            Topology::NoLeader => write!(f, "no leader"),
            Topology::MultipleLeaders { leaders } => {
                write!(f, "multiple leaders: {}", leaders.join(", "))
            }
        }
    }
}

/// Classify the topology formed by `nodes`
pub fn classify_topology(nodes: &[NodeState]) -> Topology {
    if nodes.is_empty() {
        return Topology::Empty;
    }

    let mut leaders: Vec<&str> = Vec::new();
    let mut followers = 0usize;
    for node in nodes {
        match node.role {
            NodeRole::Leader => leaders.push(&node.name),
            NodeRole::Follower => followers += 1,
            NodeRole::Unknown => {
                return Topology::UnknownRole {
                    node: node.name.clone(),
                };
            }
        }
    }

    match leaders.as_slice() {
        [] => Topology::NoLeader,
        [leader] if followers == nodes.len() - 1 => Topology::Valid {
            leader: (*leader).to_string(),
        },
        _ => Topology::MultipleLeaders {
            leaders: leaders.iter().map(|l| (*l).to_string()).collect(),
        },
    }
}

/// Check the single-leader invariant
///
/// Empty node lists are never valid. A single leader with no followers is.
pub fn is_valid_topology(nodes: &[NodeState]) -> bool {
    classify_topology(nodes).is_valid()
}
