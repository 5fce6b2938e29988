//! Snapshot accessor with a swallow-and-retry error policy
//!
//! Fetch errors are expected while the operator churns the cluster, so they
//! surface as [`Observation::Unavailable`] instead of an error. The poller
//! then simply sees no progress on that tick and keeps going until its
//! deadline.

use crate::snapshot::{ClusterKey, ClusterSnapshot};
use crate::source::ClusterSource;

/// Result of a single fetch
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Observation {
    Available(ClusterSnapshot),
    /// The data source could not be read this tick
    Unavailable,
}

impl Observation {
    pub fn is_available(&self) -> bool {
        matches!(self, Observation::Available(_))
    }

    pub fn snapshot(&self) -> Option<&ClusterSnapshot> {
        match self {
            Observation::Available(s) => Some(s),
            Observation::Unavailable => None,
        }
    }

    pub fn into_snapshot(self) -> Option<ClusterSnapshot> {
        match self {
            Observation::Available(s) => Some(s),
            Observation::Unavailable => None,
        }
    }

    /// The snapshot, or an empty one when nothing could be fetched
    pub fn snapshot_or_default(self) -> ClusterSnapshot {
        self.into_snapshot().unwrap_or_default()
    }
}

/// Fetches cluster snapshots, never failing
pub struct SnapshotAccessor<S> {
    source: S,
}

impl<S: ClusterSource> SnapshotAccessor<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch the current snapshot of `key`
    pub async fn fetch(&self, key: &ClusterKey) -> Observation {
        match self.source.get(key).await {
            Ok(snapshot) => Observation::Available(snapshot),
            Err(e) => {
                tracing::debug!(cluster = %key, error = %e, "Snapshot unavailable, will retry");
                Observation::Unavailable
            }
        }
    }
}
