//! Convergence checks against a MysqlCluster
//!
//! [`Framework`] ties the snapshot accessor, the unit lister and the poller
//! together into the waits e2e tests use: condition checks, replica counts,
//! raft topology, and pod availability for a role. Every wait fails with a
//! [`WaitError::Timeout`] naming the cluster and the expected value.

use std::time::Duration;

use kube::core::ObjectMeta;
use kube::{Client, Config};

use crate::accessor::{Observation, SnapshotAccessor};
use crate::config::FrameworkConfig;
use crate::crd::{MysqlCluster, MysqlClusterSpec, PodPolicy};
use crate::error::{ConfigError, SqlError, WaitError};
use crate::labels::LabelSelector;
use crate::matchers::{has_cluster_condition, has_node_condition, has_replica_count};
use crate::poll::{PollProfile, wait_until};
use crate::snapshot::{ClusterKey, ClusterSnapshot, ConditionStatus};
use crate::source::{ClusterSource, KubeClusterSource, KubePodLister, UnitLister, UnitRef};
use crate::sql::{QueryRunner, Row, exec_sql_on_node, exec_sql_on_node_with};
use crate::topology::{Topology, classify_topology};

/// Replica count of clusters built by [`Framework::new_cluster`]
pub const TEST_CLUSTER_REPLICAS: i32 = 2;

/// Verification framework over a cluster data source and a unit lister
pub struct Framework<S, L> {
    accessor: SnapshotAccessor<S>,
    lister: L,
    config: FrameworkConfig,
}

impl Framework<KubeClusterSource, KubePodLister> {
    /// Connect using the inferred kubeconfig (~/.kube/config or KUBECONFIG)
    pub async fn connect(config: FrameworkConfig) -> Result<Self, ConfigError> {
        let kube_config = Config::infer().await?;
        let client = Client::try_from(kube_config)?;
        Ok(Self::from_client(client, config))
    }

    pub fn from_client(client: Client, config: FrameworkConfig) -> Self {
        Self::new(
            KubeClusterSource::new(client.clone()),
            KubePodLister::new(client),
            config,
        )
    }

    pub fn client(&self) -> Client {
        self.accessor.source().client()
    }

    /// Run `query` on member `pod` of `cluster` through a temporary tunnel
    pub async fn exec_sql_on_node(
        &self,
        cluster: &MysqlCluster,
        pod: &str,
        query: &str,
    ) -> Result<Vec<Row>, SqlError> {
        exec_sql_on_node(self.client(), cluster, pod, query).await
    }

    /// Same as [`Self::exec_sql_on_node`] with another driver
    pub async fn exec_sql_on_node_with<R: QueryRunner>(
        &self,
        cluster: &MysqlCluster,
        pod: &str,
        query: &str,
        runner: &R,
    ) -> Result<R::Rows, SqlError> {
        exec_sql_on_node_with(self.client(), cluster, pod, query, runner).await
    }
}

impl<S: ClusterSource, L: UnitLister> Framework<S, L> {
    pub fn new(source: S, lister: L, config: FrameworkConfig) -> Self {
        Self {
            accessor: SnapshotAccessor::new(source),
            lister,
            config,
        }
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    pub fn accessor(&self) -> &SnapshotAccessor<S> {
        &self.accessor
    }

    pub fn lister(&self) -> &L {
        &self.lister
    }

    /// Two-replica cluster manifest using the configured sidecar image
    pub fn new_cluster(&self, name: &str, namespace: &str) -> MysqlCluster {
        MysqlCluster {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            spec: MysqlClusterSpec {
                replicas: Some(TEST_CLUSTER_REPLICAS),
                pod_policy: PodPolicy {
                    sidecar_image: self.config.sidecar_image.clone(),
                },
                ..Default::default()
            },
            status: None,
        }
    }

    /// One-shot read of the cluster's current state
    pub async fn refresh(&self, key: &ClusterKey) -> Observation {
        self.accessor.fetch(key).await
    }

    /// Wait until the cluster reports condition `type_` with `status`
    pub async fn cluster_eventually_condition(
        &self,
        key: &ClusterKey,
        type_: &str,
        status: ConditionStatus,
        timeout: Duration,
    ) -> Result<ClusterSnapshot, WaitError> {
        let accessor = &self.accessor;
        wait_until(
            self.config.standard.with_timeout(timeout),
            format!(
                "Testing cluster '{}' for condition {} to be {}",
                key, type_, status
            ),
            move || accessor.fetch(key),
            has_cluster_condition(type_, status),
        )
        .await
        .map(Observation::snapshot_or_default)
    }

    /// Wait until member `node_name` reports condition `type_` with `status`
    pub async fn node_eventually_condition(
        &self,
        key: &ClusterKey,
        node_name: &str,
        type_: &str,
        status: ConditionStatus,
        timeout: Duration,
    ) -> Result<ClusterSnapshot, WaitError> {
        let accessor = &self.accessor;
        wait_until(
            self.config.standard.with_timeout(timeout),
            format!(
                "Testing node '{}' of the cluster '{}' for condition {} to be {}",
                node_name, key, type_, status
            ),
            move || accessor.fetch(key),
            has_node_condition(node_name, type_, status),
        )
        .await
        .map(Observation::snapshot_or_default)
    }

    /// Wait until exactly `expected` replicas are ready
    pub async fn cluster_eventually_replicas(
        &self,
        key: &ClusterKey,
        expected: i32,
        timeout: Duration,
    ) -> Result<ClusterSnapshot, WaitError> {
        let accessor = &self.accessor;
        wait_until(
            self.config.standard.with_timeout(timeout),
            format!(
                "Not ready replicas of cluster '{}': expected {}",
                key, expected
            ),
            move || accessor.fetch(key),
            has_replica_count(expected),
        )
        .await
        .map(Observation::snapshot_or_default)
    }

    /// Wait until the raft roles form a valid single-leader topology
    ///
    /// Returns the valid topology, which names the leader. On timeout the
    /// error carries the last classification (no leader, several leaders,
    /// unknown role) rather than the raw node list.
    pub async fn cluster_eventually_raft_status(
        &self,
        key: &ClusterKey,
    ) -> Result<Topology, WaitError> {
        let accessor = &self.accessor;
        let topology = wait_until(
            self.config.standard,
            format!("Not ready raft topology of cluster '{}'", key),
            move || async move {
                accessor
                    .fetch(key)
                    .await
                    .snapshot()
                    .map(|s| classify_topology(&s.nodes))
            },
            |t: &Option<Topology>| t.as_ref().is_some_and(Topology::is_valid),
        )
        .await?;

        Ok(topology.unwrap_or(Topology::Empty))
    }

    /// Whether any running pod of the snapshot's cluster carries `role`
    ///
    /// List failures count as "no pod".
    pub async fn is_unit_present(&self, snapshot: &ClusterSnapshot, role: &str) -> bool {
        !self.units_with_role(snapshot, role).await.is_empty()
    }

    /// Wait for a pod carrying `role` to appear, using `profile`
    pub async fn wait_for_role(
        &self,
        key: &ClusterKey,
        role: &str,
        profile: PollProfile,
    ) -> Result<Vec<UnitRef>, WaitError> {
        wait_until(
            profile,
            format!(
                "Service is unavailable: no pod with role '{}' in cluster '{}'",
                role, key
            ),
            move || async move {
                match self.accessor.fetch(key).await.into_snapshot() {
                    Some(snapshot) => self.units_with_role(&snapshot, role).await,
                    None => Vec::new(),
                }
            },
            |units: &Vec<UnitRef>| !units.is_empty(),
        )
        .await
    }

    /// Wait for a pod carrying `role` using the failover profile
    pub async fn wait_service_available(
        &self,
        key: &ClusterKey,
        role: &str,
    ) -> Result<Vec<UnitRef>, WaitError> {
        self.wait_for_role(key, role, self.config.failover).await
    }

    async fn units_with_role(&self, snapshot: &ClusterSnapshot, role: &str) -> Vec<UnitRef> {
        let selector = LabelSelector::for_cluster(&snapshot.name).with_role(role);
        match self.lister.list(&snapshot.namespace, &selector).await {
            Ok(units) => units,
            Err(e) => {
                tracing::debug!(
                    cluster = %snapshot.key(),
                    selector = %selector,
                    error = %e,
                    "Failed to list pods"
                );
                Vec::new()
            }
        }
    }
}
