//! Data sources observed by the framework
//!
//! [`ClusterSource`] reads cluster state and [`UnitLister`] lists the pods
//! running cluster members. Both are read-only; the kube-backed
//! implementations are what integration tests use, unit tests substitute
//! scripted fakes.

use std::future::Future;

use k8s_openapi::api::core::v1::Pod;
use kube::api::ListParams;
use kube::{Api, Client, ResourceExt};

use crate::crd::MysqlCluster;
use crate::error::SourceError;
use crate::labels::LabelSelector;
use crate::snapshot::{ClusterKey, ClusterSnapshot};

/// Reference to a running unit (pod) hosting one cluster member
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitRef {
    pub name: String,
    pub namespace: String,
}

/// Read access to the latest state of a cluster
pub trait ClusterSource {
    fn get(
        &self,
        key: &ClusterKey,
    ) -> impl Future<Output = Result<ClusterSnapshot, SourceError>>;
}

/// Lists running units matching a label selector
pub trait UnitLister {
    fn list(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> impl Future<Output = Result<Vec<UnitRef>, SourceError>>;
}

/// Reads MysqlCluster resources through the Kubernetes API
#[derive(Clone)]
pub struct KubeClusterSource {
    client: Client,
}

impl KubeClusterSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// Fetch the raw custom resource
    pub async fn get_cluster(&self, key: &ClusterKey) -> Result<MysqlCluster, SourceError> {
        let api: Api<MysqlCluster> = Api::namespaced(self.client.clone(), &key.namespace);
        api.get(&key.name).await.map_err(|e| match &e {
            kube::Error::Api(ae) if ae.code == 404 => SourceError::NotFound(key.to_string()),
            _ => SourceError::Kube(e),
        })
    }
}

impl ClusterSource for KubeClusterSource {
    async fn get(&self, key: &ClusterKey) -> Result<ClusterSnapshot, SourceError> {
        let cluster = self.get_cluster(key).await?;
        Ok(ClusterSnapshot::from(&cluster))
    }
}

/// Lists pods through the Kubernetes API, keeping only running ones
#[derive(Clone)]
pub struct KubePodLister {
    client: Client,
}

impl KubePodLister {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl UnitLister for KubePodLister {
    async fn list(
        &self,
        namespace: &str,
        selector: &LabelSelector,
    ) -> Result<Vec<UnitRef>, SourceError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let label_selector = selector.to_string();

        tracing::trace!(namespace = namespace, label_selector = %label_selector, "Listing pods");

        let pod_list = pods
            .list(&ListParams::default().labels(&label_selector))
            .await?;

        Ok(pod_list
            .items
            .into_iter()
            .filter(|p| {
                p.status
                    .as_ref()
                    .and_then(|s| s.phase.as_ref())
                    .is_some_and(|phase| phase == "Running")
            })
            .map(|p| UnitRef {
                name: p.name_any(),
                namespace: p.namespace().unwrap_or_else(|| namespace.to_string()),
            })
            .collect())
    }
}
