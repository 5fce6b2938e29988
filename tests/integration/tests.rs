//! End-to-end checks against a live MySQL operator
//!
//! Every test creates its own namespace and a two-replica cluster through
//! [`Framework::new_cluster`], then drives the framework's waits against
//! whatever the operator publishes. SQL checks go through the bundled
//! `mysql_async` runner.

use std::time::Duration;

use futures::future::try_join_all;
use mysql_e2e_framework::crd::MysqlOpts;
use mysql_e2e_framework::{
    ClusterKey, ConditionStatus, Framework, FrameworkConfig, KubeClusterSource, KubePodLister,
    MYSQL_PORT, MysqlCluster, MysqlDsn, MysqlRunner, Observation, QueryRunner, Topology, Tunnel,
    cluster_condition_types, node_condition_types,
};

use crate::{SharedTestCluster, TestNamespace, ensure_crd_installed};

/// Pulling images and bootstrapping raft dominates this
const READY_TIMEOUT: Duration = Duration::from_secs(600);

const NODE_TIMEOUT: Duration = Duration::from_secs(120);

type KubeFramework = Framework<KubeClusterSource, KubePodLister>;

struct TestContext {
    framework: KubeFramework,
    namespace: TestNamespace,
}

async fn setup(prefix: &str) -> TestContext {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info,kube=warn,mysql_e2e_framework=debug")
        .with_test_writer()
        .try_init();

    let cluster = SharedTestCluster::get()
        .await
        .expect("Failed to get cluster");

    ensure_crd_installed(&cluster)
        .await
        .expect("Failed to install CRD");

    let config = FrameworkConfig::from_env().expect("Invalid MYSQL_E2E_* configuration");
    let framework = Framework::from_client(cluster.client(), config);
    let namespace = TestNamespace::create(cluster.client(), prefix)
        .await
        .expect("Failed to create namespace");

    TestContext {
        framework,
        namespace,
    }
}

/// Create the test cluster with credentials so SQL checks can log in
async fn create_cluster(ctx: &TestContext, name: &str) -> MysqlCluster {
    let mut cluster = ctx.framework.new_cluster(name, ctx.namespace.name());
    cluster.spec.mysql_opts = MysqlOpts {
        user: "qc_usr".to_string(),
        password: "Qing@123".to_string(),
        database: None,
    };

    ctx.namespace
        .create_cluster(&cluster)
        .await
        .expect("Failed to create MysqlCluster")
}

/// Wait for Ready, the replica count and a settled raft topology
async fn wait_until_healthy(ctx: &TestContext, key: &ClusterKey) -> String {
    ctx.framework
        .cluster_eventually_condition(
            key,
            cluster_condition_types::READY,
            ConditionStatus::True,
            READY_TIMEOUT,
        )
        .await
        .expect("cluster never became Ready");

    ctx.framework
        .cluster_eventually_replicas(key, 2, READY_TIMEOUT)
        .await
        .expect("replicas never became ready");

    match ctx.framework.cluster_eventually_raft_status(key).await {
        Ok(Topology::Valid { leader }) => leader,
        other => panic!("raft topology did not settle: {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires Kubernetes cluster"]
async fn test_missing_cluster_is_unavailable() {
    let ctx = setup("missing").await;
    let key = ctx.namespace.key("does-not-exist");

    assert_eq!(ctx.framework.refresh(&key).await, Observation::Unavailable);

    let err = ctx
        .framework
        .cluster_eventually_condition(
            &key,
            cluster_condition_types::READY,
            ConditionStatus::True,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert!(err.to_string().contains("does-not-exist"));

    ctx.namespace.cleanup().await.ok();
}

#[tokio::test]
#[ignore = "requires Kubernetes cluster with the MySQL operator"]
async fn test_cluster_converges() {
    let ctx = setup("converge").await;
    let cluster = create_cluster(&ctx, "sample").await;
    let key = ClusterKey::from_cluster(&cluster);

    let leader = wait_until_healthy(&ctx, &key).await;
    tracing::info!(leader = %leader, "Raft topology settled");

    ctx.framework
        .node_eventually_condition(
            &key,
            &leader,
            node_condition_types::LEADER,
            ConditionStatus::True,
            NODE_TIMEOUT,
        )
        .await
        .expect("leader never reported the Leader condition");

    let snapshot = ctx.framework.refresh(&key).await.snapshot_or_default();
    let followers = snapshot.nodes.iter().filter(|n| n.name != leader);
    try_join_all(followers.map(|n| {
        ctx.framework.node_eventually_condition(
            &key,
            &n.name,
            node_condition_types::REPLICATING,
            ConditionStatus::True,
            NODE_TIMEOUT,
        )
    }))
    .await
    .expect("a follower never started replicating");

    let leaders = ctx
        .framework
        .wait_service_available(&key, "leader")
        .await
        .expect("no leader pod became available");
    assert_eq!(leaders.len(), 1);

    assert!(ctx.framework.is_unit_present(&snapshot, "follower").await);

    ctx.namespace.cleanup().await.ok();
}

#[tokio::test]
#[ignore = "requires Kubernetes cluster with the MySQL operator"]
async fn test_sql_runs_on_leader() {
    let ctx = setup("tunnel").await;
    let cluster = create_cluster(&ctx, "sample").await;
    let key = ClusterKey::from_cluster(&cluster);
    wait_until_healthy(&ctx, &key).await;

    let leaders = ctx
        .framework
        .wait_service_available(&key, "leader")
        .await
        .expect("no leader pod became available");
    let pod = &leaders[0].name;

    let tunnel = Tunnel::open(ctx.framework.client(), &key.namespace, pod, MYSQL_PORT)
        .await
        .expect("Failed to open tunnel");
    let dsn = MysqlDsn::for_cluster(&cluster, tunnel.local_port()).expect("cluster has no user");
    let rows = MysqlRunner
        .query(&dsn, "SELECT 1")
        .await
        .expect("SELECT 1 failed");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get::<i64, _>(0), Some(1));
    tunnel.close().await;

    ctx.framework
        .exec_sql_on_node(
            &cluster,
            pod,
            "CREATE TABLE IF NOT EXISTS e2e_checks (id INT PRIMARY KEY); \
             REPLACE INTO e2e_checks VALUES (1), (2)",
        )
        .await
        .expect("multi-statement write failed");

    let rows = ctx
        .framework
        .exec_sql_on_node(&cluster, pod, "SELECT COUNT(*) FROM e2e_checks")
        .await
        .expect("count query failed");
    assert_eq!(rows[0].get::<i64, _>(0), Some(2));

    ctx.namespace.cleanup().await.ok();
}
