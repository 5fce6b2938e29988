//! SQL execution against a single cluster member
//!
//! [`exec_sql_on_node`] owns the tunnel, builds the connection parameters
//! from the credentials the cluster declares and runs the query with
//! `mysql_async`. Other drivers plug in through [`QueryRunner`] and
//! [`exec_sql_on_node_with`].

use std::fmt;
use std::future::Future;
use std::time::Duration;

use kube::Client;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, OptsBuilder};

use crate::config::MYSQL_PORT;
use crate::crd::MysqlCluster;
use crate::error::{DriverError, SqlError};
use crate::snapshot::ClusterKey;
use crate::tunnel::Tunnel;

pub use mysql_async::Row;

/// Statement timeout applied to every connection
pub const STATEMENT_TIMEOUT: Duration = Duration::from_secs(20);

/// Connection parameters for a tunnelled MySQL member
#[derive(Clone, PartialEq, Eq)]
pub struct MysqlDsn {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub timeout: Duration,
    pub multi_statements: bool,
}

impl MysqlDsn {
    /// DSN for `cluster`'s declared user, reached on `localhost:local_port`
    pub fn for_cluster(cluster: &MysqlCluster, local_port: u16) -> Result<Self, SqlError> {
        let opts = &cluster.spec.mysql_opts;
        if opts.user.is_empty() {
            return Err(SqlError::MissingCredentials(
                ClusterKey::from_cluster(cluster).to_string(),
            ));
        }

        Ok(Self {
            user: opts.user.clone(),
            password: opts.password.clone(),
            host: "localhost".to_string(),
            port: local_port,
            database: cluster.database().to_string(),
            timeout: STATEMENT_TIMEOUT,
            multi_statements: true,
        })
    }
}

impl fmt::Display for MysqlDsn {
    /// `user:password@tcp(host:port)/database?timeout=20s&multiStatements=true`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}@tcp({}:{})/{}?timeout={}s&multiStatements={}",
            self.user,
            self.password,
            self.host,
            self.port,
            self.database,
            self.timeout.as_secs(),
            self.multi_statements
        )
    }
}

impl fmt::Debug for MysqlDsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MysqlDsn")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("timeout", &self.timeout)
            .field("multi_statements", &self.multi_statements)
            .finish()
    }
}

impl From<&MysqlDsn> for Opts {
    fn from(dsn: &MysqlDsn) -> Self {
        OptsBuilder::default()
            .ip_or_hostname(dsn.host.clone())
            .tcp_port(dsn.port)
            .user(Some(dsn.user.clone()))
            .pass(Some(dsn.password.clone()))
            .db_name(Some(dsn.database.clone()))
            .prefer_socket(false)
            .into()
    }
}

/// Driver that executes a query over an established connection string
pub trait QueryRunner {
    type Rows;
    type Error: std::error::Error + Send + Sync + 'static;

    fn query(
        &self,
        dsn: &MysqlDsn,
        query: &str,
    ) -> impl Future<Output = Result<Self::Rows, Self::Error>>;
}

/// Runs queries with `mysql_async`, one connection per query
///
/// Connecting, running the statements and disconnecting must all finish
/// within the DSN timeout. Multiple statements per query are accepted.
#[derive(Clone, Copy, Debug, Default)]
pub struct MysqlRunner;

impl QueryRunner for MysqlRunner {
    type Rows = Vec<Row>;
    type Error = DriverError;

    async fn query(&self, dsn: &MysqlDsn, query: &str) -> Result<Vec<Row>, DriverError> {
        let opts = Opts::from(dsn);
        let run = async move {
            let mut conn = Conn::new(opts).await?;
            let rows: Vec<Row> = conn.query(query).await?;
            conn.disconnect().await?;
            Ok::<_, mysql_async::Error>(rows)
        };

        match tokio::time::timeout(dsn.timeout, run).await {
            Ok(rows) => Ok(rows?),
            Err(_) => Err(DriverError::Timeout(dsn.timeout)),
        }
    }
}

/// Run `query` on member `pod` of `cluster` with [`MysqlRunner`]
pub async fn exec_sql_on_node(
    client: Client,
    cluster: &MysqlCluster,
    pod: &str,
    query: &str,
) -> Result<Vec<Row>, SqlError> {
    exec_sql_on_node_with(client, cluster, pod, query, &MysqlRunner).await
}

/// Run `query` on member `pod` of `cluster` through a fresh tunnel
///
/// The tunnel lives exactly as long as this call, whether the query
/// succeeds or not. Failures are not retried.
pub async fn exec_sql_on_node_with<R: QueryRunner>(
    client: Client,
    cluster: &MysqlCluster,
    pod: &str,
    query: &str,
    runner: &R,
) -> Result<R::Rows, SqlError> {
    let key = ClusterKey::from_cluster(cluster);

    let tunnel = Tunnel::open(client, &key.namespace, pod, MYSQL_PORT)
        .await
        .map_err(|source| SqlError::Tunnel {
            pod: pod.to_string(),
            source,
        })?;

    let result = match MysqlDsn::for_cluster(cluster, tunnel.local_port()) {
        Ok(dsn) => {
            tracing::debug!(cluster = %key, pod = pod, dsn = ?dsn, "Executing SQL");
            runner
                .query(&dsn, query)
                .await
                .map_err(|e| SqlError::Query {
                    query: query.to_string(),
                    source: Box::new(e),
                })
        }
        Err(e) => Err(e),
    };

    tunnel.close().await;
    result
}
