//! MySQL connector: pool construction and session hand-out

use async_trait::async_trait;
use mydump_core::{
    ConnectionConfig, Connector, MydumpError, Result, SnapshotSession, Transaction,
};
use mysql_async::{IsolationLevel, Opts, OptsBuilder, Pool, TxOpts, prelude::*};

use crate::session::{MySqlRestoreTransaction, MySqlSnapshot};

/// Connection factory for one MySQL/MariaDB server.
///
/// Every session handed out holds its own pooled connection, so concurrent
/// dump workers never share a transaction.
pub struct MySqlConnector {
    pool: Pool,
    host: String,
    port: u16,
}

impl MySqlConnector {
    /// Build a pool from `config` and verify the server is reachable
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        tracing::info!(host = %config.host, port = %config.port, user = %config.user, "connecting to MySQL server");

        let mut opts_builder = OptsBuilder::from_opts(Opts::default())
            .ip_or_hostname(config.host.clone())
            .tcp_port(config.port)
            .user(Some(config.user.clone()));

        if let Some(p) = &config.password {
            opts_builder = opts_builder.pass(Some(p.clone()));
        }

        let pool = Pool::new(Opts::from(opts_builder));

        // Verify connectivity by acquiring and releasing a connection
        let conn = pool
            .get_conn()
            .await
            .map_err(|e| MydumpError::Connection(format!("Failed to connect to MySQL: {}", e)))?;
        drop(conn);

        tracing::info!(host = %config.host, port = %config.port, "MySQL connection established");
        Ok(Self {
            pool,
            host: config.host.clone(),
            port: config.port,
        })
    }

    /// Disconnect every pooled connection
    pub async fn close(self) -> Result<()> {
        tracing::info!(host = %self.host, port = %self.port, "closing MySQL connection pool");
        self.pool
            .disconnect()
            .await
            .map_err(|e| MydumpError::Connection(format!("Failed to close MySQL connection: {}", e)))
    }

    async fn start_transaction(&self, opts: &TxOpts) -> Result<mysql_async::Transaction<'static>> {
        self.pool
            .start_transaction(opts.clone())
            .await
            .map_err(|e| MydumpError::Transaction(format!("Failed to begin transaction: {}", e)))
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    async fn list_schemas(&self) -> Result<Vec<String>> {
        let mut conn = self
            .pool
            .get_conn()
            .await
            .map_err(|e| MydumpError::Connection(format!("Failed to get MySQL connection: {}", e)))?;
        let schemas: Vec<String> = conn
            .query("SHOW DATABASES")
            .await
            .map_err(|e| MydumpError::Query(format!("Failed to list databases: {}", e)))?;
        tracing::debug!(count = schemas.len(), "listed databases");
        Ok(schemas)
    }

    async fn begin_snapshot(&self) -> Result<Box<dyn SnapshotSession>> {
        let mut opts = TxOpts::default();
        opts.with_isolation_level(IsolationLevel::RepeatableRead)
            .with_consistent_snapshot(true)
            .with_readonly(true);

        let tx = self.start_transaction(&opts).await?;
        tracing::debug!("began read-only snapshot transaction");
        Ok(Box::new(MySqlSnapshot::new(tx)))
    }

    async fn begin_restore(&self) -> Result<Box<dyn Transaction>> {
        let mut opts = TxOpts::default();
        opts.with_isolation_level(IsolationLevel::Serializable);

        let tx = self.start_transaction(&opts).await?;
        tracing::debug!("began serializable restore transaction");
        Ok(Box::new(MySqlRestoreTransaction::new(tx)))
    }
}
