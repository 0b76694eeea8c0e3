//! Connections to the writer and reader endpoints.
//!
//! [`Connector`] opens one connection per endpoint and [`Endpoint`] carries the
//! handful of statements a bootstrap run issues. [`MySqlConnector`] is the
//! production implementation: a single `sqlx` connection per endpoint, no pool.

use std::fmt;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::{Connection, Row};
use tracing::debug;

use crate::config::{BootstrapConfig, Credentials};
use crate::schema::{self, CREATE_TABLE, INSERT_SEED, SELECT_NAMES};

/// Which side of the primary/replica pair a connection points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Writer,
    Reader,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Writer => f.write_str("writer"),
            Role::Reader => f.write_str("reader"),
        }
    }
}

#[async_trait]
pub trait Endpoint: Send {
    /// Catalog lookup; true when at least one table matched.
    async fn table_exists(&mut self, table: &str) -> Result<bool, sqlx::Error>;

    async fn create_table(&mut self) -> Result<(), sqlx::Error>;

    /// Inserts the seed row, returning the number of rows affected.
    async fn insert_seed(&mut self) -> Result<u64, sqlx::Error>;

    /// `column` of the first row the table returns, if any. A NULL value reads
    /// as the empty string.
    async fn fetch_first_value(&mut self, column: &str) -> Result<Option<String>, sqlx::Error>;

    /// Waits up to `timeout_secs` for a named advisory lock. `Ok(false)` means
    /// the wait timed out.
    async fn acquire_lock(&mut self, name: &str, timeout_secs: u32) -> Result<bool, sqlx::Error>;

    async fn release_lock(&mut self, name: &str) -> Result<(), sqlx::Error>;

    async fn close(self) -> Result<(), sqlx::Error>;
}

#[async_trait]
pub trait Connector: Sync {
    type Endpoint: Endpoint;

    async fn connect(&self, role: Role, host: &str) -> Result<Self::Endpoint, sqlx::Error>;
}

/// Opens plain MySQL connections with the shared credentials.
#[derive(Clone)]
pub struct MySqlConnector {
    port: u16,
    credentials: Credentials,
    database: String,
}

impl MySqlConnector {
    pub fn new(config: &BootstrapConfig) -> Self {
        Self {
            port: config.port,
            credentials: config.credentials.clone(),
            database: config.database.clone(),
        }
    }

    fn options(&self, host: &str) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(host)
            .port(self.port)
            .username(&self.credentials.username)
            .password(&self.credentials.password)
            .database(&self.database)
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    type Endpoint = MySqlEndpoint;

    async fn connect(&self, role: Role, host: &str) -> Result<MySqlEndpoint, sqlx::Error> {
        debug!(%role, host, port = self.port, database = %self.database, "Opening connection");

        let conn = MySqlConnection::connect_with(&self.options(host)).await?;

        Ok(MySqlEndpoint { role, conn })
    }
}

/// An empty catalog result is a normal answer ("absent"), not an error.
fn any_table_matched<R>(rows: &[R]) -> bool {
    !rows.is_empty()
}

pub struct MySqlEndpoint {
    role: Role,
    conn: MySqlConnection,
}

#[async_trait]
impl Endpoint for MySqlEndpoint {
    async fn table_exists(&mut self, table: &str) -> Result<bool, sqlx::Error> {
        let sql = schema::show_tables_like(table);
        debug!(role = %self.role, %sql, "Checking table");

        let rows = sqlx::query(&sql).fetch_all(&mut self.conn).await?;

        Ok(any_table_matched(&rows))
    }

    async fn create_table(&mut self) -> Result<(), sqlx::Error> {
        debug!(role = %self.role, "Creating table");

        sqlx::query(CREATE_TABLE).execute(&mut self.conn).await?;

        Ok(())
    }

    async fn insert_seed(&mut self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(INSERT_SEED).execute(&mut self.conn).await?;

        Ok(result.rows_affected())
    }

    async fn fetch_first_value(&mut self, column: &str) -> Result<Option<String>, sqlx::Error> {
        let row = sqlx::query(SELECT_NAMES)
            .fetch_optional(&mut self.conn)
            .await?;

        match row {
            Some(row) => {
                let value: Option<String> = row.try_get(column)?;
                Ok(Some(value.unwrap_or_default()))
            }
            None => Ok(None),
        }
    }

    async fn acquire_lock(&mut self, name: &str, timeout_secs: u32) -> Result<bool, sqlx::Error> {
        // 1 = acquired, 0 = timed out, NULL = error (e.g. killed while waiting)
        let acquired: Option<i64> = sqlx::query_scalar("SELECT GET_LOCK(?, ?)")
            .bind(name)
            .bind(timeout_secs)
            .fetch_one(&mut self.conn)
            .await?;

        Ok(acquired == Some(1))
    }

    async fn release_lock(&mut self, name: &str) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT RELEASE_LOCK(?)")
            .bind(name)
            .execute(&mut self.conn)
            .await?;

        Ok(())
    }

    async fn close(self) -> Result<(), sqlx::Error> {
        self.conn.close().await
    }
}
