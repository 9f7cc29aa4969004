//! Connection pool wrapping a single SQLite database shared across
//! workers in one process (§5: "pool shared across workers in one
//! process; per-connection transactions are short-lived").

use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::pooled_connection::deadpool::{Object, Pool as DeadPool};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;

use crate::error::StoreError;

pub type AsyncSqliteConnection = SyncConnectionWrapper<SqliteConnection>;
pub type PooledConnection = Object<AsyncSqliteConnection>;

#[derive(Clone)]
pub struct Pool {
    inner: DeadPool<AsyncSqliteConnection>,
}

impl Pool {
    pub fn new(database_url: &str, max_size: usize) -> Result<Self, StoreError> {
        let config = AsyncDieselConnectionManager::<AsyncSqliteConnection>::new(database_url);
        let inner = DeadPool::builder(config)
            .max_size(max_size)
            .build()
            .map_err(|e| StoreError::Pool(e.to_string()))?;
        Ok(Self { inner })
    }

    pub async fn get(&self) -> Result<PooledConnection, StoreError> {
        self.inner.get().await.map_err(|e| StoreError::Pool(e.to_string()))
    }
}

/// Runs a block of Diesel DSL against a pooled connection, translating
/// pool exhaustion into [`StoreError`] before the body ever touches
/// `diesel::result::Error`.
#[macro_export]
macro_rules! with_conn {
    ($pool:expr, $conn:ident, $body:block) => {{
        let mut $conn = $pool.get().await?;
        $body
    }};
}

pub use with_conn;
