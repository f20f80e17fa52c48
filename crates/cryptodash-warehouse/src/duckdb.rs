//! `DuckDB` connection pool management.
//!
//! Every store owns one database instance. Extra connections are cloned from
//! the root connection so they share that instance instead of re-opening the
//! file (a second open of the same file from one process fails on the lock).

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use ::duckdb::Connection;

struct PoolInner {
    db_path: PathBuf,
    max_pool_size: usize,
    root: Mutex<Connection>,
    idle: Mutex<Vec<Connection>>,
}

/// A connection pool manager for one `DuckDB` database file.
#[derive(Clone)]
pub struct DuckDbConnectionManager {
    inner: Arc<PoolInner>,
}

impl DuckDbConnectionManager {
    /// Open the database file and create a pool around it.
    ///
    /// # Errors
    /// Returns an error if the database file cannot be opened or configured.
    pub fn open(path: impl Into<PathBuf>, max_pool_size: usize) -> Result<Self, ::duckdb::Error> {
        let db_path = path.into();
        let root = Connection::open(db_path.as_path())?;
        configure_connection(&root)?;

        Ok(Self {
            inner: Arc::new(PoolInner {
                db_path,
                max_pool_size: max_pool_size.max(1),
                root: Mutex::new(root),
                idle: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Run `work` on a pooled connection, returning it to the pool afterwards.
    ///
    /// # Errors
    /// Returns the error produced by `work`, or a `DuckDB` error when a new
    /// connection cannot be cloned from the root connection.
    pub fn with_connection<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<::duckdb::Error>,
        F: FnOnce(&Connection) -> Result<T, E>,
    {
        let connection = self.checkout()?;
        let result = work(&connection);
        self.checkin(connection);
        result
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        self.inner.db_path.as_path()
    }

    fn checkout(&self) -> Result<Connection, ::duckdb::Error> {
        let pooled = self
            .inner
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        if let Some(connection) = pooled {
            return Ok(connection);
        }

        let root = self
            .inner
            .root
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let connection = root.try_clone()?;
        configure_connection(&connection)?;
        Ok(connection)
    }

    fn checkin(&self, connection: Connection) {
        let mut idle = self
            .inner
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.inner.max_pool_size {
            idle.push(connection);
        }
    }
}

fn configure_connection(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("PRAGMA disable_progress_bar;")
}
