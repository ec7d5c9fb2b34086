//! Database connection utilities.

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use sitesmith_error::{StorageError, StorageErrorKind, StorageResult};
use tracing::{debug, info};

/// Embedded schema migrations.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Pool of SQLite connections.
pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

#[derive(Debug, Clone, Copy)]
struct ConnectionPragmas;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionPragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA busy_timeout = 5000; PRAGMA journal_mode = WAL;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Whether a URL names a private in-memory database.
pub fn is_in_memory(url: &str) -> bool {
    url == ":memory:" || url.contains("mode=memory")
}

/// Build a connection pool for `url`.
///
/// In-memory databases are private to one connection, so their pool holds a
/// single connection that is never recycled: a replacement would open an
/// empty database without the schema.
///
/// # Errors
///
/// Returns a connection error if the pool cannot open its first connection.
pub fn establish_pool(url: &str) -> StorageResult<SqlitePool> {
    let in_memory = is_in_memory(url);
    let max_size = if in_memory { 1 } else { 8 };
    debug!(url, max_size, "Opening SQLite pool");
    let builder = Pool::builder().max_size(max_size);
    let builder = if in_memory {
        builder.max_lifetime(None).idle_timeout(None)
    } else {
        builder
    };
    builder
        .connection_customizer(Box::new(ConnectionPragmas))
        .build(ConnectionManager::<SqliteConnection>::new(url))
        .map_err(|e| StorageError::new(StorageErrorKind::Connection(e.to_string())))
}

/// Apply pending embedded migrations.
///
/// # Errors
///
/// Returns a migration error if any migration fails.
pub fn run_migrations(pool: &SqlitePool) -> StorageResult<()> {
    let mut conn = pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| StorageError::new(StorageErrorKind::Migration(e.to_string())))?;
    if !applied.is_empty() {
        info!(count = applied.len(), "Applied database migrations");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_pool_keeps_its_connection() {
        let pool = establish_pool(":memory:").unwrap();
        assert_eq!(pool.max_size(), 1);
        assert_eq!(pool.max_lifetime(), None);
        assert_eq!(pool.idle_timeout(), None);
    }

    #[test]
    fn test_file_pool_recycles_connections() {
        let dir = tempfile::tempdir().unwrap();
        let url = dir.path().join("pool.db");
        let pool = establish_pool(&url.to_string_lossy()).unwrap();
        assert_eq!(pool.max_size(), 8);
        assert!(pool.max_lifetime().is_some());
    }

    #[test]
    fn test_in_memory_url_detection() {
        assert!(is_in_memory(":memory:"));
        assert!(is_in_memory("file:shared?mode=memory&cache=shared"));
        assert!(!is_in_memory("sitesmith.db"));
    }
}
