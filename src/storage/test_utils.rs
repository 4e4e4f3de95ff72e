//! Test utilities for storage initialization
//!
//! libsql in-memory databases do not share state across connections, and the
//! store opens a fresh connection per operation, so tests use a unique
//! temp-file database instead. Still fast, and every connection sees the
//! same schema.

use crate::error::Result;
use crate::storage::libsql::{ConnectionMode, LibsqlProgress};
use std::sync::Arc;

/// Create a progress store backed by a unique temporary database file
pub async fn create_test_store() -> Result<Arc<LibsqlProgress>> {
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let counter = COUNTER.fetch_add(1, Ordering::SeqCst);

    let temp_path = std::env::temp_dir().join(format!(
        "paideia_test_{}_{}.db",
        std::process::id(),
        counter
    ));
    let _ = std::fs::remove_file(&temp_path);

    let store = LibsqlProgress::new(ConnectionMode::Local(
        temp_path.to_string_lossy().into_owned(),
    ))
    .await?;

    Ok(Arc::new(store))
}
