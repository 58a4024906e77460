use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use rusqlite::Connection;

/// A single autocommit SQLite connection behind a mutex. The store never
/// opens a second connection to the same file — every repository and
/// migration path shares this handle, so WAL readers/writers never race at
/// the process level.
#[derive(Clone)]
pub struct DbHandle(Arc<Mutex<Connection>>);

impl DbHandle {
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> rusqlite::Result<T> {
        let conn = self.0.lock().expect("db mutex poisoned");
        f(&conn)
    }
}

/// Open (or create) the database file at `db_path`, set WAL journaling with
/// `synchronous=NORMAL`, and return a handle shared by the whole process.
pub fn open_connection(db_path: &Path) -> anyhow::Result<DbHandle> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating storage dir {}", parent.display()))?;
    }

    let conn = Connection::open(db_path)
        .with_context(|| format!("opening sqlite db at {}", db_path.display()))?;

    conn.pragma_update(None, "journal_mode", "WAL")
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("enabling foreign_keys")?;

    Ok(DbHandle(Arc::new(Mutex::new(conn))))
}
