use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs4::fs_std::FileExt;

/// Cross-process advisory lock guarding schema migration. Backed by a
/// sibling file `{db_path}.migration.lock` so multiple `traceos` processes
/// started against the same storage root serialize their migration step
/// instead of racing on `CREATE TABLE`.
pub struct MigrationLock {
    path: PathBuf,
    file: Option<File>,
}

impl MigrationLock {
    pub fn new(db_path: &Path) -> Self {
        let mut lock_name = db_path.file_name().unwrap_or_default().to_os_string();
        lock_name.push(".migration.lock");
        let path = db_path.with_file_name(lock_name);
        Self { path, file: None }
    }

    /// Block until the lock is acquired.
    pub fn acquire(&mut self) -> std::io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.path)?;
        file.lock_exclusive()?;
        self.file = Some(file);
        Ok(())
    }

    /// Try to acquire the lock, polling until `timeout` elapses.
    pub fn try_acquire(&mut self, timeout: Duration) -> std::io::Result<bool> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.path)?;

        let deadline = Instant::now() + timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(true) => {
                    self.file = Some(file);
                    return Ok(true);
                }
                Ok(false) => {
                    if Instant::now() >= deadline {
                        return Ok(false);
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Ok(false);
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn release(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
    }
}

impl Drop for MigrationLock {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_and_release_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("traceos_memory.db");
        let mut lock = MigrationLock::new(&db_path);
        lock.acquire().unwrap();
        lock.release();
    }

    #[test]
    fn lock_path_has_leading_component_matching_db_name() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("traceos_memory.db");
        let lock = MigrationLock::new(&db_path);
        assert_eq!(
            lock.path.file_name().unwrap(),
            "traceos_memory.db.migration.lock"
        );
    }

    #[test]
    fn try_acquire_fails_fast_when_already_locked_by_self_file() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("traceos_memory.db");
        let mut first = MigrationLock::new(&db_path);
        assert!(first.try_acquire(Duration::from_millis(50)).unwrap());
        let mut second = MigrationLock::new(&db_path);
        let got = second.try_acquire(Duration::from_millis(150)).unwrap();
        assert!(!got);
        first.release();
    }
}
