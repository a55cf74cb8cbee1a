use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use futures::lock::Mutex;

use crate::ports::file_system::FileSystem;

/// `FileSystem` keeping files in memory, for tests and dry runs
///
/// Writes can be made to fail to reproduce a read-only disk.
pub struct InMemoryFileSystem {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    failing_writes: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryFileSystem {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            failing_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    pub async fn insert(&self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        self.files.lock().await.insert(path.into(), content.into());
    }

    pub async fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.lock().await.get(path).cloned()
    }

    /// Every following write fails with `PermissionDenied`
    pub fn fail_writes(&self) {
        self.failing_writes.store(true, Ordering::SeqCst);
    }

    /// Number of successful `write_all` calls
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> std::io::Result<()> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "in-memory file system is read-only",
            ));
        }
        Ok(())
    }
}

impl Default for InMemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystem for InMemoryFileSystem {
    async fn ensure_exists(&self, path: &Path, initial_content: &[u8]) -> std::io::Result<()> {
        let mut files = self.files.lock().await;
        if files.contains_key(path) {
            return Ok(());
        }
        self.check_writable()?;
        files.insert(path.to_path_buf(), initial_content.to_vec());
        Ok(())
    }

    async fn read_all(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        self.files.lock().await.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )
        })
    }

    async fn write_all(&self, path: &Path, content: &[u8]) -> std::io::Result<()> {
        self.check_writable()?;
        self.files
            .lock()
            .await
            .insert(path.to_path_buf(), content.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
