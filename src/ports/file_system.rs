use std::path::Path;

use async_trait::async_trait;

/// Minimal file access used by the cache and the PDF extractor
///
/// Errors keep their `std::io::ErrorKind` so callers can tell a missing file from other failures.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Creates the file with `initial_content` if nothing exists at `path`.
    /// An existing file is left untouched.
    async fn ensure_exists(&self, path: &Path, initial_content: &[u8]) -> std::io::Result<()>;

    async fn read_all(&self, path: &Path) -> std::io::Result<Vec<u8>>;

    /// Replaces the whole content of the file
    async fn write_all(&self, path: &Path, content: &[u8]) -> std::io::Result<()>;
}
