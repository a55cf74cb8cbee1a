use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{info, warn};

use crate::ports::file_system::FileSystem;

/// `FileSystem` backed by the local disk
#[derive(Debug, Default, Clone)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

/// Sibling file the new content is written to before replacing the target
fn temporary_path(path: &Path) -> PathBuf {
    let mut temporary: OsString = path.as_os_str().to_owned();
    temporary.push(".tmp");
    PathBuf::from(temporary)
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    #[tracing::instrument(name = "Ensuring file exists", skip(self, initial_content))]
    async fn ensure_exists(&self, path: &Path, initial_content: &[u8]) -> std::io::Result<()> {
        // `create_new` fails instead of truncating when the file is already there
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
        {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => return Ok(()),
            Err(error) => return Err(error),
        };

        file.write_all(initial_content).await?;
        file.flush().await?;

        info!("Created file {}", path.display());
        Ok(())
    }

    async fn read_all(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        fs::read(path).await
    }

    #[tracing::instrument(name = "Writing file", skip(self, content), fields(len = content.len()))]
    async fn write_all(&self, path: &Path, content: &[u8]) -> std::io::Result<()> {
        let temporary = temporary_path(path);

        fs::write(&temporary, content).await?;

        if let Err(error) = fs::rename(&temporary, path).await {
            if let Err(cleanup_error) = fs::remove_file(&temporary).await {
                warn!(?cleanup_error, "Failed to remove {}", temporary.display());
            }
            return Err(error);
        }

        Ok(())
    }
}
