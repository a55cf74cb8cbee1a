use async_trait::async_trait;

use crate::helper::error_chain_fmt;

/// Fetches the raw content of remote source files
#[async_trait]
pub trait SourceFileRepository: Send + Sync {
    async fn get_file(&self, url: &str) -> Result<Vec<u8>, SourceFileRepositoryError>;
}

#[derive(thiserror::Error)]
pub enum SourceFileRepositoryError {
    #[error("The source file could not be found: {0}")]
    SourceNotFound(String),
    #[error("Downloading {url} answered with status {status}")]
    UnexpectedStatus { url: String, status: u16 },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl std::fmt::Debug for SourceFileRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
