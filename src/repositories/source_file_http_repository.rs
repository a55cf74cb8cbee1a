use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::info;

use crate::ports::source_file_repository::{SourceFileRepository, SourceFileRepositoryError};

/// Downloads remote source files over HTTP
pub struct SourceFileHttpRepository {
    client: reqwest::Client,
}

impl SourceFileHttpRepository {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceFileRepository for SourceFileHttpRepository {
    /// Get the whole content of a remote file
    ///
    /// # Arguments
    /// * `url` - Absolute URL of the file
    #[tracing::instrument(name = "Get file from URL", skip(self))]
    async fn get_file(&self, url: &str) -> Result<Vec<u8>, SourceFileRepositoryError> {
        let response = self.client.get(url).send().await?;
        info!("Download response: {}", response.status());

        match response.status() {
            StatusCode::NOT_FOUND => {
                Err(SourceFileRepositoryError::SourceNotFound(url.to_string()))
            }
            status if !status.is_success() => Err(SourceFileRepositoryError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }),
            _ => Ok(response.bytes().await?.to_vec()),
        }
    }
}

impl Default for SourceFileHttpRepository {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}
