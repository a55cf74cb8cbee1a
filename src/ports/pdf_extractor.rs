use std::path::Path;

use async_trait::async_trait;

use crate::helper::error_chain_fmt;

/// Turns PDF documents into plain text, all pages merged in one string
#[async_trait]
pub trait PdfExtractor: Send + Sync {
    /// # Returns
    /// `None` when no file exists at `path`.
    async fn extract(&self, path: &Path) -> Result<Option<String>, PdfExtractorError>;

    async fn extract_bytes(&self, bytes: Vec<u8>) -> Result<String, PdfExtractorError>;
}

#[derive(thiserror::Error)]
pub enum PdfExtractorError {
    #[error("Failed to read the PDF file")]
    IOError(#[from] std::io::Error),
    #[error("Failed to parse the PDF document")]
    PdfDocError(#[from] lopdf::Error),
    #[error("The PDF extraction task did not complete: {0}")]
    TaskError(String),
}

impl std::fmt::Debug for PdfExtractorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
