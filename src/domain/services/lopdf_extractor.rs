use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{
    domain::readers::pdf_reader::PdfReader,
    ports::{
        file_system::FileSystem,
        pdf_extractor::{PdfExtractor, PdfExtractorError},
    },
    telemetry::spawn_blocking_with_tracing,
};

/// `PdfExtractor` parsing documents with `lopdf`
///
/// Parsing is CPU bound: it runs on the blocking thread pool so concurrent extractions
/// don't stall the async runtime.
pub struct LopdfExtractor {
    file_system: Arc<dyn FileSystem>,
}

impl LopdfExtractor {
    pub fn new(file_system: Arc<dyn FileSystem>) -> Self {
        Self { file_system }
    }
}

#[async_trait]
impl PdfExtractor for LopdfExtractor {
    #[tracing::instrument(name = "Extracting PDF file", skip(self))]
    async fn extract(&self, path: &Path) -> Result<Option<String>, PdfExtractorError> {
        let bytes = match self.file_system.read_all(path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                warn!("PDF file {} does not exist", path.display());
                return Ok(None);
            }
            Err(error) => return Err(error.into()),
        };

        self.extract_bytes(bytes).await.map(Some)
    }

    #[tracing::instrument(name = "Extracting PDF content", skip(self, bytes), fields(len = bytes.len()))]
    async fn extract_bytes(&self, bytes: Vec<u8>) -> Result<String, PdfExtractorError> {
        let text = spawn_blocking_with_tracing(move || {
            PdfReader::try_from_bytes(&bytes).and_then(PdfReader::read_to_string)
        })
        .await
        .map_err(|e| PdfExtractorError::TaskError(e.to_string()))??;

        info!("Extracted {} characters", text.chars().count());
        Ok(text)
    }
}
