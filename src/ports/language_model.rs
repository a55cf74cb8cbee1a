use async_trait::async_trait;

use crate::{domain::entities::vector_point::Embeddings, helper::error_chain_fmt};

/// Maps a text to a fixed-length vector
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embeddings, LanguageModelError>;
}

/// Completes a prompt, used to summarize extracted texts
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LanguageModelError>;
}

#[derive(thiserror::Error)]
pub enum LanguageModelError {
    #[error("Failed to reach the model server")]
    Http(#[from] reqwest::Error),
    #[error("The model server answered with status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("The model returned an empty embedding")]
    EmptyEmbedding,
}

impl std::fmt::Debug for LanguageModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
