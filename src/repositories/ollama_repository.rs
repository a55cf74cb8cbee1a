use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::info;

use crate::{
    configuration::OllamaSettings,
    domain::entities::vector_point::Embeddings,
    ports::language_model::{EmbeddingModel, LanguageModelError, TextGenerator},
};

/// Client of an Ollama server, used both for embeddings and for summaries
pub struct OllamaRepository {
    client: reqwest::Client,
    endpoint: String,
    embedding_model: String,
    generation_model: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f64>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaRepository {
    pub fn try_new(settings: &OllamaSettings) -> Result<Self, LanguageModelError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: settings.endpoint(),
            embedding_model: settings.embedding_model.clone(),
            generation_model: settings.generation_model.clone(),
        })
    }

    async fn post<Req: Serialize + Sync, Res: DeserializeOwned>(
        &self,
        route: &str,
        body: &Req,
    ) -> Result<Res, LanguageModelError> {
        let response = self
            .client
            .post(format!("{}{}", self.endpoint, route))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LanguageModelError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<Res>().await?)
    }
}

#[async_trait]
impl EmbeddingModel for OllamaRepository {
    #[tracing::instrument(name = "Embedding a text with Ollama", skip(self, text), fields(model = %self.embedding_model))]
    async fn embed(&self, text: &str) -> Result<Embeddings, LanguageModelError> {
        let response: EmbeddingResponse = self
            .post(
                "/api/embeddings",
                &EmbeddingRequest {
                    model: &self.embedding_model,
                    prompt: text,
                },
            )
            .await?;

        if response.embedding.is_empty() {
            return Err(LanguageModelError::EmptyEmbedding);
        }

        info!("Embedding of size {}", response.embedding.len());
        Ok(response.embedding.into_iter().map(|x| x as f32).collect())
    }
}

#[async_trait]
impl TextGenerator for OllamaRepository {
    #[tracing::instrument(name = "Generating a completion with Ollama", skip(self, prompt), fields(model = %self.generation_model))]
    async fn generate(&self, prompt: &str) -> Result<String, LanguageModelError> {
        let response: GenerateResponse = self
            .post(
                "/api/generate",
                &GenerateRequest {
                    model: &self.generation_model,
                    prompt,
                    stream: false,
                },
            )
            .await?;

        Ok(response.response)
    }
}
