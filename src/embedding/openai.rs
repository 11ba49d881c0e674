//! OpenAI embeddings implementation.

use super::Embedder;
use crate::config::OpenAiSettings;
use crate::error::{AdvisorError, Result};
use crate::openai::create_client;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// OpenAI-based embedder.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder with custom model and dimensions.
    pub fn with_config(settings: &OpenAiSettings, model: &str, dimensions: usize) -> Result<Self> {
        Ok(Self {
            client: create_client(settings)?,
            model: model.to_string(),
            dimensions,
        })
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text), fields(len = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::String(text.to_string()))
            .dimensions(self.dimensions as u32)
            .build()
            .map_err(|e| AdvisorError::Embedding(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| AdvisorError::OpenAI(format!("Embedding API error: {}", e)))?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| AdvisorError::Embedding("Empty embedding response".to_string()))?;

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_creation() {
        let settings = OpenAiSettings::default();
        let embedder = OpenAIEmbedder::with_config(&settings, "text-embedding-3-small", 1536).unwrap();
        assert_eq!(embedder.dimensions(), 1536);

        let embedder = OpenAIEmbedder::with_config(&settings, "text-embedding-3-large", 3072).unwrap();
        assert_eq!(embedder.dimensions(), 3072);
    }
}
