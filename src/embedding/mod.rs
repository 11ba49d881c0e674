//! Embedding generation for personal-history similarity search.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic embedders for tests.

    use super::Embedder;
    use crate::error::{AdvisorError, Result};
    use async_trait::async_trait;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    /// Bag-of-words embedder: texts sharing words end up close together.
    pub struct KeywordEmbedder {
        dimensions: usize,
    }

    impl KeywordEmbedder {
        pub fn new(dimensions: usize) -> Self {
            Self { dimensions }
        }
    }

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut vector = vec![0.0; self.dimensions];
            for word in text
                .split(|c: char| !c.is_alphanumeric())
                .filter(|w| w.len() > 2)
            {
                let mut hasher = DefaultHasher::new();
                word.to_lowercase().hash(&mut hasher);
                vector[(hasher.finish() as usize) % self.dimensions] += 1.0;
            }
            Ok(vector)
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }
    }

    /// Embedder whose service is always down.
    pub struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(AdvisorError::Embedding("service unavailable".to_string()))
        }

        fn dimensions(&self) -> usize {
            1536
        }
    }
}
