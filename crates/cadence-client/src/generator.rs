//! Message generation from a pool of seed prompts

use async_trait::async_trait;
use cadence_core::{CadenceError, ContentGenerator, Result};
use rand::seq::SliceRandom;

/// Picks a random prompt from a fixed pool
#[derive(Debug, Clone)]
pub struct PromptPool {
    prompts: Vec<String>,
}

impl PromptPool {
    /// Build a pool, dropping blank entries
    pub fn new(prompts: impl IntoIterator<Item = String>) -> Self {
        Self {
            prompts: prompts
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    fn pick(&self) -> Option<&String> {
        let mut rng = rand::thread_rng();
        self.prompts.choose(&mut rng)
    }
}

#[async_trait]
impl ContentGenerator for PromptPool {
    async fn generate_message(&self) -> Result<String> {
        self.pick()
            .cloned()
            .ok_or_else(|| CadenceError::Generation("Prompt pool is empty".to_string()))
    }
}
