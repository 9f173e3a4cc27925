//! AI-assisted authoring helpers.
//!
//! The facade depends only on the [`LanguageModel`] trait, so the Gemini
//! adapter can be swapped for a scripted model in tests.

pub mod facade;
pub mod gemini;
pub mod prompts;

pub use facade::{AiFacade, BlogDraft, BlogRecommendation, Validation, RECOMMENDATION_COUNT};
pub use gemini::GeminiModel;
pub use prompts::PromptTemplates;

use crate::error::Result;
use async_trait::async_trait;

/// A text generation backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Sends one prompt and returns the raw response text.
    async fn generate(&self, prompt: &str) -> Result<String>;
}
