//! Typed AI authoring helpers over a [`LanguageModel`].
//!
//! Every operation sends one prompt built from the template table, except the
//! guarded ones (`chat` and the three `recommend_*` field helpers), which first
//! ask the model whether the request is about blogging and fail with
//! `OffTopic` unless the answer is affirmative. Each model call is bounded by
//! the facade's deadline and is never retried.

use crate::ai::prompts::{render, PromptTemplates};
use crate::ai::LanguageModel;
use crate::error::{BlogError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Number of recommendations `recommend_blogs` returns.
pub const RECOMMENDATION_COUNT: usize = 5;

/// Title, content and tags of a blog draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One suggested blog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogRecommendation {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Result of the content validation helper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn is_affirmative(answer: &str) -> bool {
    answer.trim().to_lowercase().starts_with("yes")
}

/// Removes a surrounding markdown code fence, with or without a language tag.
fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(body) = text.strip_prefix("```") else {
        return text;
    };
    let body = match body.find('\n') {
        Some(newline) => &body[newline + 1..],
        None => body,
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// Stateless AI helper facade.
pub struct AiFacade {
    model: Arc<dyn LanguageModel>,
    prompts: PromptTemplates,
    deadline: Duration,
}

impl AiFacade {
    pub fn new(model: Arc<dyn LanguageModel>, prompts: PromptTemplates, deadline: Duration) -> Self {
        Self {
            model,
            prompts,
            deadline,
        }
    }

    pub fn prompts(&self) -> &PromptTemplates {
        &self.prompts
    }

    async fn send(&self, prompt: &str) -> Result<String> {
        debug!(prompt_len = prompt.len(), "Dispatching prompt");
        match tokio::time::timeout(self.deadline, self.model.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(deadline_ms = self.deadline.as_millis() as u64, "Language model timed out");
                Err(BlogError::Timeout("language model did not respond in time".into()))
            }
        }
    }

    /// Topical guard.
    async fn ensure_on_topic(&self, prompt: &str) -> Result<()> {
        let answer = self
            .send(&render(&self.prompts.check_prompt_content, &[prompt]))
            .await?;
        if is_affirmative(&answer) {
            Ok(())
        } else {
            debug!(answer = answer.trim(), "Prompt rejected by topical guard");
            Err(BlogError::OffTopic)
        }
    }

    pub async fn recommend_title(&self, content: &str, tags: &[String]) -> Result<String> {
        let prompt = render(&self.prompts.recommend_title, &[content, &tags.join(", ")]);
        self.ensure_on_topic(&prompt).await?;
        let response = self.send(&prompt).await?;
        response
            .lines()
            .map(|line| line.trim().trim_matches('"').trim())
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| BlogError::ParseFailed("empty title".into()))
    }

    pub async fn recommend_content(&self, title: &str, tags: &[String]) -> Result<String> {
        let prompt = render(&self.prompts.recommend_content, &[title, &tags.join(", ")]);
        self.ensure_on_topic(&prompt).await?;
        Ok(self.send(&prompt).await?.trim().to_string())
    }

    pub async fn recommend_tags(&self, title: &str, content: &str) -> Result<Vec<String>> {
        let prompt = render(&self.prompts.recommend_tags, &[title, content]);
        self.ensure_on_topic(&prompt).await?;
        let response = self.send(&prompt).await?;

        let mut tags: Vec<String> = Vec::new();
        for tag in response.split(',') {
            let tag = tag.trim().trim_start_matches('#').trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }
        Ok(tags)
    }

    /// Suggests related blogs; the model must answer with a JSON list.
    pub async fn recommend_blogs(&self, seed: &BlogDraft) -> Result<Vec<BlogRecommendation>> {
        let prompt = render(
            &self.prompts.recommend_blog,
            &[&seed.title, &seed.content, &seed.tags.join(", ")],
        );
        let response = self.send(&prompt).await?;

        let mut blogs: Vec<BlogRecommendation> = serde_json::from_str(strip_code_fences(&response))
            .map_err(|e| BlogError::ParseFailed(e.to_string()))?;
        if blogs.len() < RECOMMENDATION_COUNT {
            return Err(BlogError::InsufficientResults {
                got: blogs.len(),
                need: RECOMMENDATION_COUNT,
            });
        }
        blogs.truncate(RECOMMENDATION_COUNT);
        Ok(blogs)
    }

    pub async fn summarize(&self, blog: &BlogDraft) -> Result<String> {
        let flattened = format!(
            "Title: {}, Content {}, Tags {}",
            blog.title,
            blog.content,
            blog.tags.join(", ")
        );
        let prompt = render(&self.prompts.summarize, &[&flattened]);
        Ok(self.send(&prompt).await?.trim().to_string())
    }

    pub async fn refine(&self, content: &str) -> Result<String> {
        let prompt = render(&self.prompts.refine, &[content]);
        Ok(self.send(&prompt).await?.trim().to_string())
    }

    /// Asks the model to vet content; anything but "yes" is the reason it failed.
    pub async fn validate(&self, content: &str) -> Result<Validation> {
        let prompt = render(&self.prompts.validate, &[content]);
        let answer = self.send(&prompt).await?;
        if is_affirmative(&answer) {
            Ok(Validation {
                valid: true,
                reason: None,
            })
        } else {
            Ok(Validation {
                valid: false,
                reason: Some(answer.trim().to_string()),
            })
        }
    }

    pub async fn chat(&self, prompt: &str) -> Result<String> {
        self.ensure_on_topic(prompt).await?;
        Ok(self.send(prompt).await?.trim().to_string())
    }
}

impl std::fmt::Debug for AiFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiFacade")
            .field("deadline", &self.deadline)
            .finish()
    }
}
