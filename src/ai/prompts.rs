//! Prompt templates keyed by operation.
//!
//! Templates use `{}` placeholders filled positionally. The table is read
//! once at startup from a JSON file such as:
//!
//! ```json
//! { "check_prompt_content": "... {} ...", "recommend_title": "... {} ... {}", ... }
//! ```
//!
//! Keys missing from the file keep their built-in defaults.

use crate::error::{BlogError, Result};
use serde::Deserialize;
use std::path::Path;

/// One template per AI operation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PromptTemplates {
    /// Topical guard; one slot for the prompt under test.
    pub check_prompt_content: String,
    /// Slots: content, tags.
    pub recommend_title: String,
    /// Slots: title, tags.
    pub recommend_content: String,
    /// Slots: title, content.
    pub recommend_tags: String,
    /// Slots: title, content, tags.
    pub recommend_blog: String,
    /// Slot: the flattened blog.
    pub summarize: String,
    /// Slot: content.
    pub refine: String,
    /// Slot: content.
    pub validate: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            check_prompt_content: "Answer with a single word, yes or no. Is the following request \
                about blogging, writing, or blog content? Request: {}"
                .into(),
            recommend_title: "Suggest one concise, engaging title for a blog with this content: {} \
                Tags: {}. Reply with the title only."
                .into(),
            recommend_content: "Write a well-structured blog post titled \"{}\" that covers these \
                tags: {}."
                .into(),
            recommend_tags: "Suggest up to five short tags for a blog titled \"{}\" with this \
                content: {}. Reply with a comma-separated list only."
                .into(),
            recommend_blog: "Recommend five blog posts related to this one. Title: {} Content: {} \
                Tags: {}. Respond with a JSON array of objects with the fields \"title\", \
                \"summary\" and \"tags\"."
                .into(),
            summarize: "Summarize the following blog in one short paragraph: {}".into(),
            refine: "Improve the grammar, clarity and flow of this blog content without changing \
                its meaning. Reply with the revised text only: {}"
                .into(),
            validate: "Reply with exactly \"yes\" if the following blog content is appropriate and \
                coherent. Otherwise briefly explain what is wrong. Content: {}"
                .into(),
        }
    }
}

impl PromptTemplates {
    /// Loads templates from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            BlogError::config(format!("Failed to read prompts {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| BlogError::config(format!("Invalid prompt templates: {}", e)))
    }
}

/// Fills `{}` slots left to right; surplus slots become empty.
pub fn render(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len() + args.iter().map(|a| a.len()).sum::<usize>());
    let mut args = args.iter();
    let mut rest = template;
    while let Some(pos) = rest.find("{}") {
        out.push_str(&rest[..pos]);
        if let Some(arg) = args.next() {
            out.push_str(arg);
        }
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_positional() {
        assert_eq!(render("a {} b {} c", &["1", "2"]), "a 1 b 2 c");
        assert_eq!(render("{}{}", &["x"]), "x");
        assert_eq!(render("no slots", &["ignored"]), "no slots");
    }

    #[test]
    fn test_render_does_not_reexpand_arguments() {
        assert_eq!(render("[{}] [{}]", &["{}", "z"]), "[{}] [z]");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let templates = PromptTemplates::from_json(r#"{"refine": "fix: {}"}"#).unwrap();
        assert_eq!(templates.refine, "fix: {}");
        assert_eq!(templates.summarize, PromptTemplates::default().summarize);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        assert!(matches!(
            PromptTemplates::from_json("not json"),
            Err(BlogError::Config(_))
        ));
    }

    #[test]
    fn test_defaults_have_expected_slots() {
        let t = PromptTemplates::default();
        assert_eq!(t.check_prompt_content.matches("{}").count(), 1);
        assert_eq!(t.recommend_title.matches("{}").count(), 2);
        assert_eq!(t.recommend_blog.matches("{}").count(), 3);
        assert_eq!(t.validate.matches("{}").count(), 1);
    }
}
