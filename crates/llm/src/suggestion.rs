//! Teaching suggestions generated from course trend summaries.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use gradetrend_core::config::LlmConfig;
use gradetrend_core::{NoSuggestions, SuggestionError, SuggestionGenerator, Tendency};

use crate::provider::{LlmError, LlmProvider, Message};
use crate::providers::create_provider;

const SYSTEM_PROMPT: &str = "You advise a teacher about their course. You receive the recent \
trend of average grades, the recent trend of submission rates, and the recent average grade. \
Reply with one or two short, concrete suggestions in plain text. No lists, no headings.";

/// [`SuggestionGenerator`] backed by an LLM chat completion.
pub struct LlmSuggestionGenerator {
    provider: Box<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl LlmSuggestionGenerator {
    pub fn new(provider: Box<dyn LlmProvider>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
        }
    }
}

/// Build the generator selected by config; [`NoSuggestions`] when disabled.
pub fn suggestion_generator(config: &LlmConfig) -> Result<Arc<dyn SuggestionGenerator>, LlmError> {
    Ok(match create_provider(config)? {
        Some(provider) => Arc::new(LlmSuggestionGenerator::new(
            provider,
            config.temperature,
            config.max_tokens,
        )),
        None => Arc::new(NoSuggestions),
    })
}

fn describe(tendency: Tendency) -> &'static str {
    match tendency {
        Tendency::Crescent => "rising",
        Tendency::Decrescent => "falling",
        Tendency::Stable => "stable",
    }
}

pub(crate) fn user_prompt(grade: Tendency, submission: Tendency, average_grade: f64) -> String {
    format!(
        "Grades are {} ({}). Submission rates are {} ({}). Recent average grade: {:.1}.",
        describe(grade),
        grade,
        describe(submission),
        submission,
        average_grade
    )
}

#[async_trait]
impl SuggestionGenerator for LlmSuggestionGenerator {
    async fn generate(
        &self,
        grade_tendency: Tendency,
        submission_tendency: Tendency,
        average_grade: f64,
    ) -> Result<String, SuggestionError> {
        let messages = vec![
            Message::system(SYSTEM_PROMPT),
            Message::user(user_prompt(grade_tendency, submission_tendency, average_grade)),
        ];

        let response = self
            .provider
            .complete(messages, self.temperature, self.max_tokens)
            .await
            .map_err(|e| match e {
                LlmError::NotConfigured(msg) => SuggestionError::Unavailable(msg),
                other => SuggestionError::Generation(other.to_string()),
            })?;

        let text = response.trim();
        if text.is_empty() {
            return Err(SuggestionError::Generation("empty completion".into()));
        }
        debug!(chars = text.len(), "Suggestion generated");
        Ok(text.to_string())
    }
}
