pub mod ollama;
pub mod openai;

use serde_json::{json, Value};

use gradetrend_core::config::LlmConfig;

use crate::provider::{LlmError, LlmProvider, Message, Role};

/// Create the configured provider, or `None` when suggestions are disabled.
pub fn create_provider(config: &LlmConfig) -> Result<Option<Box<dyn LlmProvider>>, LlmError> {
    match config.provider.as_str() {
        "none" | "" => Ok(None),
        "openai" => {
            let api_key = config
                .openai_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("OPENAI_API_KEY not set".into()))?;
            Ok(Some(Box::new(openai::OpenAiProvider::new(
                api_key.clone(),
                config.openai_model.clone(),
                config.openai_base_url.clone(),
            ))))
        }
        "ollama" => Ok(Some(Box::new(ollama::OllamaProvider::new(
            config.ollama_url.clone(),
            config.ollama_model.clone(),
        )))),
        other => Err(LlmError::NotConfigured(format!(
            "unknown LLM provider: '{}'",
            other
        ))),
    }
}

/// Chat messages in the `{role, content}` shape both backends accept.
pub(crate) fn chat_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| {
            json!({
                "role": match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                "content": m.content,
            })
        })
        .collect()
}

/// Read the response body, turning non-200 statuses into [`LlmError::ApiError`].
pub(crate) async fn json_body(response: reqwest::Response) -> Result<Value, LlmError> {
    let status = response.status().as_u16();
    if status != 200 {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::ApiError { status, body });
    }
    Ok(response.json().await?)
}
