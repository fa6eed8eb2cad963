pub mod provider;
pub mod providers;
pub mod suggestion;

pub use provider::{LlmError, LlmProvider, Message, Role};
pub use providers::create_provider;
pub use suggestion::{suggestion_generator, LlmSuggestionGenerator};
