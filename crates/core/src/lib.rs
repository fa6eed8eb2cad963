pub mod config;
pub mod entity;
pub mod error;
pub mod memory;
pub mod store;
pub mod suggest;

pub use config::Config;
pub use entity::*;
pub use error::*;
pub use memory::{Fixture, MemoryStore};
pub use store::StatisticsStore;
pub use suggest::{NoSuggestions, SuggestionGenerator};
