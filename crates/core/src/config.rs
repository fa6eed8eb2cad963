use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub queue: QueueConfig,
    pub trend: TrendConfig,
    pub llm: LlmConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `GRADETREND_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("GRADETREND_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            queue: QueueConfig::from_env_profiled(p),
            trend: TrendConfig::from_env_profiled(p),
            llm: LlmConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  queue:  capacity={}, workers={}, max_retries={}, backoff={}ms",
            self.queue.capacity,
            self.queue.workers,
            self.queue.max_retries,
            self.queue.retry_backoff_ms
        );
        tracing::info!(
            "  trend:  epsilon={}, window={}",
            self.trend.epsilon,
            self.trend.window
        );
        tracing::info!(
            "  llm:    provider={}, configured={}",
            self.llm.provider,
            self.llm.is_configured()
        );
    }
}

// ── Task queue ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Bounded buffer size; enqueue fails fast once it is full.
    pub capacity: usize,
    /// Fixed number of worker tasks spawned on start.
    pub workers: usize,
    /// Retry ceiling applied to tasks enqueued without one.
    pub max_retries: u32,
    /// Backoff unit: the nth retry waits n times this long.
    pub retry_backoff_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            workers: 5,
            max_retries: 3,
            retry_backoff_ms: 1000,
        }
    }
}

impl QueueConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            capacity: profiled_env_parse(p, "QUEUE_CAPACITY", d.capacity).max(1),
            workers: profiled_env_parse(p, "QUEUE_WORKERS", d.workers).max(1),
            max_retries: profiled_env_parse(p, "QUEUE_MAX_RETRIES", d.max_retries),
            retry_backoff_ms: profiled_env_parse(p, "QUEUE_RETRY_BACKOFF_MS", d.retry_backoff_ms),
        }
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

// ── Trend classification policy ───────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendConfig {
    /// Slopes within `[-epsilon, epsilon]` are classified as stable.
    pub epsilon: f64,
    /// Number of trailing points fed to the classifier.
    pub window: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.01,
            window: 10,
        }
    }
}

impl TrendConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            epsilon: profiled_env_parse(p, "TREND_EPSILON", d.epsilon).abs(),
            window: profiled_env_parse(p, "TREND_WINDOW", d.window).max(1),
        }
    }
}

// ── Suggestion LLM ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "ollama", "openai" or "none"
    pub provider: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "none".into(),
            ollama_url: "http://localhost:11434".into(),
            ollama_model: "llama3.2".into(),
            openai_api_key: None,
            openai_model: "gpt-4o-mini".into(),
            openai_base_url: "https://api.openai.com".into(),
            temperature: 0.4,
            max_tokens: 256,
        }
    }
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Self {
        let d = Self::default();
        Self {
            provider: profiled_env_or(p, "LLM_PROVIDER", &d.provider).to_lowercase(),
            ollama_url: profiled_env_or(p, "OLLAMA_URL", &d.ollama_url),
            ollama_model: profiled_env_or(p, "OLLAMA_MODEL", &d.ollama_model),
            openai_api_key: profiled_env_opt(p, "OPENAI_API_KEY"),
            openai_model: profiled_env_or(p, "OPENAI_MODEL", &d.openai_model),
            openai_base_url: profiled_env_or(p, "OPENAI_BASE_URL", &d.openai_base_url),
            temperature: profiled_env_parse(p, "LLM_TEMPERATURE", d.temperature),
            max_tokens: profiled_env_parse(p, "LLM_MAX_TOKENS", d.max_tokens),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "openai" => self.openai_api_key.is_some(),
            "ollama" => true,
            _ => false,
        }
    }
}
