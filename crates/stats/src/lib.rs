//! Asynchronous course statistics engine.
//!
//! Request handlers enqueue recomputation through [`StatisticsService`];
//! workers compute course-wide and per-student grade and submission trends
//! and persist them through the injected [`StatisticsStore`].
//!
//! [`StatisticsStore`]: gradetrend_core::StatisticsStore

pub mod compute;
pub mod processor;
pub mod service;
pub mod trend;

pub use processor::StatisticsProcessor;
pub use service::StatisticsService;
pub use trend::{Trend, TrendClassifier, TrendSummary};
