//! Tendency classification of grade and submission-rate series.
//!
//! A series is classified by the ordinary-least-squares slope of value
//! against position (0, 1, 2, ...). Slopes above `epsilon` are crescent,
//! below `-epsilon` decrescent, anything else (including a non-finite
//! slope) stable.

use serde::{Deserialize, Serialize};

use gradetrend_core::config::TrendConfig;
use gradetrend_core::{StatisticsForAssignment, Tendency};

/// Tendency and arithmetic mean of one series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub tendency: Tendency,
    pub mean: f64,
}

/// Classification of the trailing window of an assignment series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub grade_tendency: Tendency,
    pub submission_tendency: Tendency,
    /// Mean grade over the window.
    pub average_grade: f64,
}

#[derive(Debug, Clone)]
pub struct TrendClassifier {
    epsilon: f64,
    window: usize,
}

impl Default for TrendClassifier {
    fn default() -> Self {
        Self::from(&TrendConfig::default())
    }
}

impl From<&TrendConfig> for TrendClassifier {
    fn from(config: &TrendConfig) -> Self {
        Self::new(config.epsilon, config.window)
    }
}

impl TrendClassifier {
    pub fn new(epsilon: f64, window: usize) -> Self {
        Self {
            epsilon: epsilon.abs(),
            window: window.max(1),
        }
    }

    pub fn classify(&self, values: &[f64]) -> Trend {
        let tendency = match slope(values) {
            Some(s) if s > self.epsilon => Tendency::Crescent,
            Some(s) if s < -self.epsilon => Tendency::Decrescent,
            _ => Tendency::Stable,
        };
        Trend {
            tendency,
            mean: mean(values),
        }
    }

    /// Classify the last `window` points (fewer if the series is shorter).
    pub fn summarize(&self, points: &[StatisticsForAssignment]) -> TrendSummary {
        let recent = &points[points.len().saturating_sub(self.window)..];
        let grades: Vec<f64> = recent.iter().map(|p| p.average_grade).collect();
        let rates: Vec<f64> = recent.iter().map(|p| p.submission_rate).collect();

        let grade = self.classify(&grades);
        let submission = self.classify(&rates);
        TrendSummary {
            grade_tendency: grade.tendency,
            submission_tendency: submission.tendency,
            average_grade: grade.mean,
        }
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// OLS slope against the index. `None` for fewer than two points.
fn slope(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = mean(values);

    let (mut num, mut den) = (0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    let s = num / den;
    s.is_finite().then_some(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn classifier() -> TrendClassifier {
        TrendClassifier::default()
    }

    fn point(grade: f64, rate: f64) -> StatisticsForAssignment {
        StatisticsForAssignment {
            date: Utc::now(),
            average_grade: grade,
            submission_rate: rate,
        }
    }

    #[test]
    fn rising_series_is_crescent() {
        let trend = classifier().classify(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(trend.tendency, Tendency::Crescent);
        assert!((trend.mean - 3.0).abs() < 1e-9);
    }

    #[test]
    fn falling_series_is_decrescent() {
        let trend = classifier().classify(&[5.0, 4.0, 3.0, 2.0, 1.0]);
        assert_eq!(trend.tendency, Tendency::Decrescent);
    }

    #[test]
    fn flat_series_is_stable() {
        let trend = classifier().classify(&[3.0, 3.0, 3.0, 3.0]);
        assert_eq!(trend.tendency, Tendency::Stable);
        assert_eq!(trend.mean, 3.0);
    }

    #[test]
    fn single_point_is_stable_with_its_value() {
        let trend = classifier().classify(&[7.0]);
        assert_eq!(trend.tendency, Tendency::Stable);
        assert_eq!(trend.mean, 7.0);
    }

    #[test]
    fn empty_series_is_stable_zero() {
        let summary = classifier().summarize(&[]);
        assert_eq!(summary.grade_tendency, Tendency::Stable);
        assert_eq!(summary.submission_tendency, Tendency::Stable);
        assert_eq!(summary.average_grade, 0.0);
    }

    #[test]
    fn slope_within_epsilon_is_stable() {
        // slope 0.005
        let trend = classifier().classify(&[0.50, 0.505, 0.51]);
        assert_eq!(trend.tendency, Tendency::Stable);
    }

    #[test]
    fn non_finite_values_are_stable() {
        let trend = classifier().classify(&[1.0, f64::NAN, 3.0]);
        assert_eq!(trend.tendency, Tendency::Stable);
    }

    #[test]
    fn summary_uses_trailing_window_only() {
        // Twelve points: two high ones outside the window, then a rising tail.
        let mut points = vec![point(100.0, 1.0), point(100.0, 1.0)];
        points.extend((0..10).map(|i| point(50.0 + i as f64, 0.5)));

        let summary = classifier().summarize(&points);
        assert_eq!(summary.grade_tendency, Tendency::Crescent);
        assert_eq!(summary.submission_tendency, Tendency::Stable);
        assert!((summary.average_grade - 54.5).abs() < 1e-9);
    }

    #[test]
    fn custom_epsilon_widens_stable_band() {
        let strict = TrendClassifier::new(2.0, 10);
        let trend = strict.classify(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(trend.tendency, Tendency::Stable);
    }
}
