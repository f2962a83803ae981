//! Classification pipeline
//!
//! Turns free-text ticket messages into one of four fixed categories:
//! - `ModelClassifier` - model-backed, two strategies selected by model id
//! - `RetryingClassifier` - bounded backoff on rate limits, then fallback
//! - `KeywordFallbackClassifier` - deterministic, no network
//! - `route` - category to team mapping
//!
//! The pipeline's public contract is total: `RetryingClassifier::classify`
//! always produces a `ClassificationResult`, never an error.

pub mod dataset;
pub mod fallback;
pub mod model;
pub mod retry;
pub mod routing;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use dataset::ReferenceDataset;
pub use fallback::KeywordFallbackClassifier;
pub use model::{ClassifyStrategy, ModelClassifier, ModelClassifierConfig};
pub use retry::{RetryConfig, RetryingClassifier};
pub use routing::{route, Team};

/// The four fixed ticket categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Billing,
    Technical,
    Delivery,
    General,
}

impl Category {
    /// All categories, in routing-table order
    pub const ALL: [Category; 4] = [
        Category::Billing,
        Category::Technical,
        Category::Delivery,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Billing => "billing",
            Category::Technical => "technical",
            Category::Delivery => "delivery",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "billing" => Ok(Category::Billing),
            "technical" => Ok(Category::Technical),
            "delivery" => Ok(Category::Delivery),
            "general" => Ok(Category::General),
            _ => Err(()),
        }
    }
}

/// Where a classification result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Model,
    Fallback,
}

/// Result of classifying one ticket message. Produced fresh per call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Category,
    /// Classifier certainty in [0.0, 1.0]
    pub confidence: f32,
    pub source: Source,
}

impl ClassificationResult {
    pub fn model(category: Category, confidence: f32) -> Self {
        Self {
            category,
            confidence: confidence.clamp(0.0, 1.0),
            source: Source::Model,
        }
    }

    pub fn fallback(category: Category, confidence: f32) -> Self {
        Self {
            category,
            confidence: confidence.clamp(0.0, 1.0),
            source: Source::Fallback,
        }
    }
}

/// Typed failure from a fallible classifier
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// HTTP 429-equivalent. Retryable with backoff.
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        /// Server-suggested wait, when provided
        retry_after: Option<Duration>,
    },

    /// Any other failure: malformed response, timeout, auth. Not retryable.
    #[error("model error: {0}")]
    Model(String),
}

impl ClassifyError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ClassifyError::RateLimited { .. })
    }
}

/// A fallible classification capability.
///
/// `ModelClassifier` is the production implementation; tests script their
/// own. The infallible outer contract lives on `RetryingClassifier`.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify `text`, returning the label and a confidence in [0, 1]
    async fn classify(&self, text: &str) -> Result<(Category, f32), ClassifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_str() {
        for cat in Category::ALL {
            assert_eq!(cat.as_str().parse::<Category>(), Ok(cat));
        }
        assert!("shipping".parse::<Category>().is_err());
    }

    #[test]
    fn confidence_is_clamped_into_range() {
        assert_eq!(ClassificationResult::model(Category::Billing, 1.7).confidence, 1.0);
        assert_eq!(ClassificationResult::fallback(Category::General, -0.2).confidence, 0.0);
    }

    #[test]
    fn category_serializes_snake_case() {
        let json = serde_json::to_string(&Category::Technical).unwrap();
        assert_eq!(json, "\"technical\"");
    }
}
