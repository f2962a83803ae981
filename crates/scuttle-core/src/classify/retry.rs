//! Exponential backoff and the retrying classifier
//!
//! Retries the model classifier on rate-limit failures only, then falls
//! through to the deterministic keyword fallback. The public `classify`
//! is a total function: the caller always receives a result.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use super::{
    Category, ClassificationResult, Classifier, ClassifyError, KeywordFallbackClassifier,
};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts against the model classifier
    pub max_attempts: u32,
    /// Delay before the first retry; doubled each attempt
    pub base_delay: Duration,
    /// Cap on the inter-attempt delay
    pub max_delay: Duration,
    /// Whether to add random jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(8),
            jitter: true,
        }
    }
}

/// Parse a Retry-After header value
///
/// The header can be either:
/// - A number of seconds (e.g., "120")
/// - An HTTP date (e.g., "Wed, 21 Oct 2015 07:28:00 GMT")
pub fn parse_retry_after(header_value: &str) -> Option<Duration> {
    if let Ok(seconds) = header_value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    if let Ok(date) = httpdate::parse_http_date(header_value) {
        let now = std::time::SystemTime::now();
        if let Ok(duration) = date.duration_since(now) {
            return Some(duration);
        }
    }

    None
}

/// Wraps a fallible model classifier with bounded backoff and a
/// deterministic fallback. Stateless across calls; safe to share.
pub struct RetryingClassifier {
    model: Arc<dyn Classifier>,
    fallback: KeywordFallbackClassifier,
    config: RetryConfig,
}

impl RetryingClassifier {
    pub fn new(model: Arc<dyn Classifier>, config: RetryConfig) -> Self {
        Self {
            model,
            fallback: KeywordFallbackClassifier::new(),
            config,
        }
    }

    /// Classify `text`. Never fails.
    ///
    /// Rate-limit failures are retried up to `max_attempts` total calls,
    /// waiting an exponentially increasing (capped) delay between
    /// attempts and honoring a server-provided Retry-After. Any other
    /// model failure, or retry exhaustion, falls through to the keyword
    /// fallback with `source = fallback`.
    pub async fn classify(&self, text: &str) -> ClassificationResult {
        match self.classify_model(text).await {
            Ok((category, confidence)) => ClassificationResult::model(category, confidence),
            Err(e) => {
                info!("model classification unavailable ({}), using keyword fallback", e);
                self.fallback.classify(text)
            }
        }
    }

    async fn classify_model(&self, text: &str) -> Result<(Category, f32), ClassifyError> {
        let mut delay = self.config.base_delay;

        for attempt in 1..=self.config.max_attempts {
            match self.model.classify(text).await {
                Ok(result) => return Ok(result),
                Err(ClassifyError::RateLimited { message, retry_after })
                    if attempt < self.config.max_attempts =>
                {
                    let wait = retry_after.unwrap_or(delay);
                    let jittered = if self.config.jitter {
                        let jitter_ms = rand::thread_rng().gen_range(0..1000);
                        wait + Duration::from_millis(jitter_ms)
                    } else {
                        wait
                    };

                    warn!(
                        attempt,
                        max_attempts = self.config.max_attempts,
                        delay_ms = jittered.as_millis() as u64,
                        "Retrying after rate limit: {}",
                        message
                    );

                    tokio::time::sleep(jittered).await;
                    delay = (delay * 2).min(self.config.max_delay);
                }
                Err(e) => return Err(e),
            }
        }

        // The loop always returns on the final attempt; max_attempts of
        // zero disables the model path entirely.
        Err(ClassifyError::Model("model classifier disabled".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::time::Instant;

    use crate::classify::Source;
    use crate::constants::classify::FALLBACK_CONFIDENCE;

    use super::*;

    /// Classifier that plays back a script of results and records the
    /// number of calls made against it.
    struct ScriptedClassifier {
        script: Mutex<Vec<Result<(Category, f32), ClassifyError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedClassifier {
        fn new(script: Vec<Result<(Category, f32), ClassifyError>>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Classifier for ScriptedClassifier {
        async fn classify(&self, _text: &str) -> Result<(Category, f32), ClassifyError> {
            *self.calls.lock().unwrap() += 1;
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                return Err(ClassifyError::Model("script exhausted".to_string()));
            }
            script.remove(0)
        }
    }

    fn rate_limited() -> ClassifyError {
        ClassifyError::RateLimited {
            message: "HTTP 429".to_string(),
            retry_after: None,
        }
    }

    fn no_jitter_config() -> RetryConfig {
        RetryConfig {
            jitter: false,
            ..RetryConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_third_attempt_after_two_backoffs() {
        let model = Arc::new(ScriptedClassifier::new(vec![
            Err(rate_limited()),
            Err(rate_limited()),
            Ok((Category::Billing, 0.9)),
        ]));
        let clf = RetryingClassifier::new(model.clone(), no_jitter_config());

        let started = Instant::now();
        let result = clf.classify("charged twice").await;

        assert_eq!(result.source, Source::Model);
        assert_eq!(result.category, Category::Billing);
        assert_eq!(model.calls(), 3);
        // exactly two backoff waits: 1s + 2s
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3), "elapsed: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(4), "elapsed: {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn model_error_falls_back_without_delay() {
        let model = Arc::new(ScriptedClassifier::new(vec![Err(ClassifyError::Model(
            "boom".to_string(),
        ))]));
        let clf = RetryingClassifier::new(model.clone(), no_jitter_config());

        let started = Instant::now();
        let result = clf.classify("my package is lost in transit").await;

        assert_eq!(model.calls(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(result.source, Source::Fallback);
        assert_eq!(result.category, Category::Delivery);
        assert_eq!(result.confidence, FALLBACK_CONFIDENCE);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_bounds_attempts_and_falls_back() {
        let model = Arc::new(ScriptedClassifier::new(vec![
            Err(rate_limited()),
            Err(rate_limited()),
            Err(rate_limited()),
            Err(rate_limited()),
        ]));
        let clf = RetryingClassifier::new(model.clone(), no_jitter_config());

        let result = clf.classify("refund please").await;

        // at most max_attempts calls, never more
        assert_eq!(model.calls(), 3);
        assert_eq!(result.source, Source::Fallback);
        assert_eq!(result.category, Category::Billing);
    }

    #[tokio::test(start_paused = true)]
    async fn delays_double_up_to_the_cap() {
        let config = RetryConfig {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            jitter: false,
        };
        let model = Arc::new(ScriptedClassifier::new(vec![
            Err(rate_limited()),
            Err(rate_limited()),
            Err(rate_limited()),
            Err(rate_limited()),
            Err(rate_limited()),
        ]));
        let clf = RetryingClassifier::new(model, config);

        let started = Instant::now();
        let _ = clf.classify("hello").await;

        // 1s + 2s + 4s + 4s (capped)
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(11), "elapsed: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(12), "elapsed: {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn retry_after_overrides_the_backoff_delay() {
        let model = Arc::new(ScriptedClassifier::new(vec![
            Err(ClassifyError::RateLimited {
                message: "HTTP 429".to_string(),
                retry_after: Some(Duration::from_secs(7)),
            }),
            Ok((Category::General, 0.6)),
        ]));
        let clf = RetryingClassifier::new(model, no_jitter_config());

        let started = Instant::now();
        let result = clf.classify("hi").await;

        assert_eq!(result.source, Source::Model);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(7), "elapsed: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(8), "elapsed: {elapsed:?}");
    }

    #[tokio::test]
    async fn result_is_always_in_range() {
        let model = Arc::new(ScriptedClassifier::new(vec![Ok((Category::Technical, 4.2))]));
        let clf = RetryingClassifier::new(model, no_jitter_config());

        let result = clf.classify("bug report").await;
        assert!((0.0..=1.0).contains(&result.confidence));
    }

    #[test]
    fn parse_retry_after_seconds() {
        assert_eq!(parse_retry_after("120"), Some(Duration::from_secs(120)));
        assert_eq!(parse_retry_after("0"), Some(Duration::from_secs(0)));
        assert_eq!(parse_retry_after("not-a-date"), None);
    }
}
