//! Application constants and configuration defaults
//!
//! Centralized location for magic numbers and default values

use std::time::Duration;

/// HTTP client configuration
pub mod http {
    use super::*;

    /// Connection timeout for HTTP requests
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Total request timeout for classification calls.
    /// A timed-out call is treated as a model error and is never retried.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
}

/// Classification configuration
pub mod classify {
    /// Default model ID
    pub const DEFAULT_MODEL: &str = "gpt-5-nano";

    /// Confidence attached to every fallback result.
    /// Fixed value: signals "degraded but usable", not a calibrated score.
    pub const FALLBACK_CONFIDENCE: f32 = 0.5;

    /// Maximum output tokens for classification calls
    pub const MAX_OUTPUT_TOKENS: usize = 200;
}

/// CLI configuration
pub mod cli {
    /// Config directory name
    pub const CONFIG_DIR_NAME: &str = ".scuttle";
}
