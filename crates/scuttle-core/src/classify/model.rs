//! Model-backed classifier
//!
//! Calls an external text-classification capability over HTTP. Two named
//! strategies, selected once at construction from the configured model id:
//!
//! - `Direct` - a single structured-output call; the model answers with
//!   JSON `{"label": ..., "confidence": ...}`.
//! - `ToolAugmented` - a few-shot call grounded with the reference
//!   dataset of already-routed ticket examples.
//!
//! Both return `(Category, confidence)` or a typed failure: `RateLimited`
//! for 429-equivalents, `Model` for everything else.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::constants;

use super::retry::parse_retry_after;
use super::{Category, Classifier, ClassifyError, ReferenceDataset};

/// Model ids served by the structured-output responses endpoint
const RESPONSES_API_MODELS: &[&str] = &["gpt-5-nano"];

/// How the model is asked to classify
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifyStrategy {
    /// Single structured-output call
    Direct,
    /// Few-shot call grounded with reference examples
    ToolAugmented,
}

impl ClassifyStrategy {
    /// Select the strategy for a model id
    pub fn for_model(model: &str) -> Self {
        let model_lower = model.to_lowercase();
        if RESPONSES_API_MODELS.iter().any(|m| model_lower.contains(m)) {
            ClassifyStrategy::Direct
        } else {
            ClassifyStrategy::ToolAugmented
        }
    }
}

/// Configuration for the model classifier
#[derive(Debug, Clone)]
pub struct ModelClassifierConfig {
    /// Model ID to use for API calls
    pub model: String,
    /// API base URL (endpoint path is appended per strategy)
    pub base_url: String,
    /// Maximum output tokens
    pub max_tokens: usize,
}

impl Default for ModelClassifierConfig {
    fn default() -> Self {
        Self {
            model: constants::classify::DEFAULT_MODEL.to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_tokens: constants::classify::MAX_OUTPUT_TOKENS,
        }
    }
}

/// Model-backed classification client
pub struct ModelClassifier {
    http: Client,
    config: ModelClassifierConfig,
    api_key: String,
    strategy: ClassifyStrategy,
    dataset: ReferenceDataset,
}

impl ModelClassifier {
    /// Create a new classifier. The strategy is fixed here, from the
    /// configured model id.
    pub fn new(config: ModelClassifierConfig, api_key: String) -> Self {
        let strategy = ClassifyStrategy::for_model(&config.model);
        Self {
            http: Self::create_http_client(),
            config,
            api_key,
            strategy,
            dataset: ReferenceDataset::default(),
        }
    }

    /// Replace the reference dataset used for few-shot grounding
    pub fn with_dataset(mut self, dataset: ReferenceDataset) -> Self {
        self.dataset = dataset;
        self
    }

    pub fn strategy(&self) -> ClassifyStrategy {
        self.strategy
    }

    /// HTTP client with bounded timeouts; exceeding them is a model
    /// error, never a retryable rate limit.
    fn create_http_client() -> Client {
        Client::builder()
            .user_agent("Scuttle/1.0")
            .connect_timeout(constants::http::CONNECT_TIMEOUT)
            .timeout(constants::http::REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                error!("Failed to build HTTP client: {}. Using default client.", e);
                Client::new()
            })
    }

    fn build_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
    }

    /// Turn a non-success response into the typed failure
    async fn handle_error_response(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ClassifyError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().await.unwrap_or_default();
        let body_lower = body.to_lowercase();

        // Some providers report throttling with a 200-family status code
        // absent here, but a 429 or a "rate limit" body always means it.
        if status.as_u16() == 429
            || body_lower.contains("rate limit")
            || body_lower.contains("too many requests")
        {
            warn!(status = status.as_u16(), "classification call rate limited");
            return Err(ClassifyError::RateLimited {
                message: format!("HTTP {status}: {body}"),
                retry_after,
            });
        }

        error!(status = status.as_u16(), "classification call failed: {}", body);
        Err(ClassifyError::Model(format!("HTTP {status}: {body}")))
    }

    async fn classify_direct(&self, text: &str) -> Result<(Category, f32), ClassifyError> {
        let prompt = format!(
            "Classify this support ticket message into exactly one category: \
             billing, technical, delivery, or general.\n\
             Ticket message: '{text}'\n\
             Respond with only a JSON object: {{\"label\": \"<category>\", \"confidence\": <0.0-1.0>}}"
        );

        let body = serde_json::json!({
            "model": self.config.model,
            "input": prompt,
            "max_output_tokens": self.config.max_tokens,
            "store": false,
        });

        let url = format!("{}/responses", self.config.base_url.trim_end_matches('/'));
        let response = self
            .build_request(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifyError::Model(e.to_string()))?;
        let response = Self::handle_error_response(response).await?;

        let json: Value = response
            .json()
            .await
            .map_err(|e| ClassifyError::Model(format!("malformed response: {e}")))?;
        let output = extract_responses_text(&json);
        debug!(strategy = "direct", "model output: {}", output);

        parse_labelled_output(&output, text)
    }

    async fn classify_tool_augmented(&self, text: &str) -> Result<(Category, f32), ClassifyError> {
        let system_prompt = format!(
            "You route support tickets. Based on the reference examples, classify the \
             customer's message into one of these categories: billing, technical, \
             delivery, or general. Respond with only the category name.\n\n{}",
            self.dataset.as_prompt_section(5)
        );

        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": text}
            ]
        });

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .build_request(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClassifyError::Model(e.to_string()))?;
        let response = Self::handle_error_response(response).await?;

        let json: Value = response
            .json()
            .await
            .map_err(|e| ClassifyError::Model(format!("malformed response: {e}")))?;
        let output = json
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|arr| arr.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|msg| msg.get("content"))
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        debug!(strategy = "tool_augmented", "model output: {}", output);

        let category = extract_category(&output)
            .ok_or_else(|| ClassifyError::Model(format!("no category label in {output:?}")))?;
        Ok((category, affinity_confidence(text, category)))
    }
}

#[async_trait]
impl Classifier for ModelClassifier {
    async fn classify(&self, text: &str) -> Result<(Category, f32), ClassifyError> {
        match self.strategy {
            ClassifyStrategy::Direct => self.classify_direct(text).await,
            ClassifyStrategy::ToolAugmented => self.classify_tool_augmented(text).await,
        }
    }
}

/// Structured label+confidence answer requested from the direct strategy
#[derive(Debug, Deserialize)]
struct LabelledAnswer {
    label: String,
    confidence: f32,
}

/// Collect the output text from a responses-API payload.
///
/// Prefers the flattened `output_text` field; falls back to walking the
/// `output` array's text parts.
fn extract_responses_text(json: &Value) -> String {
    if let Some(text) = json.get("output_text").and_then(|t| t.as_str()) {
        return text.trim().to_string();
    }

    json.get("output")
        .and_then(|o| o.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("content").and_then(|c| c.as_array()))
                .flatten()
                .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Parse the direct strategy's structured output.
///
/// The happy path is strict JSON. Models occasionally wrap the object in
/// prose, so parsing falls back to the label alone before giving up with
/// a malformed-response error.
fn parse_labelled_output(output: &str, source_text: &str) -> Result<(Category, f32), ClassifyError> {
    if let Some(raw) = extract_json_object(output) {
        if let Ok(answer) = serde_json::from_str::<LabelledAnswer>(raw) {
            if let Ok(category) = answer.label.parse::<Category>() {
                return Ok((category, answer.confidence.clamp(0.0, 1.0)));
            }
        }
    }

    match extract_category(output) {
        Some(category) => Ok((category, affinity_confidence(source_text, category))),
        None => Err(ClassifyError::Model(format!(
            "no category label in {output:?}"
        ))),
    }
}

/// Slice out the first `{...}` object in a response, if any
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Find the first category label mentioned in a response
fn extract_category(response: &str) -> Option<Category> {
    let response_lower = response.to_lowercase();
    Category::ALL
        .into_iter()
        .find(|category| response_lower.contains(category.as_str()))
}

/// Keyword-affinity confidence for answers that carry no numeric score.
/// More on-category keywords in the source text mean a higher score.
fn affinity_confidence(text: &str, category: Category) -> f32 {
    const AFFINITY: [(Category, &[&str]); 4] = [
        (
            Category::Billing,
            &["payment", "invoice", "charge", "refund", "billing", "account", "subscription", "fee"],
        ),
        (
            Category::Technical,
            &["error", "bug", "issue", "problem", "technical", "software", "hardware", "login", "access"],
        ),
        (
            Category::Delivery,
            &["shipping", "delivery", "order", "tracking", "package", "shipment", "arrive"],
        ),
        (Category::General, &["question", "inquiry", "help", "information"]),
    ];

    let text_lower = text.to_lowercase();
    let matches = AFFINITY
        .iter()
        .find(|(cat, _)| *cat == category)
        .map(|(_, keywords)| keywords.iter().filter(|kw| text_lower.contains(*kw)).count())
        .unwrap_or(0);

    if matches > 0 {
        (0.7 + matches as f32 * 0.05).min(0.95)
    } else {
        0.75
    }
}
