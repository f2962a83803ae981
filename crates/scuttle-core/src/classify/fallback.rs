//! Keyword fallback classifier
//!
//! Deterministic, no network. Used when the model classifier is
//! unavailable or has exhausted its retries.

use crate::constants::classify::FALLBACK_CONFIDENCE;

use super::{Category, ClassificationResult};

/// Keyword table per category. Matching is case-insensitive substring
/// containment, so "refunded" counts as a "refund" hit.
const KEYWORDS: [(Category, &[&str]); 4] = [
    (
        Category::Billing,
        &[
            "payment",
            "invoice",
            "charge",
            "refund",
            "billing",
            "subscription",
            "fee",
            "bill",
            "paid",
            "money",
        ],
    ),
    (
        Category::Technical,
        &[
            "error",
            "bug",
            "issue",
            "problem",
            "technical",
            "software",
            "hardware",
            "login",
            "access",
            "crash",
            "broken",
            "not working",
        ],
    ),
    (
        Category::Delivery,
        &[
            "shipping",
            "delivery",
            "order",
            "tracking",
            "package",
            "shipment",
            "arrive",
            "shipped",
            "dispatch",
            "transit",
        ],
    ),
    (
        Category::General,
        &["question", "inquiry", "help", "information", "support"],
    ),
];

/// Deterministic lexical classifier
#[derive(Debug, Default, Clone)]
pub struct KeywordFallbackClassifier;

impl KeywordFallbackClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify by counting keyword hits per category.
    ///
    /// The highest score wins; ties, including the all-zero case, resolve
    /// to `general`. Every result carries the fixed fallback confidence.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        let text_lower = text.to_lowercase();

        let mut best = Category::General;
        let mut best_score = 0usize;
        for (category, keywords) in KEYWORDS {
            let score = keywords.iter().filter(|kw| text_lower.contains(*kw)).count();
            // Strictly-greater keeps ties on the earlier winner; a tie for
            // the top score must not pick a side, so track it explicitly.
            if score > best_score {
                best = category;
                best_score = score;
            } else if score == best_score && score > 0 && category != best {
                // Two categories tied for the lead: no winner.
                best = Category::General;
            }
        }

        ClassificationResult::fallback(best, FALLBACK_CONFIDENCE)
    }
}
