//! Reference dataset for few-shot grounding
//!
//! The tool-augmented classification strategy grounds the model with
//! example ticket texts per category. Defaults are compiled in; a larger
//! set can be loaded from a two-column CSV (`category,text`).

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::{bail, Context, Result};

use super::Category;

/// Built-in routing examples, category then text
const DEFAULT_EXAMPLES: &[(Category, &str)] = &[
    (Category::Billing, "I was charged twice for my subscription this month"),
    (Category::Billing, "Please send me an invoice for my last payment"),
    (Category::Billing, "I want a refund, the fee is wrong"),
    (Category::Technical, "The app crashes with an error when I log in"),
    (Category::Technical, "I cannot access my account, login is broken"),
    (Category::Technical, "There is a bug in the software update"),
    (Category::Delivery, "My package never arrived, tracking shows no movement"),
    (Category::Delivery, "The order was shipped to the wrong address"),
    (Category::Delivery, "When will my shipment arrive?"),
    (Category::General, "I have a question about your opening hours"),
    (Category::General, "Where can I find more information about the service?"),
];

/// Example ticket texts grouped per category
#[derive(Debug, Clone)]
pub struct ReferenceDataset {
    examples: BTreeMap<&'static str, Vec<String>>,
}

impl Default for ReferenceDataset {
    fn default() -> Self {
        let mut examples: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
        for (category, text) in DEFAULT_EXAMPLES {
            examples.entry(category.as_str()).or_default().push((*text).to_string());
        }
        Self { examples }
    }
}

impl ReferenceDataset {
    /// Load from a two-column CSV: `category,text`. A header row is
    /// skipped if present. Unknown categories are rejected rather than
    /// silently dropped.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read reference dataset {}", path.display()))?;

        let mut examples: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
        for (lineno, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((first, rest)) = line.split_once(',') else {
                bail!("line {}: expected `category,text`", lineno + 1);
            };
            if lineno == 0 && first.eq_ignore_ascii_case("category") {
                continue;
            }
            let Ok(category) = first.parse::<Category>() else {
                bail!("line {}: unknown category {:?}", lineno + 1, first);
            };
            let text = rest.trim().trim_matches('"');
            if !text.is_empty() {
                examples.entry(category.as_str()).or_default().push(text.to_string());
            }
        }

        if examples.is_empty() {
            bail!("reference dataset {} contains no examples", path.display());
        }
        Ok(Self { examples })
    }

    /// Render the dataset as a prompt section, capped per category so a
    /// large CSV cannot blow up the request.
    pub fn as_prompt_section(&self, per_category: usize) -> String {
        let mut out = String::from("Reference examples of already-routed tickets:\n");
        for (category, texts) in &self.examples {
            for text in texts.iter().take(per_category) {
                let _ = writeln!(out, "- [{category}] {text}");
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}
