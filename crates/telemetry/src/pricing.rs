//! Built-in pricing table for the OpenAI model tiers.
//!
//! Prices are in USD per 1,000 tokens. Each model has an input and output
//! price. Custom pricing can be layered on at startup from TOML config; the
//! table is immutable afterwards and shared read-only between message tasks.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-1K-token pricing for a model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Price per 1K input tokens in USD.
    pub input_per_1k: f64,
    /// Price per 1K output tokens in USD.
    pub output_per_1k: f64,
}

impl ModelPricing {
    /// Create a new pricing entry.
    pub const fn new(input_per_1k: f64, output_per_1k: f64) -> Self {
        Self {
            input_per_1k,
            output_per_1k,
        }
    }

    /// Pricing used for models the table does not know.
    pub const FREE: Self = Self::new(0.0, 0.0);
}

/// Normalize a free-form model name for lookup.
///
/// Lower-cases, turns whitespace and underscores into hyphens, collapses
/// runs of hyphens and strips hyphens from both ends:
/// `" GPT_4o  Mini "` → `"gpt-4o-mini"`.
pub fn canonicalize_model(model: &str) -> String {
    let mut out = String::with_capacity(model.len());
    for ch in model.trim().chars() {
        let ch = if ch.is_whitespace() || ch == '_' {
            '-'
        } else {
            ch
        };
        if ch == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.extend(ch.to_lowercase());
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// Strip a trailing `-YYYY-MM-DD` snapshot date, if present.
fn strip_snapshot_date(model: &str) -> Option<&str> {
    let split = model.len().checked_sub(11)?;
    if !model.is_char_boundary(split) {
        return None;
    }
    let (base, date) = model.split_at(split);
    let bytes = date.as_bytes();
    let is_date = bytes[0] == b'-'
        && bytes[5] == b'-'
        && bytes[8] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| matches!(i, 0 | 5 | 8) || b.is_ascii_digit());
    (is_date && !base.is_empty()).then_some(base)
}

/// Pricing lookup table with built-in defaults and custom overrides.
#[derive(Debug, Clone)]
pub struct PricingTable {
    prices: HashMap<String, ModelPricing>,
}

impl PricingTable {
    /// Create a pricing table with built-in model prices.
    pub fn with_defaults() -> Self {
        let mut prices = HashMap::new();

        // ── GPT-4o family ──────────────────────────────────────────
        prices.insert("gpt-4o".into(), ModelPricing::new(0.0025, 0.01));
        prices.insert("gpt-4o-mini".into(), ModelPricing::new(0.00015, 0.0006));
        prices.insert("chatgpt-4o-latest".into(), ModelPricing::new(0.005, 0.015));

        // ── GPT-4.1 family ─────────────────────────────────────────
        prices.insert("gpt-4.1".into(), ModelPricing::new(0.002, 0.008));
        prices.insert("gpt-4.1-mini".into(), ModelPricing::new(0.0004, 0.0016));
        prices.insert("gpt-4.1-nano".into(), ModelPricing::new(0.0001, 0.0004));

        // ── Reasoning models ───────────────────────────────────────
        prices.insert("o1".into(), ModelPricing::new(0.015, 0.06));
        prices.insert("o1-mini".into(), ModelPricing::new(0.0011, 0.0044));
        prices.insert("o3".into(), ModelPricing::new(0.002, 0.008));
        prices.insert("o3-mini".into(), ModelPricing::new(0.0011, 0.0044));
        prices.insert("o4-mini".into(), ModelPricing::new(0.0011, 0.0044));

        // ── Legacy ─────────────────────────────────────────────────
        prices.insert("gpt-4-turbo".into(), ModelPricing::new(0.01, 0.03));
        prices.insert("gpt-3.5-turbo".into(), ModelPricing::new(0.0005, 0.0015));

        Self { prices }
    }

    /// Create an empty pricing table.
    pub fn empty() -> Self {
        Self {
            prices: HashMap::new(),
        }
    }

    /// Add or replace pricing for a model. The name is canonicalized.
    pub fn with_price(mut self, model: &str, pricing: ModelPricing) -> Self {
        self.prices.insert(canonicalize_model(model), pricing);
        self
    }

    /// Layer several overrides on top of this table.
    pub fn with_overrides<'a, I>(self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, ModelPricing)>,
    {
        overrides
            .into_iter()
            .fold(self, |table, (model, pricing)| table.with_price(model, pricing))
    }

    /// Look up pricing for a model. Returns None if not found.
    ///
    /// Tries the canonical name, then without an `openai/`-style provider
    /// prefix, then without a trailing snapshot date
    /// (`gpt-4o-mini-2024-07-18` → `gpt-4o-mini`).
    pub fn get(&self, model: &str) -> Option<ModelPricing> {
        let canonical = canonicalize_model(model);
        let bare = canonical.rsplit('/').next().unwrap_or(&canonical);

        [canonical.as_str(), bare]
            .into_iter()
            .flat_map(|name| [Some(name), strip_snapshot_date(name)])
            .flatten()
            .find_map(|name| self.prices.get(name).copied())
    }

    /// `(input_rate, output_rate)` per 1K tokens; `(0, 0)` for unknown models.
    pub fn price_for(&self, model: &str) -> (f64, f64) {
        let pricing = self.get(model).unwrap_or(ModelPricing::FREE);
        (pricing.input_per_1k, pricing.output_per_1k)
    }

    /// List all known model names.
    pub fn models(&self) -> Vec<String> {
        let mut names: Vec<String> = self.prices.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of models in the pricing table.
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_has_models() {
        let table = PricingTable::with_defaults();
        assert!(table.len() >= 10);
        assert!(!table.is_empty());
    }

    #[test]
    fn canonicalization_rules() {
        assert_eq!(canonicalize_model("GPT-4o"), "gpt-4o");
        assert_eq!(canonicalize_model(" gpt_4o  mini "), "gpt-4o-mini");
        assert_eq!(canonicalize_model("gpt--4o___mini"), "gpt-4o-mini");
        assert_eq!(canonicalize_model("-o3-mini-"), "o3-mini");
        assert_eq!(canonicalize_model(""), "");
    }

    #[test]
    fn known_model_rates() {
        let table = PricingTable::with_defaults();
        assert_eq!(table.price_for("gpt-4o"), (0.0025, 0.01));
        assert_eq!(table.price_for("gpt-4o-mini"), (0.00015, 0.0006));
    }

    #[test]
    fn differently_spelled_names_share_rates() {
        let table = PricingTable::with_defaults();
        let expected = table.price_for("gpt-4o-mini");
        for spelling in ["GPT-4O-MINI", "gpt_4o_mini", "gpt 4o  mini", "  Gpt-4o--Mini "] {
            assert_eq!(table.price_for(spelling), expected, "{spelling}");
            assert_eq!(table.price_for(spelling), table.price_for(spelling));
        }
    }

    #[test]
    fn provider_prefix_and_snapshot_are_stripped() {
        let table = PricingTable::with_defaults();
        assert_eq!(table.price_for("openai/gpt-4o"), (0.0025, 0.01));
        assert_eq!(table.price_for("gpt-4o-mini-2024-07-18"), (0.00015, 0.0006));
        assert_eq!(table.price_for("openai/gpt-4o-2024-08-06"), (0.0025, 0.01));
    }

    #[test]
    fn unknown_model_is_free() {
        let table = PricingTable::with_defaults();
        assert_eq!(table.price_for("unknown/model-xyz"), (0.0, 0.0));
        assert_eq!(table.price_for(""), (0.0, 0.0));
        assert!(table.get("gpt-4o-turbo-ultra").is_none());
    }

    #[test]
    fn snapshot_detection() {
        assert_eq!(strip_snapshot_date("gpt-4o-2024-08-06"), Some("gpt-4o"));
        assert_eq!(strip_snapshot_date("gpt-4o"), None);
        assert_eq!(strip_snapshot_date("-2024-08-06"), None);
        assert_eq!(strip_snapshot_date("gpt-4o-20x4-08-06"), None);
    }

    #[test]
    fn overrides_are_canonicalized() {
        let table = PricingTable::empty().with_overrides([
            ("House_Model", ModelPricing::new(1.0, 2.0)),
            ("gpt-4o", ModelPricing::new(5.0, 20.0)),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.price_for("house model"), (1.0, 2.0));
        assert_eq!(table.price_for("GPT-4o"), (5.0, 20.0));
    }

    #[test]
    fn list_models_sorted() {
        let table = PricingTable::with_defaults();
        let models = table.models();
        assert!(models.contains(&"gpt-4o".to_string()));
        assert!(models.windows(2).all(|w| w[0] <= w[1]));
    }
}
