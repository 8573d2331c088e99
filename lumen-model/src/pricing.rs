//! Canonical per-provider token pricing.
//!
//! Every provider prices usage through one [`PricingTable`] instead of
//! computing cost at the call site. Rates are USD per million tokens and are
//! matched by the longest model-name prefix registered for the provider.

use lumen_core::{ProviderKind, TokenUsage};

/// Input and output rates in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelRate {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelRate {
    pub const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self { input_per_million, output_per_million }
    }

    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        (usage.input_tokens as f64 * self.input_per_million
            + usage.output_tokens as f64 * self.output_per_million)
            / 1_000_000.0
    }
}

#[derive(Debug, Clone)]
struct PricingEntry {
    provider: ProviderKind,
    model_prefix: String,
    rate: ModelRate,
}

/// Lookup table from `(provider, model)` to [`ModelRate`].
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    entries: Vec<PricingEntry>,
}

const OPENAI_RATES: &[(&str, ModelRate)] = &[
    ("gpt-4o-mini", ModelRate::new(0.15, 0.60)),
    ("gpt-4o", ModelRate::new(2.50, 10.00)),
    ("gpt-4.1-nano", ModelRate::new(0.10, 0.40)),
    ("gpt-4.1-mini", ModelRate::new(0.40, 1.60)),
    ("gpt-4.1", ModelRate::new(2.00, 8.00)),
    ("gpt-4-turbo", ModelRate::new(10.00, 30.00)),
    ("gpt-3.5-turbo", ModelRate::new(0.50, 1.50)),
    ("o3-mini", ModelRate::new(1.10, 4.40)),
];

const ANTHROPIC_RATES: &[(&str, ModelRate)] = &[
    ("claude-3-haiku", ModelRate::new(0.25, 1.25)),
    ("claude-3-5-haiku", ModelRate::new(0.80, 4.00)),
    ("claude-3-5-sonnet", ModelRate::new(3.00, 15.00)),
    ("claude-3-7-sonnet", ModelRate::new(3.00, 15.00)),
    ("claude-sonnet-4", ModelRate::new(3.00, 15.00)),
    ("claude-3-opus", ModelRate::new(15.00, 75.00)),
    ("claude-opus-4", ModelRate::new(15.00, 75.00)),
];

impl PricingTable {
    /// An empty table; every lookup prices at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Published list prices for the OpenAI and Anthropic model families.
    ///
    /// Azure deployments are priced like the OpenAI model they are named after.
    /// Custom endpoints have no default rates.
    pub fn standard() -> Self {
        let mut table = Self::new();
        for (prefix, rate) in OPENAI_RATES {
            table = table
                .with_rate(ProviderKind::OpenAI, *prefix, *rate)
                .with_rate(ProviderKind::Azure, *prefix, *rate);
        }
        for (prefix, rate) in ANTHROPIC_RATES {
            table = table.with_rate(ProviderKind::Anthropic, *prefix, *rate);
        }
        table
    }

    /// Register a rate; a later entry with the same prefix replaces the earlier one.
    pub fn with_rate(
        mut self,
        provider: ProviderKind,
        model_prefix: impl Into<String>,
        rate: ModelRate,
    ) -> Self {
        let model_prefix = model_prefix.into();
        self.entries.retain(|e| !(e.provider == provider && e.model_prefix == model_prefix));
        self.entries.push(PricingEntry { provider, model_prefix, rate });
        self
    }

    pub fn rate_for(&self, provider: ProviderKind, model: &str) -> Option<ModelRate> {
        self.entries
            .iter()
            .filter(|e| e.provider == provider && model.starts_with(e.model_prefix.as_str()))
            .max_by_key(|e| e.model_prefix.len())
            .map(|e| e.rate)
    }

    /// Cost in USD; zero when the model has no registered rate.
    pub fn cost(&self, provider: ProviderKind, model: &str, usage: &TokenUsage) -> f64 {
        self.rate_for(provider, model).map(|rate| rate.cost(usage)).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_prefix_wins() {
        let table = PricingTable::standard();
        let mini = table.rate_for(ProviderKind::OpenAI, "gpt-4o-mini-2024-07-18").unwrap();
        assert_eq!(mini, ModelRate::new(0.15, 0.60));

        let full = table.rate_for(ProviderKind::OpenAI, "gpt-4o-2024-08-06").unwrap();
        assert_eq!(full, ModelRate::new(2.50, 10.00));
    }

    #[test]
    fn test_cost_computation() {
        let table = PricingTable::standard();
        let usage = TokenUsage::new(1_000_000, 500_000);
        let cost = table.cost(ProviderKind::Anthropic, "claude-3-5-sonnet-latest", &usage);
        assert!((cost - 10.5).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_model_is_free() {
        let table = PricingTable::standard();
        let usage = TokenUsage::new(1000, 1000);
        assert_eq!(table.cost(ProviderKind::Custom, "llama3", &usage), 0.0);
        assert_eq!(table.cost(ProviderKind::OpenAI, "davinci", &usage), 0.0);
    }

    #[test]
    fn test_override_rate() {
        let table = PricingTable::standard().with_rate(
            ProviderKind::OpenAI,
            "gpt-4o",
            ModelRate::new(1.0, 1.0),
        );
        let rate = table.rate_for(ProviderKind::OpenAI, "gpt-4o").unwrap();
        assert_eq!(rate, ModelRate::new(1.0, 1.0));
    }

    #[test]
    fn test_azure_mirrors_openai() {
        let table = PricingTable::standard();
        assert_eq!(
            table.rate_for(ProviderKind::Azure, "gpt-4o-mini"),
            table.rate_for(ProviderKind::OpenAI, "gpt-4o-mini")
        );
    }
}
