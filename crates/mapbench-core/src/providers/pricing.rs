//! Static price table for cost estimates.

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPricing {
    const fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    pub fn calculate_cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 * self.input_per_million
            + output_tokens as f64 * self.output_per_million)
            / 1_000_000.0
    }
}

/// Model-name families. The longest family contained in the model name wins,
/// so `gpt-4o-mini` is not priced as `gpt-4o`.
const PRICE_TABLE: &[(&str, ModelPricing)] = &[
    ("gpt-4o", ModelPricing::new(2.5, 10.0)),
    ("gpt-4o-mini", ModelPricing::new(0.15, 0.6)),
    ("gpt-4.1", ModelPricing::new(2.0, 8.0)),
    ("gpt-4.1-mini", ModelPricing::new(0.4, 1.6)),
    ("gpt-4.1-nano", ModelPricing::new(0.1, 0.4)),
    ("gpt-4-turbo", ModelPricing::new(10.0, 30.0)),
    ("o1", ModelPricing::new(15.0, 60.0)),
    ("o3-mini", ModelPricing::new(1.1, 4.4)),
    ("gemini-2.0-flash", ModelPricing::new(0.1, 0.4)),
    ("gemini-1.5-pro", ModelPricing::new(1.25, 5.0)),
    ("gemini-1.5-flash", ModelPricing::new(0.075, 0.3)),
    ("gemini-2.5-pro", ModelPricing::new(1.25, 10.0)),
    ("gemini-2.5-flash", ModelPricing::new(0.3, 2.5)),
];

pub fn lookup(model_name: &str) -> Option<ModelPricing> {
    let name = model_name.to_lowercase();
    PRICE_TABLE
        .iter()
        .filter(|(family, _)| name.contains(family))
        .max_by_key(|(family, _)| family.len())
        .map(|(_, pricing)| *pricing)
}

/// Estimated USD cost; unknown models cost nothing.
pub fn estimate_cost(model_name: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    lookup(model_name)
        .map(|p| p.calculate_cost(input_tokens, output_tokens))
        .unwrap_or(0.0)
}
