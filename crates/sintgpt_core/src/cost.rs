//! crates/sintgpt_core/src/cost.rs
//!
//! Cost estimation from provider token counts. Purely informational: the
//! estimates are logged and reported, never enforced.

use crate::domain::TokenUsage;

/// Fixed billing rates in dollars per one million tokens.
#[derive(Debug, Clone, Copy)]
pub struct ModelRates {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

/// Rates for the vision model behind document analysis.
pub const VISION_RATES: ModelRates = ModelRates {
    input_per_million: 0.40,
    output_per_million: 1.60,
};

/// Rates for the text model behind poem generation. Reasoning tokens are
/// billed as output.
pub const POEM_RATES: ModelRates = ModelRates {
    input_per_million: 1.25,
    output_per_million: 10.0,
};

/// An estimated dollar cost split by direction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostEstimate {
    pub input_cost: f64,
    pub output_cost: f64,
}

impl CostEstimate {
    pub fn total(&self) -> f64 {
        self.input_cost + self.output_cost
    }
}

impl ModelRates {
    /// Estimates the cost of one or more calls' accumulated usage.
    pub fn estimate(&self, usage: &TokenUsage) -> CostEstimate {
        let output_tokens = usage.completion_tokens + usage.reasoning_tokens.unwrap_or(0);
        CostEstimate {
            input_cost: f64::from(usage.prompt_tokens) / 1_000_000.0 * self.input_per_million,
            output_cost: f64::from(output_tokens) / 1_000_000.0 * self.output_per_million,
        }
    }
}

/// Formats a dollar amount the way it appears on the wire, e.g. `$0.0123`.
pub fn format_dollars(amount: f64) -> String {
    format!("${:.4}", amount)
}
