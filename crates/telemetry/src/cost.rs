//! Per-call cost estimation.
//!
//! A [`CostRecord`] is derived from one completion call and logged. It is
//! never stored or summed across calls.

use serde::{Deserialize, Serialize};

use crate::pricing::PricingTable;

/// Decimal places kept in estimated costs.
const COST_PRECISION: i32 = 6;

/// Why a completion call was made.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallPurpose {
    /// Cheap-tier yes/no screening.
    Gate,
    /// Expensive-tier rebuttal.
    Critique,
    /// Expensive-tier greeting acknowledgement.
    Presence,
}

impl std::fmt::Display for CallPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gate => write!(f, "gate"),
            Self::Critique => write!(f, "critique"),
            Self::Presence => write!(f, "presence"),
        }
    }
}

/// Estimated USD cost of a call, rounded to 6 decimal places.
///
/// `input/1000 * input_rate + output/1000 * output_rate`. Unknown models
/// cost exactly 0.
pub fn estimate_cost(
    table: &PricingTable,
    model: &str,
    input_tokens: u32,
    output_tokens: u32,
) -> f64 {
    let (input_rate, output_rate) = table.price_for(model);
    let raw = f64::from(input_tokens) / 1000.0 * input_rate
        + f64::from(output_tokens) / 1000.0 * output_rate;
    round_to(raw, COST_PRECISION)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Cost of one completion call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub purpose: CallPurpose,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost_usd: f64,
}

impl CostRecord {
    /// Price a finished call.
    pub fn new(
        table: &PricingTable,
        purpose: CallPurpose,
        model: &str,
        input_tokens: u32,
        output_tokens: u32,
    ) -> Self {
        Self {
            purpose,
            model: model.to_string(),
            input_tokens,
            output_tokens,
            cost_usd: estimate_cost(table, model, input_tokens, output_tokens),
        }
    }

    /// Emit the record as a structured log event.
    pub fn log(&self, message_id: &str) {
        tracing::info!(
            message_id = %message_id,
            purpose = %self.purpose,
            model = %self.model,
            input_tokens = self.input_tokens,
            output_tokens = self.output_tokens,
            cost_usd = self.cost_usd,
            "Completion cost"
        );
    }
}
