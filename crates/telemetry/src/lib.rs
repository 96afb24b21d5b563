//! Model pricing and per-call cost estimation for Snoid.
//!
//! Every completion call the triage pipeline makes is priced against a
//! built-in pricing table and logged as a structured cost record.

pub mod cost;
pub mod pricing;

pub use cost::{CallPurpose, CostRecord, estimate_cost};
pub use pricing::{ModelPricing, PricingTable, canonicalize_model};
