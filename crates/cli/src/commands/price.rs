//! `snoid price` — Show the rate and estimated cost for a model.

use snoid_config::BotConfig;
use snoid_telemetry::{canonicalize_model, estimate_cost};

pub fn run(
    config: &BotConfig,
    model: &str,
    input_tokens: u32,
    output_tokens: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", report(config, model, input_tokens, output_tokens));
    Ok(())
}

fn report(config: &BotConfig, model: &str, input_tokens: u32, output_tokens: u32) -> String {
    let table = super::pricing_table(config);
    let name = canonicalize_model(model);
    let Some(pricing) = table.get(model) else {
        return format!(
            "No pricing known for '{name}'; calls to it are costed at $0.\nKnown models: {}",
            table.models().join(", ")
        );
    };

    let cost = estimate_cost(&table, model, input_tokens, output_tokens);
    format!(
        "{name}\n  input:  ${:.6} / 1K tokens\n  output: ${:.6} / 1K tokens\n  \
         {input_tokens} in + {output_tokens} out = ${cost:.6}",
        pricing.input_per_1k, pricing.output_per_1k
    )
}
