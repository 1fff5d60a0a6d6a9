use clap::Args;
use serde_json::Value;
use tome::Collection;
use tracing::info;

use super::parse_json;

/// Arguments for the explain command.
#[derive(Args, Clone)]
pub struct ExplainArgs {
    /// Filter to explain, as JSON
    #[arg(long, value_parser = parse_json)]
    pub filter: Value,
    /// Index to create first, as JSON key specification (can be used multiple times)
    #[arg(long, value_parser = parse_json)]
    pub index:  Vec<Value>,
}

/// Execute the explain command, returning the plan and execution statistics.
pub fn run(collection: &mut Collection, args: &ExplainArgs) -> tome::Result<Value> {
    for keys in &args.index {
        let name = collection.create_index(keys)?;
        info!("Created index {}", name);
    }
    Ok(serde_json::to_value(collection.explain(&args.filter)?)?)
}
