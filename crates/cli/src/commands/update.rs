use clap::Args;
use serde_json::Value;
use tome::Collection;
use tracing::info;

use super::parse_json;

/// Arguments for the update command.
#[derive(Args, Clone)]
pub struct UpdateArgs {
    /// Filter selecting the documents to update, as JSON
    #[arg(long, value_parser = parse_json)]
    pub filter:  Value,
    /// Update operators as JSON, e.g. '{"$set": {"price": 11.5}}'
    #[arg(long, value_parser = parse_json)]
    pub changes: Value,
    /// Update every matching document instead of the first
    #[arg(long)]
    pub many:    bool,
}

/// Execute the update command, returning the matched and modified counts.
pub fn run(collection: &mut Collection, args: &UpdateArgs) -> tome::Result<Value> {
    let result = if args.many {
        collection.update_many(&args.filter, &args.changes)?
    }
    else {
        collection.update_one(&args.filter, &args.changes)?
    };
    info!(
        "Matched {} and modified {} documents",
        result.matched_count, result.modified_count
    );
    Ok(serde_json::to_value(result)?)
}
