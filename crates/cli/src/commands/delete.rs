use clap::Args;
use serde_json::Value;
use tome::Collection;
use tracing::info;

use super::parse_json;

/// Arguments for the delete command.
#[derive(Args, Clone)]
pub struct DeleteArgs {
    /// Filter selecting the documents to delete, as JSON
    #[arg(long, value_parser = parse_json)]
    pub filter: Value,
    /// Delete every matching document instead of the first
    #[arg(long)]
    pub many:   bool,
}

/// Execute the delete command, returning the deleted count.
pub fn run(collection: &mut Collection, args: &DeleteArgs) -> tome::Result<Value> {
    let result = if args.many {
        collection.delete_many(&args.filter)?
    }
    else {
        collection.delete_one(&args.filter)?
    };
    info!("Deleted {} documents", result.deleted_count);
    Ok(serde_json::to_value(result)?)
}
