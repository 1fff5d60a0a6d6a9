use clap::Args;
use serde_json::Value;
use tome::{Collection, Document};
use tracing::debug;

use super::parse_json;

/// Arguments for the aggregate command.
#[derive(Args, Clone)]
pub struct AggregateArgs {
    /// Pipeline as a JSON array of stages, e.g. '[{"$group": {"_id": "$genre", "count": {"$sum": 1}}}]'
    #[arg(long, value_parser = parse_json)]
    pub pipeline: Value,
}

/// Execute the aggregate command, returning the pipeline output as an array.
pub fn run(collection: &Collection, args: &AggregateArgs) -> tome::Result<Value> {
    let results = collection.aggregate(&args.pipeline)?;
    debug!("Pipeline produced {} documents", results.len());
    Ok(Value::Array(results.into_iter().map(Document::into_value).collect()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tome::seed;

    use super::*;

    #[test]
    fn test_aggregate_count_in_stock() {
        let mut collection = Collection::new("books");
        collection.insert_many(seed::sample_books()).unwrap();

        let args = AggregateArgs {
            pipeline: json!([{"$match": {"in_stock": true}}, {"$count": "inStock"}]),
        };
        assert_eq!(run(&collection, &args).unwrap(), json!([{"inStock": 8}]));

        let args = AggregateArgs {
            pipeline: json!({"$count": "n"}),
        };
        assert!(run(&collection, &args).is_err());
    }
}
