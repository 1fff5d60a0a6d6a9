use clap::Args;
use serde_json::Value;
use tome::{Collection, Document};
use tracing::debug;

use super::parse_json;

/// Arguments for the find command.
#[derive(Args, Clone, Default)]
pub struct FindArgs {
    /// Filter as JSON, e.g. '{"published_year": {"$gt": 2000}}'
    #[arg(long, value_parser = parse_json, default_value = "{}")]
    pub filter:  Value,
    /// Projection as JSON, e.g. '{"title": 1, "price": 1}'
    #[arg(long, value_parser = parse_json)]
    pub project: Option<Value>,
    /// Sort specification as JSON, e.g. '{"price": -1}'
    #[arg(long, value_parser = parse_json)]
    pub sort:    Option<Value>,
    /// Number of results to skip
    #[arg(long)]
    pub skip:    Option<usize>,
    /// Maximum number of results
    #[arg(long)]
    pub limit:   Option<usize>,
}

/// Execute the find command, returning the matching documents as an array.
pub fn run(collection: &Collection, args: &FindArgs) -> tome::Result<Value> {
    let mut cursor = collection.find(&args.filter)?;
    if let Some(ref sort) = args.sort {
        cursor = cursor.sort(sort)?;
    }
    if let Some(skip) = args.skip {
        cursor = cursor.skip(skip);
    }
    if let Some(limit) = args.limit {
        cursor = cursor.limit(limit);
    }
    if let Some(ref project) = args.project {
        cursor = cursor.projection(project)?;
    }

    let docs: Vec<Value> = cursor.iter().map(Document::into_value).collect();
    debug!("Find returned {} documents", docs.len());
    Ok(Value::Array(docs))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tome::seed;

    use super::*;

    fn books() -> Collection {
        let mut collection = Collection::new("books");
        collection.insert_many(seed::sample_books()).unwrap();
        collection
    }

    #[test]
    fn test_find_with_projection_and_sort() {
        let args = FindArgs {
            filter: json!({"genre": "Classic"}),
            project: Some(json!({"title": 1, "price": 1, "_id": 0})),
            sort: Some(json!({"price": 1})),
            ..FindArgs::default()
        };
        let result = run(&books(), &args).unwrap();
        assert_eq!(
            result,
            json!([
                {"title": "The Great Gatsby", "price": 8.99},
                {"title": "To Kill a Mockingbird", "price": 12.5}
            ])
        );
    }

    #[test]
    fn test_find_pagination() {
        let args = FindArgs {
            filter: json!({}),
            skip: Some(8),
            limit: Some(5),
            ..FindArgs::default()
        };
        assert_eq!(run(&books(), &args).unwrap().as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_find_invalid_filter() {
        let args = FindArgs {
            filter: json!({"price": {"$gt": [1]}}),
            ..FindArgs::default()
        };
        assert!(matches!(run(&books(), &args), Err(tome::TomeError::InvalidQuery { .. })));
    }
}
