use serde_json::{json, Value};
use tome::Collection;
use tracing::{debug, info};

use super::{
    aggregate::{self, AggregateArgs},
    delete::{self, DeleteArgs},
    explain::{self, ExplainArgs},
    find::{self, FindArgs},
    update::{self, UpdateArgs},
};

/// One query of the sample script.
enum Step {
    Find(FindArgs),
    Update(UpdateArgs),
    Delete(DeleteArgs),
    Aggregate(AggregateArgs),
    CreateIndex(Value),
    Explain(ExplainArgs),
}

/// The sample query script over the books collection, in order.
fn steps() -> Vec<(&'static str, Step)> {
    let matching = |filter: Value| {
        FindArgs {
            filter,
            ..FindArgs::default()
        }
    };
    let sorted_by_price = |direction: i64| {
        FindArgs {
            filter: json!({}),
            project: Some(json!({"title": 1, "price": 1})),
            sort: Some(json!({"price": direction})),
            ..FindArgs::default()
        }
    };
    let page = |skip: usize| {
        FindArgs {
            filter: json!({}),
            skip: Some(skip),
            limit: Some(5),
            ..FindArgs::default()
        }
    };

    vec![
        ("Books in the Fantasy genre", Step::Find(matching(json!({"genre": "Fantasy"})))),
        (
            "Books published after 2000",
            Step::Find(matching(json!({"published_year": {"$gt": 2000}}))),
        ),
        ("Books by George Orwell", Step::Find(matching(json!({"author": "George Orwell"})))),
        (
            "Update the price of 1984",
            Step::Update(UpdateArgs {
                filter:  json!({"title": "1984"}),
                changes: json!({"$set": {"price": 11.5}}),
                many:    false,
            }),
        ),
        (
            "Delete Pride and Prejudice",
            Step::Delete(DeleteArgs {
                filter: json!({"title": "Pride and Prejudice"}),
                many:   false,
            }),
        ),
        (
            "In stock and published after 2010",
            Step::Find(matching(json!({"in_stock": true, "published_year": {"$gt": 2010}}))),
        ),
        (
            "Title, author and price only",
            Step::Find(FindArgs {
                filter: json!({}),
                project: Some(json!({"title": 1, "author": 1, "price": 1, "_id": 0})),
                ..FindArgs::default()
            }),
        ),
        ("Sorted by price, ascending", Step::Find(sorted_by_price(1))),
        ("Sorted by price, descending", Step::Find(sorted_by_price(-1))),
        ("Page 1", Step::Find(page(0))),
        ("Page 2", Step::Find(page(5))),
        (
            "Average price by genre",
            Step::Aggregate(AggregateArgs {
                pipeline: json!([
                    {"$group": {"_id": "$genre", "avgPrice": {"$avg": "$price"}, "count": {"$sum": 1}}},
                    {"$sort": {"avgPrice": -1}}
                ]),
            }),
        ),
        (
            "Author with the most books",
            Step::Aggregate(AggregateArgs {
                pipeline: json!([
                    {"$group": {"_id": "$author", "totalBooks": {"$sum": 1}}},
                    {"$sort": {"totalBooks": -1}},
                    {"$limit": 1}
                ]),
            }),
        ),
        (
            "Books by publication decade",
            Step::Aggregate(AggregateArgs {
                pipeline: json!([
                    {"$addFields": {"decade": {"$concat": [
                        {"$toString": {"$multiply": [{"$floor": {"$divide": ["$published_year", 10]}}, 10]}},
                        "s"
                    ]}}},
                    {"$group": {"_id": "$decade", "count": {"$sum": 1}}},
                    {"$sort": {"_id": 1}}
                ]),
            }),
        ),
        ("Index on title", Step::CreateIndex(json!({"title": 1}))),
        (
            "Compound index on author and published_year",
            Step::CreateIndex(json!({"author": 1, "published_year": -1})),
        ),
        (
            "Explain a title lookup",
            Step::Explain(ExplainArgs {
                filter: json!({"title": "The Hobbit"}),
                index:  Vec::new(),
            }),
        ),
    ]
}

/// Execute the script command, returning each heading with its result.
pub fn run(collection: &mut Collection) -> tome::Result<Vec<(String, Value)>> {
    let steps = steps();
    info!("Replaying {} queries against collection {}", steps.len(), collection.name());

    let mut results = Vec::with_capacity(steps.len());
    for (heading, step) in steps {
        debug!("Running script step: {}", heading);
        let result = match step {
            Step::Find(ref args) => find::run(collection, args)?,
            Step::Update(ref args) => update::run(collection, args)?,
            Step::Delete(ref args) => delete::run(collection, args)?,
            Step::Aggregate(ref args) => aggregate::run(collection, args)?,
            Step::CreateIndex(ref keys) => json!({"createdIndex": collection.create_index(keys)?}),
            Step::Explain(ref args) => explain::run(collection, args)?,
        };
        results.push((heading.to_owned(), result));
    }
    Ok(results)
}
