//! Tome: a tiny in-process document store.
//!
//! Documents are JSON objects kept in named collections. Collections support
//! Mongo-style filters, projections, sorting and pagination through a lazy
//! [`Cursor`], field updates, deletes, aggregation pipelines and single-field
//! lookup indexes.
//!
//! ```rust
//! use serde_json::json;
//! use tome::{seed, Store};
//!
//! let mut store = Store::new();
//! let books = store.collection_mut(seed::BOOKS_COLLECTION).unwrap();
//! books.insert_many(seed::sample_books()).unwrap();
//!
//! let fantasy = books
//!     .find(&json!({"genre": "Fantasy"}))
//!     .unwrap()
//!     .projection(&json!({"title": 1, "_id": 0}))
//!     .unwrap()
//!     .to_vec();
//! assert_eq!(fantasy.len(), 2);
//! ```

pub mod aggregation;
pub mod collection;
pub mod comparison;
pub mod document;
pub mod error;
pub mod expression;
pub mod filtering;
pub mod index;
pub mod projection;
pub mod query;
pub mod seed;
pub mod store;
pub mod update;

pub use aggregation::{Accumulator, Pipeline, Stage};
pub use collection::{Collection, Cursor, DeleteResult, Explain, Plan, UpdateResult};
pub use document::Document;
pub use error::{Result, TomeError};
pub use expression::Expr;
pub use index::IndexSpec;
pub use projection::Projection;
pub use query::{Filter, Operator, Query, QueryBuilder, SortOrder};
pub use store::Store;
pub use update::Update;
