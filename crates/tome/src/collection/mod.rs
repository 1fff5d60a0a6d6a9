/// Collection aggregation operations.
pub mod aggregation;
/// Core collection implementation.
pub mod coll;
/// Lazy, restartable query results.
pub mod cursor;
/// Index management and lookup planning.
pub mod indexes;
/// Insert, update and delete operations.
pub mod operations;
/// Collection query operations.
pub mod query;

pub use coll::*;
pub use cursor::Cursor;
pub use indexes::{Explain, Plan};
pub use operations::{DeleteResult, UpdateResult};
