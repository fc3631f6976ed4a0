//! Public API: database handle, builder-pattern reads and writes, filter expressions, and query planning.

pub mod builders;
pub mod database;
pub mod filter;
pub mod key_utils;
pub mod query;

pub use builders::{DeleteItemBuilder, GetItemBuilder, QueryBuilder, ScanBuilder, TableBuilder};
pub use database::TinyDynDB;
pub use filter::FilterExpr;
pub use query::{AccessPath, ItemSequence, Predicate};
