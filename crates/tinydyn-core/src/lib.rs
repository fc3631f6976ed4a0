//! # tinydyn
//!
//! A minimal single-node key-value store with a DynamoDB-style item model.
//!
//! Items are schemaless maps of attribute values addressed by a hash key and
//! an optional range key. Each item is limited to 64 KiB. Values are numbers,
//! strings, binaries, or non-empty sets of one of those. Anything else
//! (lists, maps, booleans, nulls) is rejected up front; callers can freeze
//! such data into a binary value themselves.
//!
//! Tables live in memory, sharded across lock-protected partitions. An
//! optional snapshot file makes a store durable across restarts via
//! [`TinyDynDB::checkpoint`](api::TinyDynDB::checkpoint).
//!
//! ## Quick Start
//!
//! ```
//! use tinydyn_core::api::{AccessPath, FilterExpr, TinyDynDB};
//! use tinydyn_core::types::KeyType;
//! use serde_json::json;
//!
//! let db = TinyDynDB::new();
//!
//! db.create_table("products")
//!     .key("id", KeyType::Number)
//!     .execute()
//!     .unwrap();
//!
//! db.put_json("products", json!({"id": 101, "price": 2})).unwrap();
//! db.put_json("products", json!({"id": 103, "price": 2000})).unwrap();
//!
//! // Full scan with a filter.
//! let expensive = db
//!     .scan("products")
//!     .filter(FilterExpr::gt(FilterExpr::attr("price"), FilterExpr::literal(1000)))
//!     .execute()
//!     .unwrap();
//! assert_eq!(expensive.iter().count(), 1);
//!
//! // Hash-key equality goes through the key index.
//! let one = db
//!     .query("products")
//!     .filter(FilterExpr::eq(FilterExpr::attr("id"), FilterExpr::literal(101)))
//!     .execute()
//!     .unwrap();
//! assert_eq!(one.access_path(), AccessPath::KeyLookup);
//!
//! let item = db.get_item("products").hash_key(103).execute().unwrap();
//! assert!(item.is_some());
//! ```

pub mod api;
pub mod catalog;
pub mod config;
pub mod encoding;
pub mod error;
pub mod storage;
pub mod types;
