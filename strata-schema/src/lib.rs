//! # Strata Schema
//!
//! The schema engine: for every indexed document it infers or enforces a
//! hierarchical field specification, serialises leaf values into posting
//! terms and value slots, assigns accuracy-bucket terms, resolves dynamic
//! UUID-named fields and namespace wildcards, and persists the evolving
//! schema back to storage.
//!
//! ## Pipeline
//!
//! `SchemaTree (persisted properties) → specification resolution →
//! recursive traversal → value indexing → Document`
//!
//! ## Concurrency
//!
//! A [`Schema`] is not concurrency-safe by itself. The published schema
//! is an immutable snapshot behind an `Arc`; each indexing worker clones
//! a `Schema` from it and works on a private draft. A successful
//! traversal publishes the draft; any error discards it, so no partial
//! schema change is ever observable.
//!
//! ## Example
//!
//! ```ignore
//! use strata_schema::{Schema, ShardSet, MemoryShard};
//! use serde_json::json;
//!
//! let shards = ShardSet::new(vec![MemoryShard::new()]);
//! let mut schema = Schema::new(None)?;
//! let result = schema.index(&json!({"name": "Ada", "age": 36}), None, &shards)?;
//! // result.term_id, result.document, result.object
//! ```

pub mod accuracy_gen;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod id;
pub mod indexer;
pub mod keywords;
pub mod readable;
pub mod shard;
pub mod specification;
pub mod text;
pub mod traverser;
pub mod tree;
pub mod types;

pub use document::{Document, SlotValues, TermEntry};
pub use error::{Error, Result};
pub use keywords::{ReservedWord, SCHEMA_METADATA_KEY};
pub use readable::readable;
pub use shard::{MemoryShard, Shard, ShardSet};
pub use specification::{
    field_prefix, global_spec, prefixed, slot_for, Flags, PartialSpec, Prefix, Specification,
    BAD_SLOT, NUMERIC_ID_SENTINEL, RESERVED_SLOTS, SLOT_ID, SLOT_VERSION,
};
pub use traverser::{merge_objects, IndexResult, Schema};
pub use tree::SchemaTree;
pub use types::{StemStrategy, StopStrategy, TypeIndex, UuidFieldIndex};
