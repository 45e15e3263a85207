//! # Strata Core
//!
//! Field type descriptors, accuracy-bucket tables and canonical leaf
//! serialisation for the Strata schema engine.
//!
//! This crate provides:
//! - `FieldType` / `SepTypes`: the `(foreign?, object?, array?, concrete)`
//!   shape tuple and its slash-separated descriptor syntax
//! - Default accuracy tables for numeric, date, datetime, time and
//!   geospatial fields
//! - Order-preserving byte encodings for every leaf type
//! - Temporal parsing with exact ISO-8601 round-trips
//! - UUID representations (canonical, urn, braced, compact)
//!
//! ## Design Principles
//!
//! 1. **One encoding per type**: serialisation is total and has no
//!    configuration beyond the field's own settings
//! 2. **Byte order equals value order**: numeric encodings are biased
//!    big-endian so slots sort correctly without decoding
//! 3. **Constants stay constant**: default accuracy tables never mutate

pub mod accuracy;
pub mod error;
pub mod field_type;
pub mod serialise;
pub mod temporal;
pub mod uuids;

pub use accuracy::{
    default_accuracy, validate_acc_date, UnitTime, DEF_ACCURACY_DATE, DEF_ACCURACY_DATETIME,
    DEF_ACCURACY_GEO, DEF_ACCURACY_NUM, DEF_ACCURACY_TIME,
};
pub use error::{Error, Result};
pub use field_type::{
    format_type, parse_type, FieldType, SepTypes, SEP_ARRAY, SEP_CONCRETE, SEP_FOREIGN, SEP_OBJECT,
};
pub use temporal::Tm;
