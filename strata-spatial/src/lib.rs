//! # Strata Spatial
//!
//! Hierarchical triangular mesh (HTM) support for the Strata schema
//! engine.
//!
//! This crate provides:
//! - Trixel ids: 64-bit integers with 2 bits per refinement level
//! - Coverings: map a geometry to the set of trixels overlapping it
//! - Range sets: sorted full-depth intervals with union/intersection,
//!   which is the canonical form value slots store
//! - Geometry parsing from EWKT strings and `_point`/`_circle`/... cast
//!   objects
//!
//! # Trixel Levels
//!
//! | Level | Approx. size | Use case |
//! |-------|--------------|----------|
//! | 3     | ~700 km      | Countries |
//! | 8     | ~20 km       | Cities |
//! | 12    | ~1.5 km      | Neighborhoods |
//! | 15    | ~170 m       | Buildings |
//! | 25    | ~17 cm       | Full depth |

pub mod cartesian;
pub mod error;
pub mod ewkt;
pub mod geometry;
pub mod htm;
pub mod ranges;

pub use cartesian::{Cartesian, EARTH_RADIUS_METERS};
pub use error::{Result, SpatialError};
pub use ewkt::{is_ewkt, parse_ewkt};
pub use geometry::{parse_geometry, Circle, GeoCast, Geometry, Point, Reduced};
pub use htm::{
    appropriate_level, covering, covering_to_ranges, id_level, id_to_range, ids_for_ranges,
    point_to_id, point_to_id_at, Cap, ConvexPolygon, Overlap, Region, Trixel, MAX_LEVEL,
};
pub use ranges::{
    intersection, merge, serialise_ranges, union, unserialise_ranges, Range,
};
