//! # geoscan-types
//!
//! Plain data types shared by the geoscan query engines and their callers.
//!
//! - **Records**: `PointRecord`, the `(id, lon, lat)` triple stored per row
//! - **Matches**: `QueryMatch`, a record found by a query plus its row key
//! - **Queries**: `SpatialQuery` and `QueryMode`
//!
//! All types are serializable with Serde and built on top of the `geo` crate's
//! geometric primitives.
//!
//! ## Examples
//!
//! ```rust
//! use geoscan_types::point::{PointRecord, QueryMatch};
//!
//! let record = PointRecord::new("ap-17", -74.0060, 40.7128);
//! let found = QueryMatch::from_record(&record, "dr5regw3pg6s");
//! assert_eq!(found.id, "ap-17");
//! ```

pub mod point;
pub mod query;
