//! Compute layer: the pure algorithms behind the query engines.
//!
//! Nothing in here performs I/O. It provides:
//! - The geohash cell codec
//! - The bounded top-K candidate queue
//! - Input validation
//!
//! The query engines in [`crate::query`] combine these with range scans.

pub mod spatial;
pub mod validation;
