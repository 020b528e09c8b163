//! Geohash cells and candidate ranking.

pub mod cell;
pub mod topk;

pub use cell::{Direction, GeohashCell, decode, encode, neighbor, neighborhood, neighbors};
pub use topk::{BoundedTopK, Offer};
