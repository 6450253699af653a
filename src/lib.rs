//! Double-ended sequence containers.
//!
//! [`Devector`](collections::Devector) is a contiguous vector with free space
//! at both ends and optional inline storage. [`BatchDeque`](collections::BatchDeque)
//! keeps its elements in fixed-size segments, so pushing at either end never
//! moves them.

pub mod collections;
pub mod error;
pub mod slice;

#[cfg(test)]
mod test_utils;

pub use error::{CapacityError, RangeError};
