//! Utility types and functions for Lumina.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam, [`Ray`] and small color helpers

mod error;
mod math;

pub use error::*;
pub use math::*;
