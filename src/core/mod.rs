//! Core constants, error types and collaborator traits.
//!
//! Always compiled; everything else in the crate builds on these.

mod constants;
mod error;
mod traits;

pub use constants::*;
pub use error::*;
pub use traits::*;
