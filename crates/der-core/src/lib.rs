//! der-core: shared foundation for the DER dynamics workspace.
//!
//! Contains:
//! - units (uom SI types + constructors for electrical ratings)
//! - numeric (Real + tolerances + float helpers)
//! - ids (compact instance identifiers)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
