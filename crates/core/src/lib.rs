//! `portal-core`: shared identifiers and the error model.
//!
//! This crate contains **pure** primitives (no IO, no framework concerns).

pub mod error;
pub mod id;

pub use error::{PortalError, PortalResult};
pub use id::{CollegeId, UserId};
