//! `portal-auth`: profiles, roles, and permission resolution.
//!
//! This crate is intentionally decoupled from the hosted auth service, storage
//! and rendering: everything here is a pure function of its inputs.

pub mod authorize;
pub mod permissions;
pub mod profile;
pub mod session;
pub mod user_type;

pub use authorize::{
    AuthorizationExplanation, DenialKind, DenialReason, PermissionRegistry, explain, resolve,
};
pub use permissions::{Permission, PermissionSet, PermissionState};
pub use profile::Profile;
pub use session::{Session, SessionError, validate_session};
pub use user_type::UserType;
