//! `portal-client`
//!
//! **Responsibility:** client-side access control and navigation for the
//! portal.
//!
//! This crate provides:
//! - A single-slot profile cache with single-flight fetches
//! - The route guard (pure decisions) and the coordinator that applies them
//! - The permission gate for wrapping UI subtrees
//! - Traits for the hosted auth/profile services, storage, router and sinks,
//!   with in-memory implementations
//!
//! Rendering is left to the UI layer; everything here is framework-agnostic.

pub mod auth;
pub mod config;
pub mod coordinator;
pub mod permission_gate;
pub mod profile_cache;
pub mod route_guard;
pub mod router;
pub mod sinks;
pub mod storage;
pub mod store;

pub use auth::{AuthProvider, AuthSnapshot, SessionAuth};
pub use config::{ConfigError, PortalConfig};
pub use coordinator::{GuardOutcome, GuardView, NavigationCoordinator};
pub use permission_gate::{GateContext, PermissionGate, Rendered};
pub use profile_cache::{PROFILE_STORAGE_KEY, ProfileCache, ProfileState};
pub use route_guard::{
    ENTRY_PATH, Evaluation, GuardInputs, GuardPhase, GuardState, LandingRoutes, RouteDecision,
};
pub use router::{MemoryRouter, NavigateOptions, Router};
pub use sinks::{AuditSink, RecordingSink, SecuritySink, ThreatReport, TracingSink};
pub use storage::{FileStorage, LocalStorage, MemoryStorage, StorageError};
pub use store::{InMemoryProfileStore, ProfileStore, StoreError};
