//! Route guard: which page an authenticated (or not) user may be on.
//!
//! Everything here is a pure function of its inputs; the
//! [`NavigationCoordinator`](crate::coordinator::NavigationCoordinator)
//! applies the resulting side effects.

use std::collections::HashMap;

use serde::Serialize;

use portal_auth::{Profile, UserType};
use portal_core::UserId;

/// Default entry (sign-in) path.
pub const ENTRY_PATH: &str = "/";

/// Landing route per user type.
///
/// Constructed explicitly and passed to the guard; there is no global table.
#[derive(Debug, Clone)]
pub struct LandingRoutes {
    routes: HashMap<String, String>,
}

impl LandingRoutes {
    pub fn empty() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// One dashboard per audience; super admins share the admin dashboard.
    pub fn standard() -> Self {
        Self::empty()
            .with_route(UserType::Student, "/student")
            .with_route(UserType::Faculty, "/teacher")
            .with_route(UserType::Admin, "/admin")
            .with_route(UserType::SuperAdmin, "/admin")
            .with_route(UserType::Parent, "/parent")
            .with_route(UserType::Alumni, "/alumni")
    }

    pub fn with_route(mut self, user_type: UserType, path: impl Into<String>) -> Self {
        self.routes.insert(user_type.as_str().to_string(), path.into());
        self
    }

    pub fn landing_for(&self, user_type: &UserType) -> Option<&str> {
        self.routes.get(user_type.as_str()).map(String::as_str)
    }
}

impl Default for LandingRoutes {
    fn default() -> Self {
        Self::standard()
    }
}

/// State the guard carries between evaluations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GuardState {
    pub initial_load_complete: bool,
}

/// Everything a single evaluation looks at.
#[derive(Debug, Clone, Copy)]
pub struct GuardInputs<'a> {
    pub auth_loading: bool,
    pub profile_loading: bool,
    pub user: Option<&'a UserId>,
    pub profile: Option<&'a Profile>,
    pub current_path: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardPhase {
    Initializing,
    Unauthenticated,
    AuthenticatedNoProfile,
    AuthenticatedWithProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteDecision {
    Stay,
    Redirect { to: String, replace: bool },
}

impl RouteDecision {
    fn replace_with(path: &str) -> Self {
        RouteDecision::Redirect {
            to: path.to_string(),
            replace: true,
        }
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            RouteDecision::Stay => None,
            RouteDecision::Redirect { to, .. } => Some(to),
        }
    }
}

/// Result of one guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub phase: GuardPhase,
    pub decision: RouteDecision,

    /// Drop the cached profile and per-session storage.
    pub clear_session: bool,

    /// This evaluation is the one that completed the initial load.
    pub completes_initial_load: bool,

    #[serde(skip)]
    pub next: GuardState,

    /// Set when the profile's user type has no landing route.
    pub unknown_user_type: Option<UserType>,
}

pub fn phase(inputs: &GuardInputs<'_>) -> GuardPhase {
    if inputs.auth_loading || inputs.profile_loading {
        return GuardPhase::Initializing;
    }

    match inputs.user {
        None => GuardPhase::Unauthenticated,
        Some(user) => match inputs.profile {
            Some(profile) if profile.is_valid_for(user) => GuardPhase::AuthenticatedWithProfile,
            _ => GuardPhase::AuthenticatedNoProfile,
        },
    }
}

/// Whether the guarded subtree should show the blocking loading indicator.
pub fn blocks_render(state: GuardState, inputs: &GuardInputs<'_>) -> bool {
    inputs.auth_loading || inputs.profile_loading || !state.initial_load_complete
}

/// Decide where the user should be.
pub fn evaluate(
    state: GuardState,
    inputs: &GuardInputs<'_>,
    routes: &LandingRoutes,
    entry_path: &str,
) -> Evaluation {
    let phase = phase(inputs);

    let mut evaluation = Evaluation {
        phase,
        decision: RouteDecision::Stay,
        clear_session: false,
        completes_initial_load: false,
        next: state,
        unknown_user_type: None,
    };

    match phase {
        GuardPhase::Initializing => return evaluation,

        GuardPhase::Unauthenticated => {
            evaluation.clear_session = true;
            if !same_path(inputs.current_path, entry_path) {
                evaluation.decision = RouteDecision::replace_with(entry_path);
            }
        }

        // The auth layer owns sign-out for users without a usable profile.
        GuardPhase::AuthenticatedNoProfile => {}

        GuardPhase::AuthenticatedWithProfile => {
            if let Some(profile) = inputs.profile {
                evaluation.unknown_user_type = route_profile(
                    &mut evaluation.decision,
                    state,
                    profile,
                    inputs.current_path,
                    routes,
                    entry_path,
                );
            }
        }
    }

    if !state.initial_load_complete {
        evaluation.completes_initial_load = true;
        evaluation.next.initial_load_complete = true;
    }

    evaluation
}

/// Landing decision for a usable profile; returns the user type when it has
/// no landing route.
fn route_profile(
    decision: &mut RouteDecision,
    state: GuardState,
    profile: &Profile,
    current_path: &str,
    routes: &LandingRoutes,
    entry_path: &str,
) -> Option<UserType> {
    let Some(landing) = routes.landing_for(&profile.user_type) else {
        tracing::error!(
            user_id = %profile.id,
            user_type = %profile.user_type,
            "no landing route for user type; staying put"
        );
        return Some(profile.user_type.clone());
    };

    if same_path(current_path, entry_path) {
        *decision = RouteDecision::replace_with(landing);
    } else if !state.initial_load_complete
        && top_level_segment(current_path) != top_level_segment(landing)
    {
        // Only the first evaluation pulls users back into their own section;
        // later in-app navigation is left alone.
        *decision = RouteDecision::replace_with(landing);
    }

    None
}

/// First path segment: `admin` for `/admin/users?tab=1`, empty for `/`.
pub fn top_level_segment(path: &str) -> &str {
    path.trim_start_matches('/')
        .split(['/', '?', '#'])
        .next()
        .unwrap_or("")
}

fn same_path(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or("");
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}
