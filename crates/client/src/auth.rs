//! Auth provider boundary (the hosted auth service's client-side state).

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use portal_auth::{Session, validate_session};
use portal_core::UserId;

/// Reactive auth state exposed by the hosted auth client.
pub trait AuthProvider: Send + Sync {
    /// Authenticated user, if any.
    fn current_user(&self) -> Option<UserId>;

    fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    /// True while the auth client is still restoring or refreshing a session.
    fn auth_loading(&self) -> bool;
}

/// Point-in-time copy of an [`AuthProvider`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub loading: bool,
    pub user: Option<UserId>,
}

impl AuthSnapshot {
    pub fn capture(provider: &dyn AuthProvider) -> Self {
        Self {
            loading: provider.auth_loading(),
            user: provider.current_user(),
        }
    }

    pub fn signed_in(user: UserId) -> Self {
        Self {
            loading: false,
            user: Some(user),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Debug, Default)]
struct SessionSlot {
    loading: bool,
    session: Option<Session>,
}

/// Auth provider driven by session events from the hosted auth client.
///
/// A session whose time window is no longer valid is reported as signed out.
#[derive(Debug, Default)]
pub struct SessionAuth {
    slot: Mutex<SessionSlot>,
}

impl SessionAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session restore/refresh started.
    pub fn begin_loading(&self) {
        self.slot().loading = true;
    }

    pub fn sign_in(&self, session: Session) {
        let mut slot = self.slot();
        slot.loading = false;
        slot.session = Some(session);
    }

    pub fn sign_out(&self) {
        let mut slot = self.slot();
        slot.loading = false;
        slot.session = None;
    }

    fn slot(&self) -> MutexGuard<'_, SessionSlot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AuthProvider for SessionAuth {
    fn current_user(&self) -> Option<UserId> {
        let slot = self.slot();
        let session = slot.session.as_ref()?;
        match validate_session(session, Utc::now()) {
            Ok(()) => Some(session.user_id.clone()),
            Err(err) => {
                tracing::debug!(user_id = %session.user_id, error = %err, "ignoring invalid session");
                None
            }
        }
    }

    fn auth_loading(&self) -> bool {
        self.slot().loading
    }
}
