//! Profile cache: at most one profile, for the current session user.
//!
//! - Cache hits never touch the store
//! - Concurrent lookups for the same user share one fetch (single-flight)
//! - Store errors, missing rows and inactive profiles all clear the cache
//! - The cached profile is mirrored into durable storage under one fixed key

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OnceCell;

use portal_auth::{PermissionRegistry, PermissionState, Profile, resolve};
use portal_core::UserId;

use crate::auth::AuthSnapshot;
use crate::storage::LocalStorage;
use crate::store::ProfileStore;

/// Default durable-storage slot for the serialized profile.
pub const PROFILE_STORAGE_KEY: &str = "portal.user_profile";

/// Snapshot of the cache as seen by the route guard and permission gate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileState {
    /// A fetch for the most recently requested user is outstanding.
    pub loading: bool,
    pub profile: Option<Profile>,
    /// User the cache holds a final answer for (a profile or "none").
    pub resolved_for: Option<UserId>,
}

impl ProfileState {
    /// Permissions of the session user in `auth`.
    ///
    /// `Loading` until both auth and the profile lookup for that exact user
    /// have settled. A cached profile of any other user never grants anything.
    pub fn permissions(
        &self,
        registry: &PermissionRegistry,
        auth: &AuthSnapshot,
    ) -> PermissionState {
        if auth.loading || self.loading {
            return PermissionState::Loading;
        }

        let Some(user) = auth.user.as_ref() else {
            return PermissionState::Ready(resolve(registry, None));
        };

        match self.profile.as_ref().filter(|p| p.is_valid_for(user)) {
            Some(profile) => PermissionState::Ready(resolve(registry, Some(profile))),
            None if self.resolved_for.as_ref() == Some(user) => {
                PermissionState::Ready(resolve(registry, None))
            }
            None => PermissionState::Loading,
        }
    }
}

type FetchCell = Arc<OnceCell<Option<Profile>>>;

#[derive(Default)]
struct CacheState {
    profile: Option<Profile>,
    /// User of the most recent lookup; only its fetch may commit.
    target: Option<UserId>,
    resolved_for: Option<UserId>,
    in_flight: HashMap<UserId, FetchCell>,
}

impl CacheState {
    fn is_current(&self, user_id: &UserId, cell: &FetchCell) -> bool {
        self.target.as_ref() == Some(user_id)
            && self
                .in_flight
                .get(user_id)
                .is_some_and(|c| Arc::ptr_eq(c, cell))
    }

    fn is_loading(&self) -> bool {
        self.target
            .as_ref()
            .is_some_and(|t| self.in_flight.contains_key(t))
    }
}

pub struct ProfileCache {
    store: Arc<dyn ProfileStore>,
    storage: Arc<dyn LocalStorage>,
    storage_key: String,
    state: Mutex<CacheState>,
}

impl ProfileCache {
    pub fn new(store: Arc<dyn ProfileStore>, storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            store,
            storage,
            storage_key: PROFILE_STORAGE_KEY.to_string(),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Restore the profile persisted by a previous run.
    ///
    /// Anything unreadable or inactive is removed instead of trusted. The
    /// restored profile only counts for its own user: lookups and permission
    /// checks for anyone else ignore it.
    pub fn hydrate(&self) -> Option<Profile> {
        let raw = match self.storage.get(&self.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read persisted profile");
                return None;
            }
        };

        let profile = match serde_json::from_str::<Profile>(&raw) {
            Ok(profile) if profile.is_valid() => profile,
            Ok(profile) => {
                tracing::warn!(user_id = %profile.id, "discarding persisted inactive profile");
                self.forget_persisted();
                return None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable persisted profile");
                self.forget_persisted();
                return None;
            }
        };

        let mut state = self.lock();
        state.resolved_for = Some(profile.id.clone());
        state.profile = Some(profile.clone());
        Some(profile)
    }

    pub fn current(&self) -> Option<Profile> {
        self.lock().profile.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().is_loading()
    }

    pub fn state(&self) -> ProfileState {
        let state = self.lock();
        ProfileState {
            loading: state.is_loading(),
            profile: state.profile.clone(),
            resolved_for: state.resolved_for.clone(),
        }
    }

    /// Drop the cached profile (memory and durable slot).
    ///
    /// Fetches still in flight will not be committed, and their callers get
    /// `None`.
    pub fn clear(&self) {
        {
            let mut state = self.lock();
            state.profile = None;
            state.target = None;
            state.resolved_for = None;
            state.in_flight.clear();
        }
        self.forget_persisted();
    }

    /// Profile for the authenticated user, fetching it if needed.
    ///
    /// `None` for an unauthenticated session (which also clears the cache),
    /// for a lookup superseded by a newer one or by [`clear`](Self::clear),
    /// and for every failure path: errors are logged, never returned.
    pub async fn resolve(&self, user: Option<&UserId>) -> Option<Profile> {
        let Some(user_id) = user else {
            self.clear();
            return None;
        };

        let (cell, invalidated) = {
            let mut state = self.lock();
            state.target = Some(user_id.clone());

            let cached = state.profile.as_ref().filter(|p| &p.id == user_id).cloned();
            if let Some(profile) = cached {
                state.resolved_for = Some(user_id.clone());
                return Some(profile);
            }

            let invalidated = match state.profile.take() {
                Some(stale) => {
                    tracing::info!(cached = %stale.id, current = %user_id, "cached profile belongs to another user; invalidating");
                    true
                }
                None => false,
            };
            if state.resolved_for.as_ref() != Some(user_id) {
                state.resolved_for = None;
            }

            let cell = state
                .in_flight
                .entry(user_id.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone();

            (cell, invalidated)
        };

        if invalidated {
            self.forget_persisted();
        }

        let outcome = cell
            .get_or_init(|| self.fetch_and_commit(user_id, cell.clone()))
            .await
            .clone();

        let mut state = self.lock();
        if state
            .in_flight
            .get(user_id)
            .is_some_and(|c| Arc::ptr_eq(c, &cell))
        {
            state.in_flight.remove(user_id);
        }

        let still_wanted = state.target.as_ref() == Some(user_id)
            && state.resolved_for.as_ref() == Some(user_id);
        if still_wanted { outcome } else { None }
    }

    async fn fetch_and_commit(&self, user_id: &UserId, cell: FetchCell) -> Option<Profile> {
        tracing::debug!(%user_id, "fetching profile");

        let fetched = match self.store.fetch_profile_by_id(user_id).await {
            Ok(Some(profile)) if profile.is_valid_for(user_id) => Some(profile),
            Ok(Some(profile)) if !profile.is_valid() => {
                tracing::warn!(%user_id, "profile is inactive; refusing to cache it");
                None
            }
            Ok(Some(profile)) => {
                tracing::warn!(%user_id, returned = %profile.id, "profile store returned a different user");
                None
            }
            Ok(None) => {
                tracing::warn!(%user_id, "no profile row for user");
                None
            }
            Err(err) => {
                tracing::warn!(%user_id, error = %err, "profile fetch failed");
                None
            }
        };

        let committed = {
            let mut state = self.lock();
            let current = state.is_current(user_id, &cell);
            if current {
                state.profile = fetched.clone();
                state.resolved_for = Some(user_id.clone());
            }
            current
        };

        if !committed {
            tracing::debug!(%user_id, "profile fetch superseded; discarding result");
            return None;
        }

        match &fetched {
            Some(profile) => self.persist(profile),
            None => self.forget_persisted(),
        }

        fetched
    }

    fn persist(&self, profile: &Profile) {
        let payload = match serde_json::to_string(profile) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize profile for storage");
                return;
            }
        };

        if let Err(err) = self.storage.set(&self.storage_key, &payload) {
            tracing::warn!(error = %err, "failed to persist profile");
        }
    }

    fn forget_persisted(&self) {
        if let Err(err) = self.storage.remove(&self.storage_key) {
            tracing::warn!(error = %err, "failed to remove persisted profile");
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // The state is only ever replaced field by field under the lock, so a
        // poisoned lock still holds a consistent value.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
