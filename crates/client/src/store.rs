//! Profile store boundary (the hosted database).

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use thiserror::Error;

use portal_auth::Profile;
use portal_core::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The service could not be reached.
    #[error("profile store unreachable: {0}")]
    Connectivity(String),

    /// The query was rejected or failed server-side.
    #[error("profile query failed: {0}")]
    Query(String),
}

/// Read access to user profiles.
///
/// `Ok(None)` means the query succeeded but returned no rows.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn fetch_profile_by_id(&self, id: &UserId) -> Result<Option<Profile>, StoreError>;
}

/// In-memory profile store for tests and the demo binary.
///
/// Counts fetches and can be told to fail, so callers can observe
/// single-flight and fail-closed behavior.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: Mutex<HashMap<UserId, Profile>>,
    failure: Mutex<Option<StoreError>>,
    fetches: AtomicUsize,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let store = Self::new();
        for profile in profiles {
            store.upsert(profile);
        }
        store
    }

    pub fn upsert(&self, profile: Profile) {
        if let Ok(mut profiles) = self.profiles.lock() {
            profiles.insert(profile.id.clone(), profile);
        }
    }

    /// Make every subsequent fetch fail with `error` (or succeed again with `None`).
    pub fn set_failure(&self, error: Option<StoreError>) {
        if let Ok(mut failure) = self.failure.lock() {
            *failure = error;
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn fetch_profile_by_id(&self, id: &UserId) -> Result<Option<Profile>, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        // Real stores suspend here; yielding lets concurrent callers interleave.
        tokio::task::yield_now().await;

        if let Some(err) = self
            .failure
            .lock()
            .map_err(|_| StoreError::Query("store lock poisoned".to_string()))?
            .clone()
        {
            return Err(err);
        }

        let profiles = self
            .profiles
            .lock()
            .map_err(|_| StoreError::Query("store lock poisoned".to_string()))?;
        Ok(profiles.get(id).cloned())
    }
}
