//! Navigation coordinator: runs the route guard on every state change and
//! applies its decisions (redirects, session cleanup).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use portal_auth::Profile;
use portal_core::UserId;

use crate::auth::{AuthProvider, AuthSnapshot};
use crate::profile_cache::{ProfileCache, ProfileState};
use crate::route_guard::{
    self, ENTRY_PATH, Evaluation, GuardInputs, GuardState, LandingRoutes, RouteDecision,
};
use crate::router::{NavigateOptions, Router};
use crate::storage::LocalStorage;

/// What the guarded subtree should show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardView {
    Loading,
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Another evaluation was running; this one was dropped.
    Busy,
    /// Inputs identical to the previous evaluation.
    Unchanged,
    Evaluated(Evaluation),
}

impl GuardOutcome {
    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            GuardOutcome::Evaluated(e) => e.decision.target(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InputsKey {
    auth_loading: bool,
    profile_loading: bool,
    user: Option<UserId>,
    profile: Option<Profile>,
    path: String,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    guard: GuardState,
    last_inputs: Option<InputsKey>,
}

/// Clears the busy flag when an evaluation ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct NavigationCoordinator {
    routes: LandingRoutes,
    entry_path: String,
    router: Arc<dyn Router>,
    profiles: Arc<ProfileCache>,
    session_storage: Arc<dyn LocalStorage>,
    state: Mutex<CoordinatorState>,
    busy: AtomicBool,
}

impl NavigationCoordinator {
    pub fn new(
        router: Arc<dyn Router>,
        profiles: Arc<ProfileCache>,
        session_storage: Arc<dyn LocalStorage>,
    ) -> Self {
        Self {
            routes: LandingRoutes::standard(),
            entry_path: ENTRY_PATH.to_string(),
            router,
            profiles,
            session_storage,
            state: Mutex::new(CoordinatorState::default()),
            busy: AtomicBool::new(false),
        }
    }

    pub fn with_landing_routes(mut self, routes: LandingRoutes) -> Self {
        self.routes = routes;
        self
    }

    pub fn with_entry_path(mut self, entry_path: impl Into<String>) -> Self {
        self.entry_path = entry_path.into();
        self
    }

    pub fn guard_state(&self) -> GuardState {
        self.lock().guard
    }

    /// Loading indicator or children.
    pub fn view(&self, auth: &AuthSnapshot, profile: &ProfileState) -> GuardView {
        let path = self.router.current_path();
        let inputs = guard_inputs(auth, profile, &path);
        if route_guard::blocks_render(self.guard_state(), &inputs) {
            GuardView::Loading
        } else {
            GuardView::Ready
        }
    }

    /// Resolve the profile for the current auth state, then evaluate.
    pub async fn sync(&self, auth: &dyn AuthProvider) -> GuardOutcome {
        let snapshot = AuthSnapshot::capture(auth);
        if !snapshot.loading {
            self.profiles.resolve(snapshot.user.as_ref()).await;
        }
        self.on_state_change(&snapshot, &self.profiles.state())
    }

    /// Evaluate the guard against current state and apply its decision.
    ///
    /// Overlapping calls (e.g. triggered from inside a navigation) are
    /// skipped, not queued: the next state change re-evaluates from scratch.
    pub fn on_state_change(&self, auth: &AuthSnapshot, profile: &ProfileState) -> GuardOutcome {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            tracing::debug!("guard evaluation already in progress; skipping");
            return GuardOutcome::Busy;
        };

        let path = self.router.current_path();
        let key = InputsKey {
            auth_loading: auth.loading,
            profile_loading: profile.loading,
            user: auth.user.clone(),
            profile: profile.profile.clone(),
            path: path.clone(),
        };

        let state = {
            let mut state = self.lock();
            if state.last_inputs.as_ref() == Some(&key) {
                return GuardOutcome::Unchanged;
            }
            state.last_inputs = Some(key);
            state.guard
        };

        let inputs = guard_inputs(auth, profile, &path);
        let evaluation = route_guard::evaluate(state, &inputs, &self.routes, &self.entry_path);
        self.lock().guard = evaluation.next;

        if evaluation.clear_session {
            self.clear_session_artifacts();
        }

        if let RouteDecision::Redirect { to, replace } = &evaluation.decision {
            tracing::info!(from = %path, to = %to, phase = ?evaluation.phase, "guard redirect");
            self.router.navigate(to, NavigateOptions { replace: *replace });
        }

        if evaluation.completes_initial_load {
            tracing::debug!(phase = ?evaluation.phase, "initial load complete");
        }

        GuardOutcome::Evaluated(evaluation)
    }

    fn clear_session_artifacts(&self) {
        self.profiles.clear();
        if let Err(err) = self.session_storage.clear() {
            tracing::warn!(error = %err, "failed to clear session storage");
        }
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn guard_inputs<'a>(
    auth: &'a AuthSnapshot,
    profile: &'a ProfileState,
    path: &'a str,
) -> GuardInputs<'a> {
    GuardInputs {
        auth_loading: auth.loading,
        profile_loading: profile.loading,
        user: auth.user.as_ref(),
        profile: profile.profile.as_ref(),
        current_path: path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{OnceLock, Weak};

    use crate::route_guard::GuardPhase;
    use crate::router::{MemoryRouter, Navigation};
    use crate::storage::MemoryStorage;
    use crate::store::InMemoryProfileStore;
    use portal_auth::UserType;

    fn uid(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    struct Harness {
        router: Arc<MemoryRouter>,
        profiles: Arc<ProfileCache>,
        session_storage: Arc<MemoryStorage>,
        store: Arc<InMemoryProfileStore>,
        coordinator: NavigationCoordinator,
    }

    fn harness(path: &str, profiles: Vec<Profile>) -> Harness {
        let router = Arc::new(MemoryRouter::new(path));
        let store = Arc::new(InMemoryProfileStore::with_profiles(profiles));
        let cache = Arc::new(ProfileCache::new(store.clone(), Arc::new(MemoryStorage::new())));
        let session_storage = Arc::new(MemoryStorage::new());
        let coordinator =
            NavigationCoordinator::new(router.clone(), cache.clone(), session_storage.clone());
        Harness {
            router,
            profiles: cache,
            session_storage,
            store,
            coordinator,
        }
    }

    fn ready(profile: Option<Profile>) -> ProfileState {
        ProfileState {
            loading: false,
            resolved_for: profile.as_ref().map(|p| p.id.clone()),
            profile,
        }
    }

    fn replaced(path: &str) -> Navigation {
        Navigation {
            path: path.to_string(),
            replace: true,
        }
    }

    #[test]
    fn unauthenticated_user_is_sent_to_entry() {
        let h = harness("/dashboard", vec![]);
        h.session_storage.set("draft", "x").unwrap();

        let outcome = h
            .coordinator
            .on_state_change(&AuthSnapshot::signed_out(), &ready(None));

        assert_eq!(outcome.redirect_target(), Some("/"));
        assert_eq!(h.router.navigations(), vec![replaced("/")]);
        assert!(h.session_storage.is_empty());
    }

    #[test]
    fn student_on_entry_lands_on_student_dashboard() {
        let id = uid("u-1");
        let h = harness("/", vec![]);
        let profile = Profile::new(id.clone(), UserType::Student);

        h.coordinator
            .on_state_change(&AuthSnapshot::signed_in(id), &ready(Some(profile)));

        assert_eq!(h.router.navigations(), vec![replaced("/student")]);
        assert_eq!(h.router.current_path(), "/student");
    }

    #[test]
    fn admin_in_teacher_section_on_first_load_is_pulled_back() {
        let id = uid("u-1");
        let h = harness("/teacher", vec![]);
        let profile = Profile::new(id.clone(), UserType::Admin);

        h.coordinator
            .on_state_change(&AuthSnapshot::signed_in(id), &ready(Some(profile)));

        assert_eq!(h.router.navigations(), vec![replaced("/admin")]);
    }

    #[test]
    fn unknown_user_type_stays_and_completes_load_once() {
        let id = uid("u-1");
        let h = harness("/student", vec![]);
        let auth = AuthSnapshot::signed_in(id.clone());
        let profile = ready(Some(Profile::new(id, UserType::from("unknown_role"))));

        let GuardOutcome::Evaluated(first) = h.coordinator.on_state_change(&auth, &profile) else {
            panic!("expected an evaluation");
        };
        assert_eq!(first.decision, RouteDecision::Stay);
        assert!(first.completes_initial_load);
        assert!(first.unknown_user_type.is_some());

        // Same inputs: nothing to do.
        assert_eq!(
            h.coordinator.on_state_change(&auth, &profile),
            GuardOutcome::Unchanged
        );

        // A new path re-evaluates, but the load was already complete.
        h.router.visit("/elsewhere");
        let GuardOutcome::Evaluated(second) = h.coordinator.on_state_change(&auth, &profile) else {
            panic!("expected an evaluation");
        };
        assert!(!second.completes_initial_load);
        assert!(h.router.navigations().is_empty());
        assert!(h.coordinator.guard_state().initial_load_complete);
    }

    #[test]
    fn second_evaluation_with_same_inputs_does_not_navigate() {
        let id = uid("u-1");
        let h = harness("/", vec![]);
        let auth = AuthSnapshot::signed_in(id.clone());
        let profile = ready(Some(Profile::new(id, UserType::Parent)));

        h.coordinator.on_state_change(&auth, &profile);
        let second = h.coordinator.on_state_change(&auth, &profile);

        assert_eq!(second.redirect_target(), None);
        assert_eq!(h.router.navigations().len(), 1);
    }

    #[test]
    fn in_app_navigation_to_other_section_is_allowed_after_first_load() {
        let id = uid("u-1");
        let h = harness("/alumni", vec![]);
        let auth = AuthSnapshot::signed_in(id.clone());
        let profile = ready(Some(Profile::new(id, UserType::Alumni)));

        h.coordinator.on_state_change(&auth, &profile);
        h.router.visit("/student/marketplace");
        h.coordinator.on_state_change(&auth, &profile);

        assert!(h.router.navigations().is_empty());
        assert_eq!(h.router.current_path(), "/student/marketplace");
    }

    #[test]
    fn loading_blocks_view_and_navigation() {
        let h = harness("/admin", vec![]);
        let auth = AuthSnapshot {
            loading: true,
            user: None,
        };

        assert_eq!(h.coordinator.view(&auth, &ready(None)), GuardView::Loading);
        let GuardOutcome::Evaluated(e) = h.coordinator.on_state_change(&auth, &ready(None)) else {
            panic!("expected an evaluation");
        };
        assert_eq!(e.phase, GuardPhase::Initializing);
        assert!(h.router.navigations().is_empty());
        assert!(!h.coordinator.guard_state().initial_load_complete);
    }

    #[test]
    fn view_is_ready_once_initial_load_completes() {
        let id = uid("u-1");
        let h = harness("/parent", vec![]);
        let auth = AuthSnapshot::signed_in(id.clone());
        let profile = ready(Some(Profile::new(id, UserType::Parent)));

        assert_eq!(h.coordinator.view(&auth, &profile), GuardView::Loading);
        h.coordinator.on_state_change(&auth, &profile);
        assert_eq!(h.coordinator.view(&auth, &profile), GuardView::Ready);
    }

    #[test]
    fn authenticated_without_profile_does_not_navigate() {
        let h = harness("/teacher", vec![]);
        let GuardOutcome::Evaluated(e) = h
            .coordinator
            .on_state_change(&AuthSnapshot::signed_in(uid("u-1")), &ready(None))
        else {
            panic!("expected an evaluation");
        };
        assert_eq!(e.phase, GuardPhase::AuthenticatedNoProfile);
        assert!(e.completes_initial_load);
        assert!(h.router.navigations().is_empty());
    }

    #[tokio::test]
    async fn sync_fetches_profile_and_redirects() {
        let id = uid("u-1");
        let h = harness("/", vec![Profile::new(id.clone(), UserType::Faculty)]);
        let auth = crate::auth::SessionAuth::new();
        auth.sign_in(portal_auth::Session {
            access_token: "tok".to_string(),
            user_id: id,
            issued_at: chrono::Utc::now() - chrono::Duration::seconds(5),
            expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
        });

        let outcome = h.coordinator.sync(&auth).await;
        assert_eq!(outcome.redirect_target(), Some("/teacher"));
        assert_eq!(h.store.fetch_count(), 1);

        auth.sign_out();
        let outcome = h.coordinator.sync(&auth).await;
        assert_eq!(outcome.redirect_target(), Some("/"));
        assert!(h.profiles.current().is_none());
    }

    /// Router that re-enters the coordinator from inside `navigate`, the way a
    /// reactive router notifies subscribers synchronously.
    struct ReentrantRouter {
        inner: MemoryRouter,
        coordinator: OnceLock<Weak<NavigationCoordinator>>,
        auth: AuthSnapshot,
        profile: ProfileState,
        nested: Mutex<Vec<GuardOutcome>>,
    }

    impl Router for ReentrantRouter {
        fn current_path(&self) -> String {
            self.inner.current_path()
        }

        fn navigate(&self, path: &str, options: NavigateOptions) {
            self.inner.navigate(path, options);
            if let Some(coordinator) = self.coordinator.get().and_then(Weak::upgrade) {
                let outcome = coordinator.on_state_change(&self.auth, &self.profile);
                self.nested.lock().unwrap().push(outcome);
            }
        }
    }

    #[test]
    fn overlapping_evaluation_is_skipped() {
        let id = uid("u-1");
        let auth = AuthSnapshot::signed_in(id.clone());
        let profile = ready(Some(Profile::new(id, UserType::Student)));

        let router = Arc::new(ReentrantRouter {
            inner: MemoryRouter::new("/"),
            coordinator: OnceLock::new(),
            auth: auth.clone(),
            profile: profile.clone(),
            nested: Mutex::new(Vec::new()),
        });
        let cache = Arc::new(ProfileCache::new(
            Arc::new(InMemoryProfileStore::new()),
            Arc::new(MemoryStorage::new()),
        ));
        let coordinator = Arc::new(NavigationCoordinator::new(
            router.clone(),
            cache,
            Arc::new(MemoryStorage::new()),
        ));
        router
            .coordinator
            .set(Arc::downgrade(&coordinator))
            .unwrap_or_else(|_| panic!("coordinator already set"));

        coordinator.on_state_change(&auth, &profile);

        assert_eq!(*router.nested.lock().unwrap(), vec![GuardOutcome::Busy]);
        assert_eq!(router.inner.navigations(), vec![replaced("/student")]);

        // The flag is released afterwards: the follow-up evaluation runs and stays.
        let follow_up = coordinator.on_state_change(&auth, &profile);
        assert!(matches!(follow_up, GuardOutcome::Evaluated(ref e) if e.decision == RouteDecision::Stay));
    }
}
