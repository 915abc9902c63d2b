//! Run the guard once against a profile fixture and print the outcome.
//!
//! Usage: `portal-client <profiles.json> <user-id | -> <path> [permission]`
//!
//! `-` as the user id means "signed out".

use std::sync::Arc;

use anyhow::{Context, bail};
use serde_json::json;

use portal_auth::{PermissionRegistry, Profile, explain};
use portal_client::{
    AuthSnapshot, FileStorage, GateContext, GuardOutcome, InMemoryProfileStore, MemoryRouter,
    MemoryStorage, NavigationCoordinator, PermissionGate, PortalConfig, ProfileCache, Rendered,
    Router, TracingSink,
};
use portal_core::UserId;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    portal_observability::init();

    let config = PortalConfig::from_env().context("invalid portal configuration")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (fixture, user, path, permission) = match args.as_slice() {
        [fixture, user, path] => (fixture, user, path, None),
        [fixture, user, path, permission] => (fixture, user, path, Some(permission.as_str())),
        _ => bail!("usage: portal-client <profiles.json> <user-id | -> <path> [permission]"),
    };

    let raw = std::fs::read_to_string(fixture)
        .with_context(|| format!("failed to read profile fixture {:?}", fixture))?;
    let profiles: Vec<Profile> =
        serde_json::from_str(&raw).context("profile fixture must be a JSON array of profiles")?;

    let storage = FileStorage::open(&config.data_dir)?;
    let cache = Arc::new(
        ProfileCache::new(
            Arc::new(InMemoryProfileStore::with_profiles(profiles)),
            Arc::new(storage),
        )
        .with_storage_key(&config.profile_storage_key),
    );
    if let Some(restored) = cache.hydrate() {
        tracing::info!(user_id = %restored.id, "restored cached profile");
    }

    let router = Arc::new(MemoryRouter::new(path.as_str()));
    let coordinator =
        NavigationCoordinator::new(router.clone(), cache.clone(), Arc::new(MemoryStorage::new()))
            .with_entry_path(&config.entry_path);

    let auth = match user.as_str() {
        "-" => AuthSnapshot::signed_out(),
        id => AuthSnapshot::signed_in(UserId::parse(id)?),
    };

    cache.resolve(auth.user.as_ref()).await;
    let profile_state = cache.state();

    let evaluation = match coordinator.on_state_change(&auth, &profile_state) {
        GuardOutcome::Evaluated(evaluation) => json!(evaluation),
        other => bail!("unexpected guard outcome on first evaluation: {:?}", other),
    };

    let registry = PermissionRegistry::standard();
    let permission_report = permission.map(|required| {
        let gate = PermissionGate::new(Arc::new(TracingSink), Arc::new(TracingSink));
        let permissions = profile_state.permissions(&registry, &auth);
        let ctx = GateContext {
            permissions: &permissions,
            user_id: auth.user.as_ref(),
        };
        let rendered = gate.render(ctx, required, (), None, true);

        json!({
            "gate": describe(&rendered),
            "explanation": explain(&registry, profile_state.profile.as_ref(), required),
        })
    });

    let report = json!({
        "profile": profile_state.profile,
        "evaluation": evaluation,
        "current_path": router.current_path(),
        "navigations": router.navigations(),
        "permission": permission_report,
    });

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn describe<V>(rendered: &Rendered<V>) -> &'static str {
    match rendered {
        Rendered::Loading => "loading",
        Rendered::Children(_) => "children",
        Rendered::Fallback(_) => "fallback",
        Rendered::AccessRestricted => "access_restricted",
        Rendered::Nothing => "nothing",
    }
}
