//! Permission gate: renders a subtree only for users holding a capability.

use std::sync::{Arc, Mutex, MutexGuard};

use portal_auth::PermissionState;
use portal_core::UserId;

use crate::sinks::{AuditSink, SecuritySink, Severity, ThreatKind, ThreatReport};

pub const UNAUTHORIZED_ACCESS_ACTION: &str = "unauthorized_access_attempt";
pub const SECURITY_CATEGORY: &str = "security";

/// What a gated subtree resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered<V> {
    /// Neutral loading placeholder; nothing else is shown.
    Loading,
    Children(V),
    Fallback(V),
    /// Generic "Access Restricted" placeholder.
    AccessRestricted,
    Nothing,
}

/// Inputs the gate reads on each render.
#[derive(Debug, Clone, Copy)]
pub struct GateContext<'a> {
    pub permissions: &'a PermissionState,
    pub user_id: Option<&'a UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DenialKey {
    permission: String,
    user_id: Option<UserId>,
}

/// One gate per wrapped subtree.
///
/// Denials are audited once per transition into the denied state: repeated
/// renders with the same permission and user stay quiet until the gate has
/// been through loading or granted again, or the user changes.
pub struct PermissionGate {
    audit: Arc<dyn AuditSink>,
    security: Arc<dyn SecuritySink>,
    last_denied: Mutex<Option<DenialKey>>,
}

impl PermissionGate {
    pub fn new(audit: Arc<dyn AuditSink>, security: Arc<dyn SecuritySink>) -> Self {
        Self {
            audit,
            security,
            last_denied: Mutex::new(None),
        }
    }

    pub fn render<V>(
        &self,
        ctx: GateContext<'_>,
        required_permission: &str,
        children: V,
        fallback: Option<V>,
        show_fallback: bool,
    ) -> Rendered<V> {
        match ctx.permissions.allows(required_permission) {
            None => {
                *self.last_denied() = None;
                Rendered::Loading
            }
            Some(true) => {
                *self.last_denied() = None;
                Rendered::Children(children)
            }
            Some(false) => {
                self.record_denial(required_permission, ctx.user_id);

                match (show_fallback, fallback) {
                    (true, Some(fallback)) => Rendered::Fallback(fallback),
                    (true, None) => Rendered::AccessRestricted,
                    (false, _) => Rendered::Nothing,
                }
            }
        }
    }

    fn record_denial(&self, permission: &str, user_id: Option<&UserId>) {
        let key = DenialKey {
            permission: permission.to_string(),
            user_id: user_id.cloned(),
        };

        {
            let mut last = self.last_denied();
            if last.as_ref() == Some(&key) {
                return;
            }
            *last = Some(key);
        }

        let who = user_id.map(UserId::as_str).unwrap_or("anonymous");
        tracing::warn!(permission, user_id = who, "permission denied");

        self.audit.log_user_action(
            UNAUTHORIZED_ACCESS_ACTION,
            &format!(
                "User {} attempted to access content requiring '{}'",
                who, permission
            ),
            SECURITY_CATEGORY,
            user_id,
        );

        self.security.report_threat(ThreatReport {
            kind: ThreatKind::PrivilegeEscalation,
            severity: Severity::Medium,
            description: format!("Blocked access to content requiring '{}'", permission),
            user_id: user_id.cloned(),
            metadata: serde_json::json!({
                "required_permission": permission,
                "component": "permission_gate",
            }),
            blocked: true,
        });
    }

    fn last_denied(&self) -> MutexGuard<'_, Option<DenialKey>> {
        self.last_denied
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
