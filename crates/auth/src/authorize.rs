use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::permissions::{self, Permission, PermissionSet};
use crate::{Profile, UserType};

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Role definition with its granted permissions (for resolution and audit).
#[derive(Debug, Clone, Serialize)]
pub struct RoleDefinition {
    pub name: String,
    pub permissions: Vec<Permission>,
    pub description: Option<String>,
}

/// Permission definition (for audit/display).
#[derive(Debug, Clone, Serialize)]
pub struct PermissionDefinition {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// Registry of user types and the capabilities they grant.
///
/// Constructed explicitly and passed to whoever resolves permissions; there is
/// no process-wide instance.
#[derive(Debug, Clone)]
pub struct PermissionRegistry {
    roles: HashMap<String, RoleDefinition>,
    permissions: BTreeMap<String, PermissionDefinition>,
}

impl PermissionRegistry {
    /// The portal's default policy.
    pub fn standard() -> Self {
        Self::from_role_mapping(standard_role_permissions)
    }

    /// Create a registry from a user-type-to-permission mapping function.
    ///
    /// The catalog always contains [`permissions::ALL`]; names returned by the
    /// mapping that are not in it are registered as well.
    pub fn from_role_mapping<F>(role_permissions: F) -> Self
    where
        F: Fn(&UserType) -> Vec<Permission>,
    {
        let mut roles: HashMap<String, RoleDefinition> = HashMap::new();
        let mut catalog: BTreeMap<String, PermissionDefinition> = permissions::ALL
            .iter()
            .map(|name| (name.to_string(), definition_for(name)))
            .collect();

        for user_type in UserType::KNOWN {
            let perms = role_permissions(&user_type);

            for perm in perms.iter().filter(|p| !p.is_wildcard()) {
                if !catalog.contains_key(perm.as_str()) {
                    tracing::debug!(permission = %perm, role = %user_type, "registering permission outside the standard catalog");
                    catalog.insert(perm.as_str().to_string(), definition_for(perm.as_str()));
                }
            }

            roles.insert(
                user_type.as_str().to_string(),
                RoleDefinition {
                    name: user_type.as_str().to_string(),
                    permissions: perms,
                    description: role_description(&user_type),
                },
            );
        }

        Self {
            roles,
            permissions: catalog,
        }
    }

    /// Permissions granted to a user type; empty for unknown types.
    pub fn permissions_for(&self, user_type: &UserType) -> &[Permission] {
        self.roles
            .get(user_type.as_str())
            .map(|r| r.permissions.as_slice())
            .unwrap_or(&[])
    }

    pub fn role(&self, name: &str) -> Option<&RoleDefinition> {
        self.roles.get(name)
    }

    pub fn permission(&self, name: &str) -> Option<&PermissionDefinition> {
        self.permissions.get(name)
    }

    pub fn permission_names(&self) -> impl Iterator<Item = &str> {
        self.permissions.keys().map(String::as_str)
    }

    /// Roles that would grant `permission`, sorted.
    pub fn roles_granting(&self, permission: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .roles
            .values()
            .filter(|r| {
                r.permissions
                    .iter()
                    .any(|p| p.is_wildcard() || p.as_str() == permission)
            })
            .map(|r| r.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

impl Default for PermissionRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_role_permissions(user_type: &UserType) -> Vec<Permission> {
    use permissions::*;

    let names: &[&'static str] = match user_type {
        UserType::Student => &[
            VIEW_DASHBOARD,
            VIEW_GRADES,
            VIEW_ATTENDANCE,
            VIEW_COURSES,
            ACCESS_MARKETPLACE,
        ],
        UserType::Faculty => &[
            VIEW_DASHBOARD,
            VIEW_GRADES,
            MANAGE_GRADES,
            VIEW_ATTENDANCE,
            MANAGE_ATTENDANCE,
            VIEW_COURSES,
            MANAGE_COURSES,
            VIEW_ANALYTICS,
            ACCESS_MARKETPLACE,
        ],
        UserType::Admin => &[
            VIEW_DASHBOARD,
            VIEW_GRADES,
            VIEW_ATTENDANCE,
            VIEW_COURSES,
            MANAGE_COURSES,
            VIEW_ANALYTICS,
            MANAGE_USERS,
            MANAGE_COLLEGE_SETTINGS,
        ],
        UserType::SuperAdmin => &[WILDCARD],
        UserType::Parent => &[VIEW_DASHBOARD, VIEW_CHILDREN, VIEW_GRADES, VIEW_ATTENDANCE],
        UserType::Alumni => &[VIEW_DASHBOARD, ACCESS_ALUMNI_NETWORK, ACCESS_MARKETPLACE],
        UserType::Other(_) => &[],
    };

    names.iter().copied().map(Permission::from_static).collect()
}

fn role_description(user_type: &UserType) -> Option<String> {
    match user_type {
        UserType::Student => Some("Enrolled student with access to their own records".to_string()),
        UserType::Faculty => Some("Teaching staff managing courses, grades and attendance".to_string()),
        UserType::Admin => Some("College administrator with user and settings management".to_string()),
        UserType::SuperAdmin => Some("Platform operator with all permissions across colleges".to_string()),
        UserType::Parent => Some("Guardian with read access to their children's records".to_string()),
        UserType::Alumni => Some("Graduate with access to the alumni network".to_string()),
        UserType::Other(_) => None,
    }
}

fn definition_for(name: &str) -> PermissionDefinition {
    PermissionDefinition {
        name: name.to_string(),
        description: permission_description(name),
        category: permission_category(name),
    }
}

fn permission_description(perm: &str) -> Option<String> {
    // Format: "<action>_<resource>", e.g. "view_grades", "access_alumni_network".
    let (action, resource) = perm.split_once('_')?;
    let action_desc = match action {
        "view" => "View",
        "manage" => "Create/update/delete",
        "access" => "Use",
        _ => action,
    };
    Some(format!("{} {}", action_desc, resource.replace('_', " ")))
}

fn permission_category(perm: &str) -> Option<String> {
    perm.split_once('_').map(|(action, _)| action.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Resolve the capabilities of a profile.
///
/// - No IO
/// - No panics
/// - Absent or inactive profiles resolve to all-false
pub fn resolve(registry: &PermissionRegistry, profile: Option<&Profile>) -> PermissionSet {
    let mut set = PermissionSet::denied(registry.permission_names());

    let Some(profile) = profile.filter(|p| p.is_valid()) else {
        return set;
    };

    for perm in registry.permissions_for(&profile.user_type) {
        set.grant(perm);
    }

    set
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of a permission check, for audit records.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required_permission: String,
    pub granted: bool,
    pub reason: String,
    pub user_id: Option<String>,
    pub user_type: Option<String>,
    pub effective_permissions: Vec<String>,
    pub has_wildcard: bool,
    pub denial_reason: Option<DenialReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub kind: DenialKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    NoProfile,
    InactiveProfile,
    MissingPermission,
}

/// Explain why a permission check was (or would be) granted or denied.
pub fn explain(
    registry: &PermissionRegistry,
    profile: Option<&Profile>,
    required: &str,
) -> AuthorizationExplanation {
    let resolved = resolve(registry, profile);
    let effective_permissions: Vec<String> =
        resolved.granted().into_iter().map(str::to_string).collect();

    let mut explanation = AuthorizationExplanation {
        required_permission: required.to_string(),
        granted: false,
        reason: String::new(),
        user_id: profile.map(|p| p.id.to_string()),
        user_type: profile.map(|p| p.user_type.to_string()),
        effective_permissions,
        has_wildcard: resolved.has_wildcard(),
        denial_reason: None,
    };

    let Some(profile) = profile else {
        explanation.reason = "No profile is loaded for the current session".to_string();
        explanation.denial_reason = Some(DenialReason {
            kind: DenialKind::NoProfile,
            message: "Permissions cannot be resolved without a profile".to_string(),
            suggestions: vec!["Sign in again to reload the profile".to_string()],
        });
        return explanation;
    };

    if !profile.is_valid() {
        explanation.reason = format!("Profile {} is inactive", profile.id);
        explanation.denial_reason = Some(DenialReason {
            kind: DenialKind::InactiveProfile,
            message: "Inactive accounts hold no permissions".to_string(),
            suggestions: vec!["Ask a college administrator to reactivate the account".to_string()],
        });
        return explanation;
    }

    if resolved.allows(required) {
        explanation.granted = true;
        explanation.reason = if resolved.has_wildcard() {
            format!("User type '{}' holds the wildcard permission", profile.user_type)
        } else {
            format!("User type '{}' grants '{}'", profile.user_type, required)
        };
        return explanation;
    }

    let granting_roles = registry.roles_granting(required);
    let mut suggestions = vec![format!(
        "Request an account type that grants the '{}' permission",
        required
    )];
    if !granting_roles.is_empty() {
        suggestions.insert(
            0,
            format!("User types that grant this permission: {:?}", granting_roles),
        );
    }

    explanation.reason = format!(
        "User type '{}' does not grant '{}'",
        profile.user_type, required
    );
    explanation.denial_reason = Some(DenialReason {
        kind: DenialKind::MissingPermission,
        message: format!("Missing required permission: '{}'", required),
        suggestions,
    });
    explanation
}
