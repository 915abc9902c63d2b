use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "view_grades").
/// The wildcard permission `"*"` grants every capability; it is only ever
/// handed out by the registry, never checked for by UI code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == WILDCARD
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

pub const WILDCARD: &str = "*";

// Dashboard and academic records.
pub const VIEW_DASHBOARD: &str = "view_dashboard";
pub const VIEW_GRADES: &str = "view_grades";
pub const MANAGE_GRADES: &str = "manage_grades";
pub const VIEW_ATTENDANCE: &str = "view_attendance";
pub const MANAGE_ATTENDANCE: &str = "manage_attendance";
pub const VIEW_COURSES: &str = "view_courses";
pub const MANAGE_COURSES: &str = "manage_courses";

// Family and alumni.
pub const VIEW_CHILDREN: &str = "view_children";
pub const ACCESS_ALUMNI_NETWORK: &str = "access_alumni_network";
pub const ACCESS_MARKETPLACE: &str = "access_marketplace";

// Administration.
pub const VIEW_ANALYTICS: &str = "view_analytics";
pub const MANAGE_USERS: &str = "manage_users";
pub const MANAGE_COLLEGE_SETTINGS: &str = "manage_college_settings";
pub const MANAGE_COLLEGES: &str = "manage_colleges";

/// Every named capability the portal checks for.
pub const ALL: [&str; 14] = [
    VIEW_DASHBOARD,
    VIEW_GRADES,
    MANAGE_GRADES,
    VIEW_ATTENDANCE,
    MANAGE_ATTENDANCE,
    VIEW_COURSES,
    MANAGE_COURSES,
    VIEW_CHILDREN,
    ACCESS_ALUMNI_NETWORK,
    ACCESS_MARKETPLACE,
    VIEW_ANALYTICS,
    MANAGE_USERS,
    MANAGE_COLLEGE_SETTINGS,
    MANAGE_COLLEGES,
];

/// Resolved capabilities of the active user.
///
/// Always derived from a profile; never persisted. Names the registry does not
/// know about resolve to `false` unless the set carries the wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionSet {
    flags: BTreeMap<String, bool>,
    wildcard: bool,
}

impl PermissionSet {
    /// All-false set over the given names.
    pub fn denied<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            flags: names.into_iter().map(|n| (n.to_string(), false)).collect(),
            wildcard: false,
        }
    }

    pub(crate) fn grant(&mut self, permission: &Permission) {
        if permission.is_wildcard() {
            self.wildcard = true;
            for flag in self.flags.values_mut() {
                *flag = true;
            }
        } else {
            self.flags.insert(permission.as_str().to_string(), true);
        }
    }

    pub fn allows(&self, permission: &str) -> bool {
        self.wildcard || self.flags.get(permission).copied().unwrap_or(false)
    }

    pub fn has_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Names currently granted, sorted.
    pub fn granted(&self) -> Vec<&str> {
        self.flags
            .iter()
            .filter(|(_, granted)| **granted)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.flags.iter().map(|(name, granted)| (name.as_str(), *granted))
    }

    pub fn is_all_denied(&self) -> bool {
        !self.wildcard && self.flags.values().all(|granted| !granted)
    }
}

/// Permission state as seen by the UI.
///
/// `Loading` is distinct from an all-false set so callers can avoid denying
/// access before the profile has resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionState {
    Loading,
    Ready(PermissionSet),
}

impl PermissionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, PermissionState::Loading)
    }

    /// `None` while loading.
    pub fn allows(&self, permission: &str) -> Option<bool> {
        match self {
            PermissionState::Loading => None,
            PermissionState::Ready(set) => Some(set.allows(permission)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_names_are_denied() {
        let set = PermissionSet::denied(ALL);
        assert!(!set.allows("launch_rockets"));
        assert!(set.is_all_denied());
    }

    #[test]
    fn wildcard_grants_everything() {
        let mut set = PermissionSet::denied(ALL);
        set.grant(&Permission::from_static(WILDCARD));
        assert!(set.has_wildcard());
        assert!(set.allows(MANAGE_COLLEGES));
        assert!(set.allows("launch_rockets"));
        assert_eq!(set.granted().len(), ALL.len());
    }

    #[test]
    fn loading_state_has_no_answer() {
        assert_eq!(PermissionState::Loading.allows(VIEW_GRADES), None);
        let ready = PermissionState::Ready(PermissionSet::denied(ALL));
        assert_eq!(ready.allows(VIEW_GRADES), Some(false));
    }
}
