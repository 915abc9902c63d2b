//! Portal user profile, as returned by the hosted profile store.

use serde::{Deserialize, Serialize};

use portal_core::{CollegeId, UserId};

use crate::UserType;

/// Profile row of an authenticated user.
///
/// Only active profiles may be cached or trusted; see [`Profile::is_valid`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,

    pub user_type: UserType,

    pub is_active: bool,

    /// Tenant (college) the user belongs to. Platform-level accounts have none.
    #[serde(default)]
    pub college_id: Option<CollegeId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl Profile {
    pub fn new(id: UserId, user_type: UserType) -> Self {
        Self {
            id,
            user_type,
            is_active: true,
            college_id: None,
            email: None,
            full_name: None,
        }
    }

    pub fn with_college(mut self, college_id: CollegeId) -> Self {
        self.college_id = Some(college_id);
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.is_active
    }

    /// A profile is usable for a session only if it is valid and was issued
    /// for that session's user.
    pub fn is_valid_for(&self, user_id: &UserId) -> bool {
        self.is_valid() && &self.id == user_id
    }
}
