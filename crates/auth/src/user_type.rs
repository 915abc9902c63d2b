use serde::{Deserialize, Serialize};

/// Account type of a portal user, as stored on the profile row.
///
/// Unknown values coming from the hosted store are preserved as
/// [`UserType::Other`] instead of failing deserialization; callers decide how
/// to treat them (the route guard refuses to navigate).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UserType {
    Student,
    Faculty,
    Admin,
    SuperAdmin,
    Parent,
    Alumni,
    Other(String),
}

impl UserType {
    pub const KNOWN: [UserType; 6] = [
        UserType::Student,
        UserType::Faculty,
        UserType::Admin,
        UserType::SuperAdmin,
        UserType::Parent,
        UserType::Alumni,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            UserType::Student => "student",
            UserType::Faculty => "faculty",
            UserType::Admin => "admin",
            UserType::SuperAdmin => "super_admin",
            UserType::Parent => "parent",
            UserType::Alumni => "alumni",
            UserType::Other(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, UserType::Other(_))
    }
}

impl From<&str> for UserType {
    fn from(value: &str) -> Self {
        match value {
            "student" => UserType::Student,
            "faculty" => UserType::Faculty,
            "admin" => UserType::Admin,
            "super_admin" => UserType::SuperAdmin,
            "parent" => UserType::Parent,
            "alumni" => UserType::Alumni,
            other => UserType::Other(other.to_string()),
        }
    }
}

impl From<String> for UserType {
    fn from(value: String) -> Self {
        match UserType::from(value.as_str()) {
            UserType::Other(_) => UserType::Other(value),
            known => known,
        }
    }
}

impl From<UserType> for String {
    fn from(value: UserType) -> Self {
        match value {
            UserType::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl core::fmt::Display for UserType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types_parse() {
        for t in UserType::KNOWN {
            assert_eq!(UserType::from(t.as_str()), t);
        }
    }

    #[test]
    fn unknown_type_is_preserved() {
        let t: UserType = serde_json::from_str("\"unknown_role\"").unwrap();
        assert_eq!(t, UserType::Other("unknown_role".to_string()));
        assert!(!t.is_known());
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"unknown_role\"");
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(!UserType::from("Student").is_known());
    }
}
