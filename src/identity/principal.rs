use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};

/// Privilege levels, ordered `Owner > Admin > Member > Other`.
///
/// Unknown role names are kept verbatim and rank lowest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Owner,
    Admin,
    #[default]
    Member,
    Other(String),
}

impl Role {
    pub fn parse(s: &str) -> Role {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Role::Owner,
            "admin" => Role::Admin,
            // the backend issues "user" for self-registered accounts
            "member" | "user" | "" => Role::Member,
            other => Role::Other(other.to_string()),
        }
    }

    pub fn rank(&self) -> u8 {
        match self {
            Role::Owner => 3,
            Role::Admin => 2,
            Role::Member => 1,
            Role::Other(_) => 0,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Member => "member",
            Role::Other(name) => name.as_str(),
        }
    }

    pub fn at_least(&self, other: &Role) -> bool { self.rank() >= other.rank() }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank()).then_with(|| self.as_str().cmp(other.as_str()))
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self { Role::parse(&s) }
}

impl From<Role> for String {
    fn from(r: Role) -> Self { r.as_str().to_string() }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// Backend user ids arrive as integers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Int(i64),
    Text(String),
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UserId::Int(n) => write!(f, "{}", n),
            UserId::Text(s) => f.write_str(s),
        }
    }
}

/// Authoritative identity as resolved from the backend for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserIdentity {
    pub fn new(email: &str, role: Role) -> Self {
        Self { id: None, email: email.to_string(), role, display_name: None, extra: Map::new() }
    }

    /// Decode a backend user payload. Older backends send the account
    /// identifier as `username`; it is accepted when `email` is absent.
    pub fn from_value(v: Value) -> AppResult<Self> {
        if !v.is_object() {
            return Err(AppError::io("malformed_response", "identity payload is not an object"));
        }
        let mut user: UserIdentity = serde_json::from_value(v)
            .map_err(|e| AppError::io("malformed_response", format!("invalid identity payload: {}", e)))?;
        if user.email.trim().is_empty() {
            if let Some(Value::String(name)) = user.extra.remove("username") {
                user.email = name;
            }
        }
        if user.email.trim().is_empty() {
            return Err(AppError::io("malformed_response", "identity payload has no account identifier"));
        }
        Ok(user)
    }

    /// display_name, falling back to email.
    pub fn display_label(&self) -> &str {
        match self.display_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name,
            _ => self.email.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_ordering() {
        assert!(Role::Owner > Role::Admin);
        assert!(Role::Admin > Role::Member);
        assert!(Role::Member > Role::Other("guest".into()));
        assert!(Role::Owner.at_least(&Role::Admin));
        assert!(!Role::Member.at_least(&Role::Admin));
    }

    #[test]
    fn role_parse_is_case_insensitive_and_keeps_unknowns() {
        assert_eq!(Role::parse(" ADMIN "), Role::Admin);
        assert_eq!(Role::parse("user"), Role::Member);
        assert_eq!(Role::parse("auditor"), Role::Other("auditor".into()));
        assert_eq!(String::from(Role::Other("auditor".into())), "auditor");
    }

    #[test]
    fn identity_decodes_with_extension_attributes() {
        let u = UserIdentity::from_value(json!({
            "id": 7, "email": "a@b.com", "role": "owner", "display_name": "Ann", "avatar_url": "https://x/y.png"
        })).unwrap();
        assert_eq!(u.id, Some(UserId::Int(7)));
        assert_eq!(u.role, Role::Owner);
        assert_eq!(u.display_label(), "Ann");
        assert_eq!(u.extra.get("avatar_url"), Some(&json!("https://x/y.png")));
    }

    #[test]
    fn identity_defaults_role_and_accepts_username_alias() {
        let u = UserIdentity::from_value(json!({"id": "u-1", "username": "c@d.io"})).unwrap();
        assert_eq!(u.email, "c@d.io");
        assert_eq!(u.role, Role::Member);
        assert_eq!(u.display_label(), "c@d.io");
        assert!(!u.extra.contains_key("username"));
    }

    #[test]
    fn identity_without_account_identifier_is_rejected() {
        assert!(UserIdentity::from_value(json!({"role": "admin"})).is_err());
        assert!(UserIdentity::from_value(json!(["a@b.com"])).is_err());
    }

    #[test]
    fn identity_serializes_role_as_plain_string() {
        let v = serde_json::to_value(UserIdentity::new("a@b.com", Role::Admin)).unwrap();
        assert_eq!(v, json!({"email": "a@b.com", "role": "admin"}));
    }
}
