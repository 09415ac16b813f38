//! Sessions, identities, and roles.
//!
//! These are the values the access gate reasons about. A [`Session`] is
//! issued by the authentication provider and carries the [`Identity`] of its
//! subject; the [`Role`] for that identity lives in the profile store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Result};

/// Unique user identifier issued by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Wrap a provider-issued identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An authenticated session attached to a request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque access token.
    pub access_token: String,

    /// Subject of the session.
    pub identity: Identity,

    /// Email address, when the provider reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Session {
    /// Create a session for `identity` backed by `access_token`.
    pub fn new(access_token: impl Into<String>, identity: Identity) -> Self {
        Self {
            access_token: access_token.into(),
            identity,
            email: None,
        }
    }

    /// Set the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

// Keeps access tokens out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Player/coach classification stored per identity.
///
/// `Unknown` covers a missing profile, an unrecognised stored value, and a
/// failed lookup alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    /// An athlete buying analysis services.
    Player,
    /// A coach selling analysis services.
    Coach,
    /// No usable role.
    #[default]
    Unknown,
}

impl Role {
    /// Stored/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Coach => "coach",
            Self::Unknown => "unknown",
        }
    }

    /// Read a stored role value. Anything unrecognised is `Unknown`.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "player" => Self::Player,
            "coach" => Self::Coach,
            _ => Self::Unknown,
        }
    }

    /// True for `Player` and `Coach`.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse: only `player` and `coach` are accepted.
impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match Self::from_stored(s.trim().to_ascii_lowercase().as_str()) {
            Self::Unknown => Err(Error::invalid_data(format!(
                "role must be 'player' or 'coach', got '{s}'"
            ))),
            role => Ok(role),
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.as_deref().map_or(Self::Unknown, Self::from_stored))
    }
}

/// Raw request material a session is resolved from.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Bearer token or session cookie value.
    pub access_token: Option<String>,
}

impl Credentials {
    /// Credentials carrying `token`.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
        }
    }

    /// No credentials at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// True when there is nothing to resolve.
    pub fn is_empty(&self) -> bool {
        self.access_token.as_deref().is_none_or(str::is_empty)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("present", &!self.is_empty())
            .finish()
    }
}

/// Profile record written once at account creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfile {
    /// Identity the profile belongs to.
    pub id: Identity,
    /// Contact email.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Player or coach. Never reassigned.
    #[serde(rename = "user_type")]
    pub role: Role,
}

/// Result of registering a new account with the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    /// The new identity.
    pub identity: Identity,
    /// A session, when the provider signs the user in immediately.
    pub session: Option<Session>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_stored() {
        assert_eq!(Role::from_stored("player"), Role::Player);
        assert_eq!(Role::from_stored("coach"), Role::Coach);
        assert_eq!(Role::from_stored("admin"), Role::Unknown);
        assert_eq!(Role::from_stored(""), Role::Unknown);
    }

    #[test]
    fn test_role_from_str_is_strict() {
        assert_eq!("Coach".parse::<Role>().unwrap(), Role::Coach);
        assert_eq!(" player ".parse::<Role>().unwrap(), Role::Player);
        assert!("unknown".parse::<Role>().is_err());
        assert!("referee".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_deserialize_lenient() {
        let roles: Vec<Role> =
            serde_json::from_str(r#"["player", "coach", "scout", null]"#).unwrap();
        assert_eq!(
            roles,
            vec![Role::Player, Role::Coach, Role::Unknown, Role::Unknown]
        );
    }

    #[test]
    fn test_role_serialize() {
        assert_eq!(serde_json::to_string(&Role::Coach).unwrap(), "\"coach\"");
    }

    #[test]
    fn test_session_debug_hides_token() {
        let session = Session::new("secret-token", Identity::new("u-1")).with_email("a@b.c");
        let debug = format!("{session:?}");
        assert!(debug.contains("u-1"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn test_credentials_empty() {
        assert!(Credentials::none().is_empty());
        assert!(Credentials::bearer("").is_empty());
        assert!(!Credentials::bearer("tok").is_empty());
        assert!(!format!("{:?}", Credentials::bearer("tok")).contains("tok"));
    }

    #[test]
    fn test_new_profile_wire_names() {
        let profile = NewProfile {
            id: Identity::new("u-9"),
            email: "coach@example.com".into(),
            full_name: "Pat Coach".into(),
            role: Role::Coach,
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["id"], "u-9");
        assert_eq!(json["user_type"], "coach");
    }
}
