//! Route table and path classification.
//!
//! Every gated request path falls into exactly one [`PathClass`]. Public
//! paths match exactly; role-scoped paths match by segment-aware prefix, so
//! `/player` and `/player/dashboard` are player-scoped but `/players` is not.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result, Role};

/// Access class of a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathClass {
    /// Reachable without a session (landing, login, signup).
    Public,
    /// Only for sessions whose role is `player`.
    PlayerScoped,
    /// Only for sessions whose role is `coach`.
    CoachScoped,
    /// Any session, any role.
    OtherAuthenticated,
}

/// Static routing constants the gate decides against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteTable {
    /// Paths reachable without a session, matched exactly.
    #[serde(deserialize_with = "path_list")]
    pub public: Vec<String>,

    /// Prefix of the player area.
    pub player_prefix: String,

    /// Prefix of the coach area.
    pub coach_prefix: String,

    /// Where unauthenticated or unauthorized requests are sent.
    pub login: String,

    /// Landing page for signed-in players.
    pub player_home: String,

    /// Landing page for signed-in coaches.
    pub coach_home: String,

    /// Prefixes the gate does not run on at all (API, static assets).
    #[serde(deserialize_with = "path_list")]
    pub bypass: Vec<String>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            public: vec!["/".into(), "/login".into(), "/signup".into()],
            player_prefix: "/player".into(),
            coach_prefix: "/coach".into(),
            login: "/login".into(),
            player_home: "/player/dashboard".into(),
            coach_home: "/coach/dashboard".into(),
            bypass: vec!["/api".into(), "/static".into(), "/favicon.ico".into()],
        }
    }
}

impl RouteTable {
    /// Classify a request path.
    pub fn classify(&self, path: &str) -> PathClass {
        let path = normalize_path(path);
        if self.public.iter().any(|p| normalize_path(p) == path) {
            PathClass::Public
        } else if has_segment_prefix(path, &self.player_prefix) {
            PathClass::PlayerScoped
        } else if has_segment_prefix(path, &self.coach_prefix) {
            PathClass::CoachScoped
        } else {
            PathClass::OtherAuthenticated
        }
    }

    /// True when the gate should not run for `path`.
    pub fn is_bypassed(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.bypass.iter().any(|prefix| has_segment_prefix(path, prefix))
    }

    /// Home page for a role; `None` for `Unknown`.
    pub fn home_for(&self, role: Role) -> Option<&str> {
        match role {
            Role::Player => Some(&self.player_home),
            Role::Coach => Some(&self.coach_home),
            Role::Unknown => None,
        }
    }

    /// Reject tables that would make the gate loop or lock users out.
    ///
    /// Each home page must sit inside its own role's area, the login page must
    /// be public, and no public path may be bypassed or role-scoped.
    pub fn validate(&self) -> Result<()> {
        for path in std::iter::once(&self.login)
            .chain(&self.public)
            .chain([&self.player_home, &self.coach_home])
            .chain([&self.player_prefix, &self.coach_prefix])
        {
            if !path.starts_with('/') {
                return Err(Error::config(format!(
                    "route '{path}' must start with '/'"
                )));
            }
        }

        if self.classify(&self.login) != PathClass::Public {
            return Err(Error::config(format!(
                "login path '{}' must be listed as public",
                self.login
            )));
        }
        if self.classify(&self.player_home) != PathClass::PlayerScoped {
            return Err(Error::config(format!(
                "player home '{}' must be under '{}'",
                self.player_home, self.player_prefix
            )));
        }
        if self.classify(&self.coach_home) != PathClass::CoachScoped {
            return Err(Error::config(format!(
                "coach home '{}' must be under '{}'",
                self.coach_home, self.coach_prefix
            )));
        }
        if has_segment_prefix(&self.player_prefix, &self.coach_prefix)
            || has_segment_prefix(&self.coach_prefix, &self.player_prefix)
        {
            return Err(Error::config("player and coach prefixes must not overlap"));
        }
        for path in &self.public {
            if self.is_bypassed(path) {
                return Err(Error::config(format!(
                    "public path '{path}' is also bypassed"
                )));
            }
            if has_segment_prefix(normalize_path(path), &self.player_prefix)
                || has_segment_prefix(normalize_path(path), &self.coach_prefix)
            {
                return Err(Error::config(format!(
                    "public path '{path}' falls inside a role area"
                )));
            }
        }
        Ok(())
    }
}

/// A list of paths given as a sequence, a JSON array string
/// (`["/","/login"]`), or a comma-separated string (`/,/login`).
///
/// Environment overlays arrive as strings, and `config export` writes lists
/// as JSON arrays.
fn path_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::List(paths) => Ok(paths),
        Raw::Str(s) => {
            let s = s.trim();
            if s.starts_with('[') {
                return serde_json::from_str(s).map_err(D::Error::custom);
            }
            Ok(s.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect())
        }
    }
}

/// Drop a single trailing slash; the root stays `/`.
pub fn normalize_path(path: &str) -> &str {
    if path.is_empty() {
        return "/";
    }
    match path.strip_suffix('/') {
        Some("") | None => path,
        Some(trimmed) => trimmed,
    }
}

fn has_segment_prefix(path: &str, prefix: &str) -> bool {
    let prefix = normalize_path(prefix);
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_default_table() {
        let routes = RouteTable::default();
        assert_eq!(routes.classify("/"), PathClass::Public);
        assert_eq!(routes.classify("/login"), PathClass::Public);
        assert_eq!(routes.classify("/signup"), PathClass::Public);
        assert_eq!(routes.classify("/player/dashboard"), PathClass::PlayerScoped);
        assert_eq!(routes.classify("/player"), PathClass::PlayerScoped);
        assert_eq!(routes.classify("/coach/services"), PathClass::CoachScoped);
        assert_eq!(routes.classify("/marketplace"), PathClass::OtherAuthenticated);
    }

    #[test]
    fn test_classify_prefix_is_segment_aware() {
        let routes = RouteTable::default();
        assert_eq!(routes.classify("/players"), PathClass::OtherAuthenticated);
        assert_eq!(routes.classify("/coaching"), PathClass::OtherAuthenticated);
    }

    #[test]
    fn test_classify_public_is_exact() {
        let routes = RouteTable::default();
        assert_eq!(routes.classify("/login/extra"), PathClass::OtherAuthenticated);
        assert_eq!(routes.classify("/login/"), PathClass::Public);
        assert_eq!(routes.classify(""), PathClass::Public);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/coach/"), "/coach");
        assert_eq!(normalize_path("/coach"), "/coach");
    }

    #[test]
    fn test_bypass() {
        let routes = RouteTable::default();
        assert!(routes.is_bypassed("/api/auth/signin"));
        assert!(routes.is_bypassed("/api"));
        assert!(routes.is_bypassed("/favicon.ico"));
        assert!(routes.is_bypassed("/static/app.css"));
        assert!(!routes.is_bypassed("/apiary"));
        assert!(!routes.is_bypassed("/login"));
    }

    #[test]
    fn test_home_for() {
        let routes = RouteTable::default();
        assert_eq!(routes.home_for(Role::Player), Some("/player/dashboard"));
        assert_eq!(routes.home_for(Role::Coach), Some("/coach/dashboard"));
        assert_eq!(routes.home_for(Role::Unknown), None);
    }

    #[test]
    fn test_validate_default() {
        RouteTable::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_home_outside_area() {
        let routes = RouteTable {
            player_home: "/dashboard".into(),
            ..Default::default()
        };
        assert!(matches!(routes.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_private_login() {
        let routes = RouteTable {
            login: "/sign-in".into(),
            ..Default::default()
        };
        assert!(routes.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overlapping_prefixes() {
        let routes = RouteTable {
            coach_prefix: "/player/coach".into(),
            coach_home: "/player/coach/home".into(),
            ..Default::default()
        };
        assert!(routes.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bypassed_public_path() {
        let mut routes = RouteTable::default();
        routes.bypass.push("/signup".into());
        assert!(routes.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_table() {
        let routes: RouteTable = serde_json::from_str(r#"{"login": "/login"}"#).unwrap();
        assert_eq!(routes, RouteTable::default());
    }

    #[test]
    fn test_path_lists_accept_strings() {
        let routes: RouteTable = serde_json::from_str(
            r#"{"public": "[\"/\",\"/sign-in\"]", "bypass": " /api , /assets,"}"#,
        )
        .unwrap();
        assert_eq!(routes.public, ["/", "/sign-in"]);
        assert_eq!(routes.bypass, ["/api", "/assets"]);

        let routes: RouteTable = serde_json::from_str(r#"{"public": ["/"]}"#).unwrap();
        assert_eq!(routes.public, ["/"]);

        assert!(serde_json::from_str::<RouteTable>(r#"{"public": "[\"/\""}"#).is_err());
    }
}
