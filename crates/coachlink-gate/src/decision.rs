//! The gate's decision procedure.

use coachlink_core::{PathClass, Role, RouteTable};
use serde::Serialize;

/// Outcome of gating one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    /// Hand the request to the page handler.
    Allow,
    /// Send the client elsewhere.
    Redirect {
        /// Target path.
        location: String,
        /// Why. Logged, never sent to the client.
        reason: RedirectReason,
    },
}

/// Why a request was redirected.
///
/// `NoSession` and `RoleMismatch` both send the client to the login page and
/// produce identical responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    /// Non-public path without a session.
    NoSession,
    /// Role-scoped path and the session's role does not match.
    RoleMismatch,
    /// Signed-in user with a known role landed on a public page.
    AlreadySignedIn,
}

impl Decision {
    /// True for [`Decision::Allow`].
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Redirect target, if any.
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::Redirect { location, .. } => Some(location),
        }
    }

    fn login_redirect(routes: &RouteTable, reason: RedirectReason) -> Self {
        Self::Redirect {
            location: routes.login.clone(),
            reason,
        }
    }
}

/// Decide what to do with a request.
///
/// `role` is only consulted when `has_session` is true; callers pass
/// [`Role::Unknown`] when the lookup failed or found nothing.
pub fn decide(class: PathClass, has_session: bool, role: Role, routes: &RouteTable) -> Decision {
    if !has_session {
        return match class {
            PathClass::Public => Decision::Allow,
            _ => Decision::login_redirect(routes, RedirectReason::NoSession),
        };
    }

    match class {
        PathClass::PlayerScoped if role != Role::Player => {
            Decision::login_redirect(routes, RedirectReason::RoleMismatch)
        }
        PathClass::CoachScoped if role != Role::Coach => {
            Decision::login_redirect(routes, RedirectReason::RoleMismatch)
        }
        PathClass::Public => match routes.home_for(role) {
            Some(home) => Decision::Redirect {
                location: home.to_string(),
                reason: RedirectReason::AlreadySignedIn,
            },
            None => Decision::Allow,
        },
        _ => Decision::Allow,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn routes() -> RouteTable {
        RouteTable::default()
    }

    fn at(path: &str, has_session: bool, role: Role) -> Decision {
        let routes = routes();
        decide(routes.classify(path), has_session, role, &routes)
    }

    // ------------------------------------------------------------------------
    // Scenarios
    // ------------------------------------------------------------------------

    #[test]
    fn test_no_session_player_dashboard_goes_to_login() {
        let decision = at("/player/dashboard", false, Role::Unknown);
        assert_eq!(decision.location(), Some("/login"));
        assert!(matches!(
            decision,
            Decision::Redirect {
                reason: RedirectReason::NoSession,
                ..
            }
        ));
    }

    #[test]
    fn test_coach_on_coach_dashboard_allowed() {
        assert!(at("/coach/dashboard", true, Role::Coach).is_allow());
    }

    #[test]
    fn test_coach_on_player_dashboard_goes_to_login() {
        let decision = at("/player/dashboard", true, Role::Coach);
        assert_eq!(
            decision,
            Decision::Redirect {
                location: "/login".into(),
                reason: RedirectReason::RoleMismatch,
            }
        );
    }

    #[test]
    fn test_player_on_login_goes_home() {
        let decision = at("/login", true, Role::Player);
        assert_eq!(
            decision,
            Decision::Redirect {
                location: "/player/dashboard".into(),
                reason: RedirectReason::AlreadySignedIn,
            }
        );
    }

    #[test]
    fn test_unknown_role_on_root_allowed() {
        assert!(at("/", true, Role::Unknown).is_allow());
    }

    #[test]
    fn test_no_session_root_allowed() {
        assert!(at("/", false, Role::Unknown).is_allow());
    }

    // ------------------------------------------------------------------------
    // Remaining branches
    // ------------------------------------------------------------------------

    #[test]
    fn test_coach_on_signup_goes_to_coach_home() {
        assert_eq!(
            at("/signup", true, Role::Coach).location(),
            Some("/coach/dashboard")
        );
    }

    #[test]
    fn test_player_on_root_goes_home() {
        assert_eq!(at("/", true, Role::Player).location(), Some("/player/dashboard"));
    }

    #[test]
    fn test_unknown_role_on_scoped_paths_goes_to_login() {
        assert_eq!(at("/player/profile", true, Role::Unknown).location(), Some("/login"));
        assert_eq!(at("/coach/services", true, Role::Unknown).location(), Some("/login"));
    }

    #[test]
    fn test_other_authenticated_any_role() {
        for role in [Role::Player, Role::Coach, Role::Unknown] {
            assert!(at("/marketplace", true, role).is_allow());
        }
        assert_eq!(at("/marketplace", false, Role::Unknown).location(), Some("/login"));
    }

    #[test]
    fn test_role_ignored_without_session() {
        assert_eq!(at("/coach/dashboard", false, Role::Coach).location(), Some("/login"));
        assert!(at("/login", false, Role::Player).is_allow());
    }

    #[test]
    fn test_wrong_role_and_no_session_look_the_same() {
        let denied = at("/coach/settings", true, Role::Player);
        let anonymous = at("/coach/settings", false, Role::Unknown);
        assert_eq!(denied.location(), anonymous.location());
    }

    #[test]
    fn test_decision_serializes_with_action_tag() {
        let json = serde_json::to_string(&at("/player", false, Role::Unknown)).unwrap();
        assert_eq!(json, r#"{"action":"redirect","location":"/login","reason":"no_session"}"#);
        assert_eq!(
            serde_json::to_string(&Decision::Allow).unwrap(),
            r#"{"action":"allow"}"#
        );
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    fn segment() -> impl Strategy<Value = String> {
        "[a-z0-9_-]{1,12}"
    }

    proptest! {
        #[test]
        fn prop_player_never_reaches_coach_area(seg in segment()) {
            let path = format!("/coach/{seg}");
            prop_assert_eq!(at(&path, true, Role::Player).location(), Some("/login"));
        }

        #[test]
        fn prop_coach_never_reaches_player_area(seg in segment()) {
            let path = format!("/player/{seg}");
            prop_assert_eq!(at(&path, true, Role::Coach).location(), Some("/login"));
        }

        #[test]
        fn prop_anonymous_non_public_goes_to_login(seg in segment()) {
            let path = format!("/{seg}");
            let routes = routes();
            if routes.classify(&path) != PathClass::Public {
                prop_assert_eq!(at(&path, false, Role::Unknown).location(), Some("/login"));
            }
        }

        #[test]
        fn prop_role_home_is_reachable(role in prop_oneof![Just(Role::Player), Just(Role::Coach)]) {
            let routes = routes();
            let home = routes.home_for(role).unwrap().to_string();
            prop_assert!(at(&home, true, role).is_allow());
        }
    }
}
