//! Session state as reported by the identity provider.
//!
//! `SessionTracker` only records state. Every applied action is broadcast as
//! an [`AuthTransition`]; whoever renders pages subscribes and decides what to
//! show or where to navigate. [`route_decision`] is the guard those
//! subscribers use.

use serde::Serialize;
use std::sync::RwLock;
use tokio::sync::broadcast;

use crate::auth::middleware::AuthUser;

/// Path of the sign-in page.
pub const SIGN_IN_PATH: &str = "/auth";
/// Where signed-in users land.
pub const HOME_PATH: &str = "/";

const TRANSITION_BUFFER: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// Waiting for the provider to report an existing session.
    Loading,
    Unauthenticated,
    Authenticated(AuthUser),
}

impl AuthState {
    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    SignedIn(AuthUser),
    SignedOut,
    /// Result of the startup lookup for a stored session.
    SessionRestored(Option<AuthUser>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthTransition {
    pub from: AuthState,
    pub to: AuthState,
    pub action: AuthAction,
}

/// Applies `action` to `state`. Every action is accepted in every state.
pub fn next_state(_state: &AuthState, action: &AuthAction) -> AuthState {
    match action {
        AuthAction::SignedIn(user) => AuthState::Authenticated(user.clone()),
        AuthAction::SignedOut => AuthState::Unauthenticated,
        AuthAction::SessionRestored(Some(user)) => AuthState::Authenticated(user.clone()),
        AuthAction::SessionRestored(None) => AuthState::Unauthenticated,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "to", rename_all = "snake_case")]
pub enum RouteDecision {
    /// State still loading; render nothing yet.
    Wait,
    Stay,
    Redirect(String),
}

/// Where a visitor on `path` belongs given the current session state.
pub fn route_decision(state: &AuthState, path: &str) -> RouteDecision {
    let on_sign_in = path == SIGN_IN_PATH;
    match state {
        AuthState::Loading => RouteDecision::Wait,
        AuthState::Authenticated(_) if on_sign_in => RouteDecision::Redirect(HOME_PATH.into()),
        AuthState::Unauthenticated if !on_sign_in => {
            RouteDecision::Redirect(SIGN_IN_PATH.into())
        }
        _ => RouteDecision::Stay,
    }
}

pub struct SessionTracker {
    state: RwLock<AuthState>,
    tx: broadcast::Sender<AuthTransition>,
}

impl Default for SessionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTracker {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(TRANSITION_BUFFER);
        Self {
            state: RwLock::new(AuthState::Loading),
            tx,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthTransition> {
        self.tx.subscribe()
    }

    /// Applies `action`, notifies subscribers and returns the transition.
    pub fn apply(&self, action: AuthAction) -> AuthTransition {
        let transition = {
            let mut state = self
                .state
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let to = next_state(&state, &action);
            let from = std::mem::replace(&mut *state, to.clone());
            AuthTransition { from, to, action }
        };

        tracing::debug!(
            from = ?transition.from,
            to = ?transition.to,
            "Auth state changed"
        );
        // No subscribers is not an error.
        let _ = self.tx.send(transition.clone());
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: Some("tailor@example.com".into()),
        }
    }

    #[test]
    fn test_starts_loading() {
        assert_eq!(SessionTracker::new().state(), AuthState::Loading);
    }

    #[test]
    fn test_transition_table() {
        let u = user();
        let states = [
            AuthState::Loading,
            AuthState::Unauthenticated,
            AuthState::Authenticated(u.clone()),
        ];
        for s in &states {
            assert_eq!(
                next_state(s, &AuthAction::SignedIn(u.clone())),
                AuthState::Authenticated(u.clone())
            );
            assert_eq!(next_state(s, &AuthAction::SignedOut), AuthState::Unauthenticated);
            assert_eq!(
                next_state(s, &AuthAction::SessionRestored(Some(u.clone()))),
                AuthState::Authenticated(u.clone())
            );
            assert_eq!(
                next_state(s, &AuthAction::SessionRestored(None)),
                AuthState::Unauthenticated
            );
        }
    }

    #[test]
    fn test_route_decisions() {
        let signed_in = AuthState::Authenticated(user());

        assert_eq!(route_decision(&AuthState::Loading, "/"), RouteDecision::Wait);
        assert_eq!(route_decision(&AuthState::Loading, "/auth"), RouteDecision::Wait);

        assert_eq!(
            route_decision(&signed_in, "/auth"),
            RouteDecision::Redirect("/".into())
        );
        assert_eq!(route_decision(&signed_in, "/"), RouteDecision::Stay);

        assert_eq!(
            route_decision(&AuthState::Unauthenticated, "/"),
            RouteDecision::Redirect("/auth".into())
        );
        assert_eq!(
            route_decision(&AuthState::Unauthenticated, "/auth"),
            RouteDecision::Stay
        );
    }

    #[test]
    fn test_route_decision_serializes() {
        let json = serde_json::to_value(RouteDecision::Redirect("/auth".into())).unwrap();
        assert_eq!(json["action"], "redirect");
        assert_eq!(json["to"], "/auth");
        let json = serde_json::to_value(RouteDecision::Stay).unwrap();
        assert_eq!(json["action"], "stay");
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions_in_order() {
        let tracker = SessionTracker::new();
        let mut rx = tracker.subscribe();
        let u = user();

        tracker.apply(AuthAction::SessionRestored(None));
        tracker.apply(AuthAction::SignedIn(u.clone()));
        tracker.apply(AuthAction::SignedOut);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.from, AuthState::Loading);
        assert_eq!(first.to, AuthState::Unauthenticated);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.action, AuthAction::SignedIn(u.clone()));
        assert_eq!(second.to, AuthState::Authenticated(u));

        let third = rx.recv().await.unwrap();
        assert_eq!(third.to, AuthState::Unauthenticated);
        assert_eq!(tracker.state(), AuthState::Unauthenticated);
    }

    #[test]
    fn test_apply_without_subscribers() {
        let tracker = SessionTracker::new();
        let t = tracker.apply(AuthAction::SignedIn(user()));
        assert!(t.to.user().is_some());
    }
}
