use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::models::UserType;
use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Candidate,
    Company,
}

impl AuthState {
    /// A token with a missing or unrecognised user type counts as logged
    /// out, so it lands on the login page instead of bouncing between
    /// login and dashboard.
    pub fn from_store(store: &dyn SessionStore) -> Self {
        if !store.is_authenticated() {
            return AuthState::Unauthenticated;
        }
        match store.user_type() {
            Some(UserType::Candidate) => AuthState::Candidate,
            Some(UserType::Company) => AuthState::Company,
            None => AuthState::Unauthenticated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Dashboard,
    Profile,
    ResumeUpload,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Route::Login => "/login",
            Route::Dashboard => "/",
            Route::Profile => "/profile",
            Route::ResumeUpload => "/resume-upload",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Login,
    CandidateDashboard,
    CompanyDashboard,
    CandidateProfile,
    CompanyProfile,
    BulkUpload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Render(Page),
    Redirect(Route),
}

pub fn resolve(state: AuthState, route: Route) -> Outcome {
    use AuthState::*;
    match (route, state) {
        (Route::Login, Unauthenticated) => Outcome::Render(Page::Login),
        (Route::Login, _) => Outcome::Redirect(Route::Dashboard),

        (_, Unauthenticated) => Outcome::Redirect(Route::Login),

        (Route::Dashboard, Candidate) => Outcome::Render(Page::CandidateDashboard),
        (Route::Dashboard, Company) => Outcome::Render(Page::CompanyDashboard),

        (Route::Profile, Candidate) => Outcome::Render(Page::CandidateProfile),
        (Route::Profile, Company) => Outcome::Render(Page::CompanyProfile),

        (Route::ResumeUpload, Company) => Outcome::Render(Page::BulkUpload),
        (Route::ResumeUpload, Candidate) => Outcome::Redirect(Route::Dashboard),
    }
}

/// Caches the auth state derived from a session store and re-derives it
/// when the store's revision moves.
pub struct RouteGuard {
    store: Arc<dyn SessionStore>,
    state: AuthState,
    seen_revision: u64,
}

impl RouteGuard {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        let seen_revision = store.revision();
        let state = AuthState::from_store(store.as_ref());
        Self {
            store,
            state,
            seen_revision,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn resolve(&self, route: Route) -> Outcome {
        resolve(self.state, route)
    }

    /// Re-reads the store if it changed since the last look. Returns true
    /// when the auth state itself changed.
    pub fn refresh(&mut self) -> bool {
        let revision = self.store.revision();
        if revision == self.seen_revision {
            return false;
        }
        self.seen_revision = revision;

        let next = AuthState::from_store(self.store.as_ref());
        if next == self.state {
            return false;
        }
        info!(from = ?self.state, to = ?next, "session changed");
        self.state = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemorySessionStore, StoredSession};
    use serde_json::json;

    #[test]
    fn test_unauthenticated_routes() {
        let s = AuthState::Unauthenticated;
        assert_eq!(resolve(s, Route::Login), Outcome::Render(Page::Login));
        assert_eq!(resolve(s, Route::Dashboard), Outcome::Redirect(Route::Login));
        assert_eq!(resolve(s, Route::Profile), Outcome::Redirect(Route::Login));
        assert_eq!(resolve(s, Route::ResumeUpload), Outcome::Redirect(Route::Login));
    }

    #[test]
    fn test_candidate_routes() {
        let s = AuthState::Candidate;
        assert_eq!(resolve(s, Route::Login), Outcome::Redirect(Route::Dashboard));
        assert_eq!(resolve(s, Route::Dashboard), Outcome::Render(Page::CandidateDashboard));
        assert_eq!(resolve(s, Route::Profile), Outcome::Render(Page::CandidateProfile));
        assert_eq!(resolve(s, Route::ResumeUpload), Outcome::Redirect(Route::Dashboard));
    }

    #[test]
    fn test_company_routes() {
        let s = AuthState::Company;
        assert_eq!(resolve(s, Route::Login), Outcome::Redirect(Route::Dashboard));
        assert_eq!(resolve(s, Route::Dashboard), Outcome::Render(Page::CompanyDashboard));
        assert_eq!(resolve(s, Route::Profile), Outcome::Render(Page::CompanyProfile));
        assert_eq!(resolve(s, Route::ResumeUpload), Outcome::Render(Page::BulkUpload));
    }

    #[test]
    fn test_token_without_known_type_goes_to_login() {
        let store = MemorySessionStore::new();
        store
            .write(&StoredSession {
                token: Some("tok".to_string()),
                user_type: Some("recruiter".to_string()),
                user_data: None,
            })
            .unwrap();

        let guard = RouteGuard::new(Arc::new(store));
        assert_eq!(guard.state(), AuthState::Unauthenticated);
        assert_eq!(guard.resolve(Route::Dashboard), Outcome::Redirect(Route::Login));
        assert_eq!(guard.resolve(Route::Login), Outcome::Render(Page::Login));
    }

    #[test]
    fn test_refresh_follows_logout_elsewhere() {
        let store = Arc::new(MemorySessionStore::new());
        store.login("tok", UserType::Company, json!({})).unwrap();

        let mut guard = RouteGuard::new(store.clone());
        assert_eq!(guard.state(), AuthState::Company);
        assert!(!guard.refresh());

        store.logout().unwrap();
        assert!(guard.refresh());
        assert_eq!(guard.state(), AuthState::Unauthenticated);
        assert_eq!(guard.resolve(Route::Dashboard), Outcome::Redirect(Route::Login));
    }

    #[test]
    fn test_refresh_ignores_same_state_rewrite() {
        let store = Arc::new(MemorySessionStore::new());
        store.login("tok-1", UserType::Candidate, json!({})).unwrap();
        let mut guard = RouteGuard::new(store.clone());

        store.login("tok-2", UserType::Candidate, json!({})).unwrap();
        assert!(!guard.refresh());
        assert_eq!(guard.state(), AuthState::Candidate);
    }
}
