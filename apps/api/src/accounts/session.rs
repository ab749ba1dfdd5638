use serde::Serialize;
use tracing::warn;

use crate::models::user::{get_user, User, UserRole};
use crate::store::DocumentStore;

pub const LOGIN_PATH: &str = "/login";

/// What the client needs to bootstrap after an auth-state change.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub identity: Option<String>,
    pub profile: Option<User>,
    pub logged_in: bool,
    pub dashboard: &'static str,
}

/// Landing page for a profile; callers without one are sent to sign in.
pub fn dashboard_for(profile: Option<&User>) -> &'static str {
    match profile.map(|p| p.role) {
        Some(UserRole::Admin) => "/dashboard/admin",
        Some(UserRole::Employer) => "/dashboard/employer",
        Some(UserRole::Seeker) => "/dashboard/seeker",
        Some(UserRole::Recruiter) => "/dashboard/recruiter",
        None => LOGIN_PATH,
    }
}

/// Resolves an identity to its profile and dashboard. Never fails: a profile
/// that cannot be read is logged and treated as absent.
pub async fn resolve_session(store: &dyn DocumentStore, identity: Option<&str>) -> Session {
    let Some(uid) = identity else {
        return Session {
            identity: None,
            profile: None,
            logged_in: false,
            dashboard: LOGIN_PATH,
        };
    };

    let profile = match get_user(store, uid).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(uid, "profile lookup failed: {e}");
            None
        }
    };

    Session {
        identity: Some(uid.to_string()),
        dashboard: dashboard_for(profile.as_ref()),
        profile,
        logged_in: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{create_user, NewUser, COLLECTION};
    use crate::store::{to_body, InMemoryDocumentStore};
    use serde_json::json;

    #[tokio::test]
    async fn test_no_identity_is_logged_out() {
        let store = InMemoryDocumentStore::new();
        let session = resolve_session(&store, None).await;
        assert!(!session.logged_in);
        assert!(session.profile.is_none());
        assert_eq!(session.dashboard, LOGIN_PATH);
    }

    #[tokio::test]
    async fn test_roles_route_to_dashboards() {
        let store = InMemoryDocumentStore::new();
        for (uid, role) in [
            ("a", UserRole::Admin),
            ("e", UserRole::Employer),
            ("s", UserRole::Seeker),
            ("r", UserRole::Recruiter),
        ] {
            create_user(
                &store,
                uid,
                NewUser {
                    email: None,
                    display_name: None,
                    role,
                },
            )
            .await
            .unwrap();
        }

        assert_eq!(resolve_session(&store, Some("a")).await.dashboard, "/dashboard/admin");
        assert_eq!(resolve_session(&store, Some("e")).await.dashboard, "/dashboard/employer");
        assert_eq!(resolve_session(&store, Some("s")).await.dashboard, "/dashboard/seeker");
        assert_eq!(resolve_session(&store, Some("r")).await.dashboard, "/dashboard/recruiter");
    }

    #[tokio::test]
    async fn test_identity_without_profile_goes_to_login() {
        let store = InMemoryDocumentStore::new();
        let session = resolve_session(&store, Some("new-user")).await;
        assert!(session.logged_in);
        assert_eq!(session.identity.as_deref(), Some("new-user"));
        assert_eq!(session.dashboard, LOGIN_PATH);
    }

    #[tokio::test]
    async fn test_unreadable_profile_is_treated_as_absent() {
        let store = InMemoryDocumentStore::new();
        store
            .create(
                COLLECTION,
                Some("broken".to_string()),
                to_body(&json!({ "role": 7 })).unwrap(),
            )
            .await
            .unwrap();

        let session = resolve_session(&store, Some("broken")).await;
        assert!(session.logged_in);
        assert!(session.profile.is_none());
        assert_eq!(session.dashboard, LOGIN_PATH);
    }
}
