//! Restart scenarios: a token written by one manager is picked up by the
//! next one built over the same directory.

use std::sync::Arc;

use gavel_protocol::UserId;
use gavel_session::{
    AuthBackend, AuthGrant, AuthSessionManager, CredentialStore,
    FileCredentialStore, SessionConfig, SessionError, UserInfo,
};

/// Accepts any password and treats every token except `"revoked"` as
/// valid.
struct StubBackend;

impl AuthBackend for StubBackend {
    async fn login(
        &self,
        username: &str,
        _password: &str,
    ) -> Result<AuthGrant, SessionError> {
        Ok(AuthGrant {
            token: format!("token-for-{username}"),
            user: UserInfo {
                id: UserId(7),
                username: username.into(),
                role: None,
            },
        })
    }

    async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthGrant, SessionError> {
        self.login(username, password).await
    }

    async fn whoami(&self, token: &str) -> Result<UserInfo, SessionError> {
        if token == "revoked" {
            return Err(SessionError::Unauthorized);
        }
        Ok(UserInfo {
            id: UserId(7),
            username: "alice".into(),
            role: Some("user".into()),
        })
    }
}

fn manager(dir: &std::path::Path) -> Arc<AuthSessionManager<StubBackend>> {
    Arc::new(AuthSessionManager::new(
        StubBackend,
        FileCredentialStore::open(dir),
        SessionConfig::default(),
    ))
}

#[tokio::test]
async fn test_login_then_restart_rehydrates_and_confirms() {
    let dir = tempfile::tempdir().unwrap();

    let first = manager(dir.path());
    first.login("alice", "pw").await.unwrap();
    drop(first);

    let second = manager(dir.path());
    let session = second.current_session();
    assert!(session.is_provisional());
    assert_eq!(session.token(), Some("token-for-alice"));

    second.spawn_confirmation().unwrap().await.unwrap();

    let session = second.current_session();
    assert!(!session.is_provisional());
    assert_eq!(session.user_id(), Some(UserId(7)));
}

#[tokio::test]
async fn test_revoked_token_at_startup_ends_anonymous_with_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    FileCredentialStore::open(dir.path()).set("revoked");

    let mgr = manager(dir.path());
    assert!(mgr.current_session().is_provisional());

    let err = mgr.confirm().await.unwrap_err();
    assert_eq!(err, SessionError::Unauthorized);
    assert!(!mgr.current_session().is_authenticated());

    let reopened = FileCredentialStore::open(dir.path());
    assert_eq!(reopened.get(), None);
}

#[tokio::test]
async fn test_logout_then_restart_is_anonymous() {
    let dir = tempfile::tempdir().unwrap();

    let first = manager(dir.path());
    first.login("alice", "pw").await.unwrap();
    first.logout();
    drop(first);

    let second = manager(dir.path());
    assert!(!second.current_session().is_authenticated());
    assert!(second.spawn_confirmation().is_none());
}
