//! Authentication backend capability
//!
//! The dispatcher hands every well-formed Access-Request to an
//! [`AuthBackend`]. A backend answers with an [`AuthOutcome`]; expected
//! negative answers (unknown user, disabled account, wrong password) are
//! `Ok(AuthOutcome::reject(..))`. `Err(BackendError)` is reserved for the
//! backend being unable to decide at all, and the dispatcher turns that into
//! an Access-Reject as well.

use crate::config::User;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("backend timed out")]
    Timeout,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Decision returned by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOutcome {
    pub accepted: bool,
    /// Human-readable reason. Logged and audited server-side only; never
    /// placed on the wire.
    pub reason: String,
}

impl AuthOutcome {
    pub fn accept() -> Self {
        AuthOutcome {
            accepted: true,
            reason: "accepted".to_string(),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        AuthOutcome {
            accepted: false,
            reason: reason.into(),
        }
    }
}

/// Identity verification capability used by the dispatcher.
///
/// Implementations must verify the supplied password, not merely that the
/// user exists, and must be safe to call from many handler tasks at once.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str)
        -> Result<AuthOutcome, BackendError>;

    /// Short name for log output
    fn name(&self) -> &'static str {
        "backend"
    }
}

/// In-memory user table, loaded from the `users` section of the config
#[derive(Debug, Default)]
pub struct StaticBackend {
    users: HashMap<String, User>,
}

impl StaticBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_users(users: &[User]) -> Self {
        let mut backend = Self::new();
        for user in users {
            backend.users.insert(user.username.clone(), user.clone());
        }
        backend
    }

    pub fn add_user(&mut self, username: impl Into<String>, password: impl Into<String>) {
        let username = username.into();
        self.users.insert(
            username.clone(),
            User {
                username,
                password: password.into(),
                enabled: true,
            },
        );
    }

    pub fn disable_user(&mut self, username: &str) {
        if let Some(user) = self.users.get_mut(username) {
            user.enabled = false;
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl AuthBackend for StaticBackend {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthOutcome, BackendError> {
        let outcome = match self.users.get(username) {
            None => AuthOutcome::reject("user not found"),
            Some(user) if !user.enabled => AuthOutcome::reject("account disabled"),
            Some(user) if user.password == password => AuthOutcome::accept(),
            Some(_) => AuthOutcome::reject("invalid credentials"),
        };
        Ok(outcome)
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_backend() {
        let mut backend = StaticBackend::new();
        backend.add_user("testuser", "testpass");

        assert!(backend.authenticate("testuser", "testpass").await.unwrap().accepted);
        assert_eq!(
            backend.authenticate("testuser", "wrongpass").await.unwrap(),
            AuthOutcome::reject("invalid credentials")
        );
        assert_eq!(
            backend.authenticate("wronguser", "testpass").await.unwrap(),
            AuthOutcome::reject("user not found")
        );
    }

    #[tokio::test]
    async fn test_disabled_account() {
        let mut backend = StaticBackend::new();
        backend.add_user("bob", "builder");
        backend.disable_user("bob");

        let outcome = backend.authenticate("bob", "builder").await.unwrap();
        assert!(!outcome.accepted);
        assert_eq!(outcome.reason, "account disabled");
    }

    #[tokio::test]
    async fn test_from_users() {
        let users = vec![
            User {
                username: "alice".to_string(),
                password: "wonderland".to_string(),
                enabled: true,
            },
            User {
                username: "carol".to_string(),
                password: "x".to_string(),
                enabled: false,
            },
        ];
        let backend = StaticBackend::from_users(&users);
        assert_eq!(backend.len(), 2);
        assert!(backend.authenticate("alice", "wonderland").await.unwrap().accepted);
        assert!(!backend.authenticate("carol", "x").await.unwrap().accepted);
    }

    #[tokio::test]
    async fn test_usernames_are_case_sensitive() {
        let mut backend = StaticBackend::new();
        backend.add_user("Alice", "pw");
        let outcome = backend.authenticate("alice", "pw").await.unwrap();
        assert!(!outcome.accepted);
    }
}
