//! LDAP/Active Directory authentication backend
//!
//! Users are located with a search (optionally under a service-account bind)
//! and their password is verified by binding as the user's DN.

use crate::backend::{AuthBackend, AuthOutcome, BackendError};
use crate::config::ConfigError;
use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

/// LDAP result code for a failed simple bind (RFC 4511)
const INVALID_CREDENTIALS: u32 = 49;

#[derive(Error, Debug)]
pub enum LdapError {
    #[error("LDAP connection error: {0}")]
    Connection(String),
    #[error("LDAP bind error: {0}")]
    Bind(String),
    #[error("LDAP search error: {0}")]
    Search(String),
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Multiple entries match user: {0}")]
    Ambiguous(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
}

impl LdapError {
    /// Map onto the backend contract: directory answers become rejections,
    /// transport and protocol failures stay errors
    pub fn into_outcome(self) -> Result<AuthOutcome, BackendError> {
        match self {
            LdapError::UserNotFound(_) => Ok(AuthOutcome::reject("user not found")),
            LdapError::Ambiguous(_) => Ok(AuthOutcome::reject("ambiguous directory entry")),
            LdapError::InvalidCredentials => Ok(AuthOutcome::reject("invalid credentials")),
            LdapError::Connection(e) => Err(BackendError::Unavailable(e)),
            other => Err(BackendError::Backend(other.to_string())),
        }
    }
}

/// LDAP backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// LDAP server URL (e.g., "ldap://localhost:389" or "ldaps://ldap.example.com:636")
    pub url: String,

    /// Base DN for user searches (e.g., "dc=example,dc=com")
    pub base_dn: String,

    /// Service account used for the search; anonymous when unset
    #[serde(default)]
    pub bind_dn: Option<String>,

    #[serde(default)]
    pub bind_password: Option<String>,

    /// User search filter; `{username}` is replaced with the escaped username
    #[serde(default = "default_search_filter")]
    pub search_filter: String,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_search_filter() -> String {
    "(uid={username})".to_string()
}

fn default_timeout() -> u64 {
    5
}

impl Default for LdapConfig {
    fn default() -> Self {
        LdapConfig {
            url: "ldap://localhost:389".to_string(),
            base_dn: "dc=example,dc=com".to_string(),
            bind_dn: None,
            bind_password: None,
            search_filter: default_search_filter(),
            timeout: default_timeout(),
        }
    }
}

impl LdapConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.url.starts_with("ldap://") || self.url.starts_with("ldaps://")) {
            return Err(ConfigError::Invalid(format!(
                "LDAP url must start with ldap:// or ldaps://: {}",
                self.url
            )));
        }
        if self.base_dn.is_empty() {
            return Err(ConfigError::Invalid("LDAP base_dn cannot be empty".to_string()));
        }
        if !self.search_filter.contains("{username}") {
            return Err(ConfigError::Invalid(
                "LDAP search_filter must contain {username}".to_string(),
            ));
        }
        if self.bind_dn.is_some() != self.bind_password.is_some() {
            return Err(ConfigError::Invalid(
                "LDAP bind_dn and bind_password must be set together".to_string(),
            ));
        }
        Ok(())
    }

    /// Search filter for a username, with RFC 4515 escaping applied
    pub fn filter_for(&self, username: &str) -> String {
        self.search_filter
            .replace("{username}", &ldap3::ldap_escape(username))
    }
}

/// Directory-backed [`AuthBackend`]
///
/// Opens a fresh connection per request; the directory is the only state.
pub struct LdapBackend {
    config: LdapConfig,
}

impl LdapBackend {
    pub fn new(config: LdapConfig) -> Self {
        LdapBackend { config }
    }

    async fn connect(&self) -> Result<Ldap, LdapError> {
        debug!(url = %self.config.url, "Opening LDAP connection");
        let settings =
            LdapConnSettings::new().set_conn_timeout(Duration::from_secs(self.config.timeout));

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.config.url)
            .await
            .map_err(|e| LdapError::Connection(e.to_string()))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                error!("LDAP connection driver error: {}", e);
            }
        });

        Ok(ldap)
    }

    /// Locate the user's DN, binding as the service account first if configured
    async fn find_user(&self, ldap: &mut Ldap, username: &str) -> Result<String, LdapError> {
        if let (Some(bind_dn), Some(bind_password)) =
            (&self.config.bind_dn, &self.config.bind_password)
        {
            ldap.simple_bind(bind_dn, bind_password)
                .await
                .and_then(|r| r.success())
                .map_err(|e| LdapError::Bind(e.to_string()))?;
        }

        let filter = self.config.filter_for(username);
        debug!(
            username = %username,
            base_dn = %self.config.base_dn,
            filter = %filter,
            "Searching for user in LDAP"
        );

        let (entries, _) = ldap
            .search(&self.config.base_dn, Scope::Subtree, &filter, vec!["1.1"])
            .await
            .and_then(|r| r.success())
            .map_err(|e| LdapError::Search(e.to_string()))?;

        match entries.len() {
            0 => Err(LdapError::UserNotFound(username.to_string())),
            1 => {
                let entry = entries.into_iter().next().map(SearchEntry::construct);
                entry
                    .map(|e| e.dn)
                    .ok_or_else(|| LdapError::UserNotFound(username.to_string()))
            }
            n => {
                warn!(username = %username, count = n, "Multiple LDAP entries for user");
                Err(LdapError::Ambiguous(username.to_string()))
            }
        }
    }

    async fn verify_password(
        &self,
        ldap: &mut Ldap,
        user_dn: &str,
        password: &str,
    ) -> Result<(), LdapError> {
        debug!(dn = %user_dn, "Attempting LDAP bind for user");
        let result = ldap
            .simple_bind(user_dn, password)
            .await
            .map_err(|e| LdapError::Bind(e.to_string()))?;

        match result.rc {
            0 => Ok(()),
            INVALID_CREDENTIALS => Err(LdapError::InvalidCredentials),
            rc => Err(LdapError::Bind(format!("bind returned result code {}", rc))),
        }
    }

    async fn check(&self, username: &str, password: &str) -> Result<(), LdapError> {
        let mut ldap = self.connect().await?;
        let result = async {
            let user_dn = self.find_user(&mut ldap, username).await?;
            self.verify_password(&mut ldap, &user_dn, password).await
        }
        .await;
        let _ = ldap.unbind().await;
        result
    }
}

#[async_trait]
impl AuthBackend for LdapBackend {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<AuthOutcome, BackendError> {
        // An empty password would be an unauthenticated bind, which most
        // directories report as success
        if password.is_empty() {
            return Ok(AuthOutcome::reject("empty password"));
        }

        match self.check(username, password).await {
            Ok(()) => Ok(AuthOutcome::accept()),
            Err(e) => {
                debug!(username = %username, error = %e, "LDAP authentication did not succeed");
                e.into_outcome()
            }
        }
    }

    fn name(&self) -> &'static str {
        "ldap"
    }
}
