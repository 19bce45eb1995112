//! RADIUS Server Implementation
//!
//! Answers RFC 2865 Access-Requests over UDP, built on the `radius-proto`
//! codec. Identity checks are delegated to an [`AuthBackend`].
//!
//! # Example
//!
//! ```rust,no_run
//! use radius_server::{RadiusServer, ServerConfig, StaticBackend};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut backend = StaticBackend::new();
//!     backend.add_user("alice", "password");
//!
//!     let config = ServerConfig::new(
//!         "0.0.0.0:1812".parse()?,
//!         b"secret".to_vec(),
//!         Arc::new(backend),
//!     );
//!
//!     let server = RadiusServer::new(config).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod backend;
pub mod config;
pub mod ldap_auth;
pub mod server;

use std::sync::Arc;

pub use audit::{AuditEntry, AuditEventType, AuditLogger};
pub use backend::{AuthBackend, AuthOutcome, BackendError, StaticBackend};
pub use config::{Client, Config, ConfigError, User};
pub use ldap_auth::{LdapBackend, LdapConfig};
pub use server::{RadiusServer, ServerConfig, ServerError};

/// Backend described by a configuration: the directory when an `ldap`
/// section is present, the static user table otherwise
pub fn backend_from_config(config: &Config) -> Arc<dyn AuthBackend> {
    match config.ldap {
        Some(ref ldap) => Arc::new(LdapBackend::new(ldap.clone())),
        None => Arc::new(StaticBackend::from_users(&config.users)),
    }
}
