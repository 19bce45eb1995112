//! LDAP Integration Tests
//!
//! These tests need a live OpenLDAP directory on localhost:1389 with the
//! admin account `cn=admin,dc=example,dc=com` / `admin` and a user
//! `uid=testuser` whose password is `password123`.
//!
//! Run with: `cargo test --test ldap_integration_tests -- --ignored --test-threads=1`

use radius_server::{AuthBackend, BackendError, LdapBackend, LdapConfig};

fn directory() -> LdapConfig {
    LdapConfig {
        url: "ldap://localhost:1389".to_string(),
        base_dn: "dc=example,dc=com".to_string(),
        bind_dn: Some("cn=admin,dc=example,dc=com".to_string()),
        bind_password: Some("admin".to_string()),
        search_filter: "(uid={username})".to_string(),
        timeout: 10,
    }
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires a directory
async fn test_ldap_authentication_success() {
    let backend = LdapBackend::new(directory());
    let outcome = backend.authenticate("testuser", "password123").await.unwrap();
    assert!(outcome.accepted, "rejected: {}", outcome.reason);
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires a directory
async fn test_ldap_wrong_password_is_rejected() {
    let backend = LdapBackend::new(directory());
    let outcome = backend.authenticate("testuser", "wrongpassword").await.unwrap();
    assert!(!outcome.accepted);
    assert_eq!(outcome.reason, "invalid credentials");
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires a directory
async fn test_ldap_unknown_user_is_rejected() {
    let backend = LdapBackend::new(directory());
    let outcome = backend.authenticate("nonexistent", "password123").await.unwrap();
    assert!(!outcome.accepted);
    assert_eq!(outcome.reason, "user not found");
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires a directory
async fn test_ldap_filter_injection_matches_nothing() {
    let backend = LdapBackend::new(directory());
    let outcome = backend.authenticate("*", "password123").await.unwrap();
    assert!(!outcome.accepted);
}

#[tokio::test(flavor = "multi_thread")]
#[ignore] // Requires a directory
async fn test_ldap_bad_service_account_is_an_error() {
    let backend = LdapBackend::new(LdapConfig {
        bind_password: Some("not-the-admin-password".to_string()),
        ..directory()
    });
    let result = backend.authenticate("testuser", "password123").await;
    assert!(matches!(result, Err(BackendError::Backend(_))));
}
