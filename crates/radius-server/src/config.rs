use crate::ldap_auth::LdapConfig;
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Entry of the static user table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password: String,
    /// Disabled accounts are rejected even with the right password
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Authorized RADIUS client (NAS)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// Client IP address or network (supports CIDR notation)
    pub address: String,
    /// Shared secret for this client
    pub secret: String,
    /// Optional client name/description
    #[serde(default)]
    pub name: Option<String>,
    /// Enable/disable this client
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Client {
    /// Parse the client address as an IP network
    pub fn parse_network(&self) -> Result<IpNetwork, ConfigError> {
        if let Ok(network) = self.address.parse::<IpNetwork>() {
            return Ok(network);
        }

        // Bare address becomes a /32 or /128
        if let Ok(ip) = self.address.parse::<IpAddr>() {
            return Ok(IpNetwork::from(ip));
        }

        Err(ConfigError::Invalid(format!(
            "Invalid client address: {}",
            self.address
        )))
    }

    /// Check if a source IP address matches this client
    pub fn matches(&self, source_ip: IpAddr) -> Result<bool, ConfigError> {
        let network = self.parse_network()?;
        Ok(network.contains(source_ip))
    }

    pub fn get_secret(&self) -> &[u8] {
        self.secret.as_bytes()
    }
}

/// Server configuration, loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Default shared secret, used when `clients` is empty
    #[serde(default = "default_secret")]
    pub secret: String,

    /// Authorized clients. Empty means any source is served with `secret`.
    #[serde(default)]
    pub clients: Vec<Client>,

    /// Static user table, used when no `ldap` section is present
    #[serde(default)]
    pub users: Vec<User>,

    /// Directory backend; takes precedence over `users`
    #[serde(default)]
    pub ldap: Option<LdapConfig>,

    /// Upper bound on a single backend call, in seconds
    #[serde(default = "default_backend_timeout")]
    pub backend_timeout_secs: u64,

    /// How long in-flight requests may run after a shutdown signal, in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Log level: "trace", "debug", "info", "warn", "error" (default: "info")
    #[serde(default)]
    pub log_level: Option<String>,

    /// Audit log file path (JSON lines, optional)
    #[serde(default)]
    pub audit_log_path: Option<String>,
}

fn default_listen_address() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    1812 // Standard RADIUS authentication port
}

fn default_secret() -> String {
    "testing123".to_string()
}

fn default_backend_timeout() -> u64 {
    10
}

fn default_shutdown_timeout() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_address: default_listen_address(),
            listen_port: default_listen_port(),
            secret: default_secret(),
            clients: vec![],
            users: vec![],
            ldap: None,
            backend_timeout_secs: default_backend_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            log_level: None,
            audit_log_path: None,
        }
    }
}

impl Config {
    /// Load and validate configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get socket address for binding
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr: IpAddr = self.listen_address.parse().map_err(|_| {
            ConfigError::Invalid(format!("Invalid IP address: {}", self.listen_address))
        })?;
        Ok(SocketAddr::new(addr, self.listen_port))
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// First enabled client matching the source IP
    pub fn find_client(&self, source_ip: IpAddr) -> Option<&Client> {
        self.clients
            .iter()
            .filter(|client| client.enabled)
            .find(|client| matches!(client.matches(source_ip), Ok(true)))
    }

    /// Shared secret for a source IP, or `None` if the source is not an
    /// authorized client.
    ///
    /// With an empty client list every source is authorized and uses the
    /// default secret.
    pub fn secret_for_client(&self, source_ip: IpAddr) -> Option<&[u8]> {
        if self.clients.is_empty() {
            return Some(self.secret.as_bytes());
        }
        self.find_client(source_ip).map(Client::get_secret)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let _: IpAddr = self.listen_address.parse().map_err(|_| {
            ConfigError::Invalid(format!("Invalid listen address: {}", self.listen_address))
        })?;

        if self.secret.is_empty() {
            return Err(ConfigError::Invalid("Secret cannot be empty".to_string()));
        }

        if self.backend_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "backend_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.shutdown_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "shutdown_timeout_secs must be greater than 0".to_string(),
            ));
        }

        for client in &self.clients {
            if client.secret.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Client {} has empty secret",
                    client.address
                )));
            }
            client.parse_network()?;
        }

        for user in &self.users {
            if user.username.is_empty() {
                return Err(ConfigError::Invalid("User has empty username".to_string()));
            }
        }

        if let Some(ref ldap) = self.ldap {
            ldap.validate()?;
        }

        Ok(())
    }

    /// Example configuration, written out on first start
    pub fn example() -> Self {
        Config {
            listen_address: "0.0.0.0".to_string(),
            listen_port: 1812,
            secret: "testing123".to_string(),
            clients: vec![
                Client {
                    address: "192.168.1.0/24".to_string(),
                    secret: "client_secret_1".to_string(),
                    name: Some("Wireless controllers".to_string()),
                    enabled: true,
                },
                Client {
                    address: "10.0.0.1".to_string(),
                    secret: "client_secret_2".to_string(),
                    name: Some("VPN Gateway".to_string()),
                    enabled: true,
                },
            ],
            users: vec![User {
                username: "admin".to_string(),
                password: "admin123".to_string(),
                enabled: true,
            }],
            ldap: None,
            backend_timeout_secs: 10,
            shutdown_timeout_secs: 5,
            log_level: Some("info".to_string()),
            audit_log_path: Some("/var/log/radius/audit.log".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(address: &str, secret: &str, enabled: bool) -> Client {
        Client {
            address: address.to_string(),
            secret: secret.to_string(),
            name: Some("Test".to_string()),
            enabled,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listen_port, 1812);
        assert_eq!(config.backend_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.secret = "".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.backend_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.users.push(User {
            username: String::new(),
            password: "x".to_string(),
            enabled: true,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_minimal_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"secret": "s3cr3t"}"#).unwrap();
        assert_eq!(config.listen_address, "0.0.0.0");
        assert_eq!(config.listen_port, 1812);
        assert_eq!(config.shutdown_timeout_secs, 5);
        assert!(config.ldap.is_none());

        let config: Config = serde_json::from_str(
            r#"{"users": [{"username": "bob", "password": "pw"}]}"#,
        )
        .unwrap();
        assert!(config.users[0].enabled);
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::default();
        assert_eq!(config.socket_addr().unwrap().port(), 1812);

        let mut config = Config::default();
        config.listen_address = "not-an-ip".to_string();
        assert!(config.socket_addr().is_err());
    }

    #[test]
    fn test_client_parse_network() {
        let single = client("192.168.1.1", "secret", true).parse_network().unwrap();
        assert!(single.contains("192.168.1.1".parse().unwrap()));
        assert!(!single.contains("192.168.1.2".parse().unwrap()));

        let cidr = client("192.168.1.0/24", "secret", true).parse_network().unwrap();
        assert!(cidr.contains("192.168.1.254".parse().unwrap()));
        assert!(!cidr.contains("192.168.2.1".parse().unwrap()));

        assert!(client("invalid", "secret", true).parse_network().is_err());
    }

    #[test]
    fn test_find_client_skips_disabled() {
        let mut config = Config::default();
        config.clients = vec![
            client("192.168.1.0/24", "disabled", false),
            client("192.168.1.0/24", "secret1", true),
            client("10.0.0.1", "secret2", true),
        ];

        assert_eq!(
            config.find_client("192.168.1.50".parse().unwrap()).unwrap().secret,
            "secret1"
        );
        assert_eq!(
            config.find_client("10.0.0.1".parse().unwrap()).unwrap().secret,
            "secret2"
        );
        assert!(config.find_client("172.16.0.1".parse().unwrap()).is_none());
    }

    #[test]
    fn test_secret_for_client() {
        let mut config = Config::default();
        config.secret = "default_secret".to_string();
        assert_eq!(
            config.secret_for_client("203.0.113.9".parse().unwrap()),
            Some(&b"default_secret"[..])
        );

        config.clients = vec![client("192.168.1.0/24", "client_secret", true)];
        assert_eq!(
            config.secret_for_client("192.168.1.50".parse().unwrap()),
            Some(&b"client_secret"[..])
        );
        assert_eq!(config.secret_for_client("10.0.0.1".parse().unwrap()), None);
    }

    #[test]
    fn test_config_validation_with_invalid_client_address() {
        let mut config = Config::default();
        config.clients = vec![client("invalid_ip", "secret", true)];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_example_round_trips_through_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        Config::example().to_file(file.path()).unwrap();
        let loaded = Config::from_file(file.path()).unwrap();
        assert_eq!(loaded.clients.len(), 2);
        assert_eq!(loaded.listen_port, 1812);
    }
}
