use crate::audit::{AuditEntry, AuditEventType, AuditLogger};
use crate::backend::{AuthBackend, AuthOutcome, BackendError};
use crate::config::Config;
use radius_proto::attributes::{Attribute, AttributeType};
use radius_proto::auth::decrypt_user_password;
use radius_proto::{Code, Packet, PacketError};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Reply-Message carried by every Access-Reject, whatever the cause
const REJECT_MESSAGE: &str = "Authentication failed";

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),
    #[error("Unauthorized client {0}")]
    UnauthorizedClient(IpAddr),
    #[error("Unsupported packet type {0}")]
    UnsupportedCode(Code),
    #[error("Access-Request without User-Name")]
    MissingCredential,
    #[error("Failed to send reply: {0}")]
    Send(std::io::Error),
}

/// Everything a handler task needs, shared read-only between tasks
pub struct ServerConfig {
    /// Bind address for the server
    pub bind_addr: SocketAddr,
    /// Shared secret, used when no client list is configured
    pub secret: Vec<u8>,
    /// Identity verification capability
    pub backend: Arc<dyn AuthBackend>,
    /// Full configuration with client list
    pub config: Option<Arc<Config>>,
    /// Upper bound on one backend call
    pub backend_timeout: Duration,
    /// Grace period for in-flight requests on shutdown
    pub shutdown_timeout: Duration,
    pub audit_logger: Arc<AuditLogger>,
}

impl ServerConfig {
    pub fn new(
        bind_addr: SocketAddr,
        secret: impl Into<Vec<u8>>,
        backend: Arc<dyn AuthBackend>,
    ) -> Self {
        ServerConfig {
            bind_addr,
            secret: secret.into(),
            backend,
            config: None,
            backend_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(5),
            audit_logger: Arc::new(AuditLogger::disabled()),
        }
    }

    pub fn from_config(config: Config, backend: Arc<dyn AuthBackend>) -> Result<Self, ServerError> {
        let bind_addr = config.socket_addr().map_err(|e| {
            ServerError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;
        let audit_logger = Arc::new(AuditLogger::new(config.audit_log_path.clone())?);

        Ok(ServerConfig {
            bind_addr,
            secret: config.secret.clone().into_bytes(),
            backend,
            backend_timeout: config.backend_timeout(),
            shutdown_timeout: config.shutdown_timeout(),
            config: Some(Arc::new(config)),
            audit_logger,
        })
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_audit_logger(mut self, logger: AuditLogger) -> Self {
        self.audit_logger = Arc::new(logger);
        self
    }

    /// Shared secret for a source, `None` when the source is not authorized
    fn secret_for_client(&self, source_ip: IpAddr) -> Option<&[u8]> {
        match self.config {
            Some(ref config) => config.secret_for_client(source_ip),
            None => Some(&self.secret),
        }
    }

    fn client_name(&self, source_ip: IpAddr) -> Option<String> {
        self.config
            .as_ref()
            .and_then(|c| c.find_client(source_ip))
            .and_then(|client| client.name.clone())
    }
}

/// RADIUS authentication server: one UDP socket, one task per datagram
pub struct RadiusServer {
    config: Arc<ServerConfig>,
    socket: Arc<UdpSocket>,
}

impl RadiusServer {
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let socket = UdpSocket::bind(config.bind_addr).await?;
        info!("RADIUS server listening on {}", socket.local_addr()?);

        Ok(RadiusServer {
            config: Arc::new(config),
            socket: Arc::new(socket),
        })
    }

    /// Local address, useful when bound to port 0
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.socket.local_addr().map_err(ServerError::from)
    }

    /// Serve until the process exits
    pub async fn run(&self) -> Result<(), ServerError> {
        let (_shutdown_tx, shutdown_rx) = watch::channel(());
        self.run_with_shutdown(shutdown_rx).await
    }

    /// Serve until `shutdown` changes or its sender is dropped.
    ///
    /// After the signal no more datagrams are read. Requests already being
    /// handled get `shutdown_timeout` to finish; whatever is still running
    /// after that is aborted and never answered.
    pub async fn run_with_shutdown(
        &self,
        mut shutdown: watch::Receiver<()>,
    ) -> Result<(), ServerError> {
        let mut buf = vec![0u8; Packet::MAX_PACKET_SIZE + 1];
        let mut tasks = JoinSet::new();

        self.config
            .audit_logger
            .log(AuditEntry::new(AuditEventType::ServerStart))
            .await;

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, addr)) => {
                            let data = buf[..len].to_vec();
                            let config = Arc::clone(&self.config);
                            let socket = Arc::clone(&self.socket);

                            tasks.spawn(async move {
                                if let Err(e) = Self::handle_request(data, addr, config, socket).await {
                                    debug!(client_addr = %addr, error = %e, "Request not answered");
                                }
                            });
                        }
                        Err(e) => warn!(error = %e, "Failed to receive datagram"),
                    }
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Request handler task failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!(in_flight = tasks.len(), "Shutdown signal received, draining requests");
                    break;
                }
            }
        }

        let drain = async { while tasks.join_next().await.is_some() {} };
        if tokio::time::timeout(self.config.shutdown_timeout, drain)
            .await
            .is_err()
        {
            warn!(
                remaining = tasks.len(),
                "Drain timeout reached, abandoning in-flight requests"
            );
            tasks.shutdown().await;
        }

        self.config
            .audit_logger
            .log(AuditEntry::new(AuditEventType::ServerStop))
            .await;
        info!("RADIUS server stopped");
        Ok(())
    }

    /// Handle a single datagram: build the reply and send it back to the
    /// peer it came from
    async fn handle_request(
        data: Vec<u8>,
        addr: SocketAddr,
        config: Arc<ServerConfig>,
        socket: Arc<UdpSocket>,
    ) -> Result<(), ServerError> {
        let reply = match Self::build_reply(&data, addr, &config).await {
            Ok(reply) => reply,
            Err(e) => {
                Self::audit_drop(&data, addr, &config, &e).await;
                return Err(e);
            }
        };

        socket.send_to(&reply, addr).await.map_err(|e| {
            warn!(client_addr = %addr, error = %e, "Failed to send RADIUS response");
            ServerError::Send(e)
        })?;

        debug!(
            client_addr = %addr,
            request_id = reply[1],
            response_type = reply[0],
            "Sent RADIUS response"
        );
        Ok(())
    }

    /// Decode, authenticate and encode.
    ///
    /// Any `Err` means the datagram is dropped without a reply. A well-formed
    /// Access-Request always yields `Ok` with either an Access-Accept or an
    /// Access-Reject, whatever happens in the backend.
    pub async fn build_reply(
        data: &[u8],
        addr: SocketAddr,
        config: &ServerConfig,
    ) -> Result<Vec<u8>, ServerError> {
        let source_ip = addr.ip();
        let secret = config.secret_for_client(source_ip).ok_or_else(|| {
            warn!(client_ip = %source_ip, "Rejected request from unauthorized client");
            ServerError::UnauthorizedClient(source_ip)
        })?;

        let request = Packet::decode(data)?;

        let attribute_names: Vec<&str> = request
            .attributes
            .iter()
            .map(|attr| attr.known_type().map_or("Unknown", AttributeType::name))
            .collect();
        debug!(
            packet_type = %request.code,
            client_addr = %addr,
            request_id = request.identifier,
            attributes = ?attribute_names,
            "Received RADIUS packet"
        );

        if request.code != Code::AccessRequest {
            return Err(ServerError::UnsupportedCode(request.code));
        }

        let name_attr = request
            .find_attribute(AttributeType::UserName)
            .filter(|attr| !attr.value.is_empty())
            .ok_or(ServerError::MissingCredential)?;
        // Lossy form is for logs only; the backend gets exact text or nothing
        let username = String::from_utf8_lossy(&name_attr.value).into_owned();

        let password = request
            .find_attribute(AttributeType::UserPassword)
            .map(|attr| decrypt_user_password(&attr.value, secret, &request.authenticator))
            .transpose()?;

        info!(
            username = %username,
            client_ip = %source_ip,
            request_id = request.identifier,
            "Authentication request received"
        );
        config
            .audit_logger
            .log(
                AuditEntry::new(AuditEventType::AuthAttempt)
                    .with_username(&username)
                    .with_client_ip(source_ip)
                    .with_client_name(config.client_name(source_ip))
                    .with_request_id(request.identifier),
            )
            .await;

        let outcome = match (name_attr.as_string(), password) {
            (Err(_), _) => AuthOutcome::reject("User-Name is not valid UTF-8"),
            (Ok(_), None) => AuthOutcome::reject("no User-Password in request"),
            (Ok(name), Some(bytes)) => match String::from_utf8(bytes) {
                Ok(password) => Self::authenticate(config, &name, &password).await,
                // Also what a shared-secret mismatch usually looks like
                Err(_) => AuthOutcome::reject("User-Password is not valid UTF-8"),
            },
        };

        let (code, event) = if outcome.accepted {
            info!(
                username = %username,
                client_ip = %source_ip,
                request_id = request.identifier,
                "Authentication successful"
            );
            (Code::AccessAccept, AuditEventType::AuthSuccess)
        } else {
            warn!(
                username = %username,
                client_ip = %source_ip,
                request_id = request.identifier,
                reason = %outcome.reason,
                "Authentication rejected"
            );
            (Code::AccessReject, AuditEventType::AuthFailure)
        };

        config
            .audit_logger
            .log(
                AuditEntry::new(event)
                    .with_username(&username)
                    .with_client_ip(source_ip)
                    .with_client_name(config.client_name(source_ip))
                    .with_request_id(request.identifier)
                    .with_details(&outcome.reason),
            )
            .await;

        // RFC 2865 Section 5.33
        let proxy_state: Vec<Attribute> = request
            .find_all_attributes(AttributeType::ProxyState)
            .into_iter()
            .cloned()
            .collect();
        let proxy_state_len: usize = proxy_state.iter().map(Attribute::encoded_length).sum();

        let mut attributes = Vec::with_capacity(proxy_state.len() + 1);
        if code == Code::AccessReject {
            let message = Attribute::string(AttributeType::ReplyMessage as u8, REJECT_MESSAGE)?;
            // Proxy-State must come back whole; the message is optional
            if Packet::MIN_PACKET_SIZE + proxy_state_len + message.encoded_length()
                <= Packet::MAX_PACKET_SIZE
            {
                attributes.push(message);
            } else {
                debug!(
                    request_id = request.identifier,
                    "Reply-Message omitted to keep the reply within 4096 bytes"
                );
            }
        }
        attributes.extend(proxy_state);

        let reply = Packet::encode_response(
            code,
            request.identifier,
            &request.authenticator,
            &attributes,
            secret,
        )?;
        Ok(reply)
    }

    /// Ask the backend, turning errors and timeouts into rejections
    async fn authenticate(config: &ServerConfig, username: &str, password: &str) -> AuthOutcome {
        let call = config.backend.authenticate(username, password);
        let result = match tokio::time::timeout(config.backend_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout),
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    username = %username,
                    backend = config.backend.name(),
                    error = %e,
                    "Authentication backend failed, rejecting"
                );
                AuthOutcome::reject(e.to_string())
            }
        }
    }

    async fn audit_drop(data: &[u8], addr: SocketAddr, config: &ServerConfig, err: &ServerError) {
        let event = match err {
            ServerError::UnauthorizedClient(_) => AuditEventType::UnauthorizedClient,
            _ => AuditEventType::DroppedPacket,
        };
        let mut entry = AuditEntry::new(event)
            .with_client_ip(addr.ip())
            .with_details(err.to_string());
        if data.len() >= 2 {
            entry = entry.with_request_id(data[1]);
        }
        config.audit_logger.log(entry).await;
    }
}
