//! RADIUS Protocol Implementation
//!
//! Wire codec for the authentication half of RFC 2865: packet and attribute
//! encoding, Request/Response Authenticator handling and the MD5-based
//! User-Password cipher. Everything here is pure and synchronous.
//!
//! # Example
//!
//! ```rust
//! use radius_proto::{Packet, Code, Attribute, AttributeType};
//! use radius_proto::auth::{generate_request_authenticator, encrypt_user_password};
//!
//! // Build an Access-Request the way a NAS would
//! let req_auth = generate_request_authenticator();
//! let mut packet = Packet::new(Code::AccessRequest, 1, req_auth);
//! packet.add_attribute(
//!     Attribute::string(AttributeType::UserName as u8, "alice").unwrap()
//! );
//! let encrypted_pwd = encrypt_user_password("password", b"secret", &req_auth);
//! packet.add_attribute(
//!     Attribute::new(AttributeType::UserPassword as u8, encrypted_pwd).unwrap()
//! );
//! let bytes = packet.encode().unwrap();
//!
//! // Server side: decode and answer
//! let request = Packet::decode(&bytes).unwrap();
//! let reply = Packet::encode_response(
//!     Code::AccessAccept,
//!     request.identifier,
//!     &request.authenticator,
//!     &[],
//!     b"secret",
//! ).unwrap();
//! assert_eq!(reply[1], 1);
//! ```

pub mod attributes;
pub mod auth;
pub mod packet;

pub use attributes::{Attribute, AttributeType, decode_attributes, encode_attributes};
pub use auth::{
    calculate_response_authenticator, decrypt_user_password, encrypt_user_password,
    generate_request_authenticator, verify_response_authenticator,
};
pub use packet::{Code, Packet, PacketError};
