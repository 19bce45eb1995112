use super::Code;
use crate::attributes::{decode_attributes, encode_attributes, Attribute, AttributeType};
use crate::auth::response_authenticator_for;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("Packet too short: {0} bytes (minimum 20)")]
    ShortPacket(usize),
    #[error("Length field says {declared} bytes but datagram has {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    #[error("Packet too large: {0} bytes")]
    PacketTooLarge(usize),
    #[error("Unsupported packet code: {0}")]
    UnsupportedCode(u8),
    #[error("Malformed attribute: {0}")]
    MalformedAttribute(String),
    #[error("Attribute value too long: {0} bytes (max 253)")]
    AttributeTooLarge(usize),
    #[error("Invalid User-Password: {0}")]
    InvalidPassword(String),
}

/// RADIUS Packet structure as defined in RFC 2865 Section 3
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Code      |  Identifier   |            Length             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// |                         Authenticator                         |
/// |                                                               |
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Attributes ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-
/// ```
///
/// The Length field is not stored; it is always derived from the attributes
/// when encoding and checked against the datagram size when decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet type (1 byte)
    pub code: Code,
    /// Packet identifier for matching requests/responses (1 byte)
    pub identifier: u8,
    /// Request or Response Authenticator (16 bytes)
    pub authenticator: [u8; 16],
    /// Attributes in wire order
    pub attributes: Vec<Attribute>,
}

impl Packet {
    /// Minimum RADIUS packet size (20 bytes: 1 code + 1 id + 2 length + 16 authenticator)
    pub const MIN_PACKET_SIZE: usize = 20;
    /// Maximum RADIUS packet size (4096 bytes as per RFC 2865)
    pub const MAX_PACKET_SIZE: usize = 4096;

    pub fn new(code: Code, identifier: u8, authenticator: [u8; 16]) -> Self {
        Packet {
            code,
            identifier,
            authenticator,
            attributes: Vec::new(),
        }
    }

    pub fn add_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Encode the packet with its authenticator field as-is.
    ///
    /// This is the request-side encoding; responses are built with
    /// [`Packet::encode_response`] so the authenticator is signed.
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        encode_raw(
            self.code,
            self.identifier,
            &self.authenticator,
            &self.attributes,
        )
    }

    /// Encode a signed response to a request.
    ///
    /// `identifier` must be the request's identifier. The authenticator
    /// field is MD5(Code + Identifier + Length + RequestAuth + Attributes + Secret),
    /// which ties the reply to that exact request and to the shared secret.
    pub fn encode_response(
        code: Code,
        identifier: u8,
        request_authenticator: &[u8; 16],
        attributes: &[Attribute],
        secret: &[u8],
    ) -> Result<Vec<u8>, PacketError> {
        let mut buffer = encode_raw(code, identifier, request_authenticator, attributes)?;
        let authenticator = response_authenticator_for(&buffer, secret);
        buffer[4..Self::MIN_PACKET_SIZE].copy_from_slice(&authenticator);
        Ok(buffer)
    }

    /// Decode a complete datagram.
    ///
    /// No shared secret is needed here: a request authenticator is opaque
    /// random data, and is only consumed later for User-Password recovery and
    /// response signing.
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < Self::MIN_PACKET_SIZE {
            return Err(PacketError::ShortPacket(data.len()));
        }
        if data.len() > Self::MAX_PACKET_SIZE {
            return Err(PacketError::PacketTooLarge(data.len()));
        }

        let declared = u16::from_be_bytes([data[2], data[3]]) as usize;
        if declared != data.len() {
            return Err(PacketError::LengthMismatch {
                declared,
                actual: data.len(),
            });
        }

        let code = Code::from_u8(data[0]).ok_or(PacketError::UnsupportedCode(data[0]))?;
        let identifier = data[1];

        let mut authenticator = [0u8; 16];
        authenticator.copy_from_slice(&data[4..Self::MIN_PACKET_SIZE]);

        let attributes = decode_attributes(&data[Self::MIN_PACKET_SIZE..])?;

        Ok(Packet {
            code,
            identifier,
            authenticator,
            attributes,
        })
    }

    /// Get the length of the encoded packet
    pub fn length(&self) -> usize {
        Self::MIN_PACKET_SIZE
            + self
                .attributes
                .iter()
                .map(Attribute::encoded_length)
                .sum::<usize>()
    }

    /// Find first attribute by type
    pub fn find_attribute(&self, attr_type: AttributeType) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.is(attr_type))
    }

    /// Find all attributes by type, in wire order
    pub fn find_all_attributes(&self, attr_type: AttributeType) -> Vec<&Attribute> {
        self.attributes.iter().filter(|a| a.is(attr_type)).collect()
    }
}

fn encode_raw(
    code: Code,
    identifier: u8,
    authenticator: &[u8; 16],
    attributes: &[Attribute],
) -> Result<Vec<u8>, PacketError> {
    let attr_bytes = encode_attributes(attributes)?;
    let total_length = Packet::MIN_PACKET_SIZE + attr_bytes.len();
    if total_length > Packet::MAX_PACKET_SIZE {
        return Err(PacketError::PacketTooLarge(total_length));
    }

    let mut buffer = Vec::with_capacity(total_length);
    buffer.push(code.as_u8());
    buffer.push(identifier);
    buffer.extend_from_slice(&(total_length as u16).to_be_bytes());
    buffer.extend_from_slice(authenticator);
    buffer.extend_from_slice(&attr_bytes);
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_response_authenticator;

    fn request_with_attributes() -> Packet {
        let mut packet = Packet::new(Code::AccessRequest, 42, [7u8; 16]);
        packet.add_attribute(Attribute::string(1, "alice").unwrap());
        packet.add_attribute(Attribute::new(2, vec![0xaa; 16]).unwrap());
        packet.add_attribute(Attribute::new(190, vec![1, 2, 3]).unwrap());
        packet
    }

    #[test]
    fn test_packet_encode_decode() {
        let packet = request_with_attributes();
        let encoded = packet.encode().unwrap();
        assert_eq!(encoded.len(), packet.length());

        let decoded = Packet::decode(&encoded).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn test_packet_min_size() {
        for len in 0..Packet::MIN_PACKET_SIZE {
            let data = vec![1u8; len];
            assert_eq!(Packet::decode(&data), Err(PacketError::ShortPacket(len)));
        }
    }

    #[test]
    fn test_length_field_larger_than_datagram() {
        let mut encoded = request_with_attributes().encode().unwrap();
        encoded.truncate(encoded.len() - 1);
        assert!(matches!(
            Packet::decode(&encoded),
            Err(PacketError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_length_field_smaller_than_datagram() {
        let mut encoded = Packet::new(Code::AccessRequest, 1, [0u8; 16])
            .encode()
            .unwrap();
        encoded.extend_from_slice(&[1, 3, b'x']);
        assert_eq!(
            Packet::decode(&encoded),
            Err(PacketError::LengthMismatch {
                declared: 20,
                actual: 23
            })
        );
    }

    #[test]
    fn test_unsupported_code() {
        let mut encoded = Packet::new(Code::AccessRequest, 1, [0u8; 16])
            .encode()
            .unwrap();
        encoded[0] = 99;
        assert_eq!(
            Packet::decode(&encoded),
            Err(PacketError::UnsupportedCode(99))
        );
    }

    #[test]
    fn test_oversized_datagram() {
        let data = vec![0u8; Packet::MAX_PACKET_SIZE + 1];
        assert_eq!(
            Packet::decode(&data),
            Err(PacketError::PacketTooLarge(Packet::MAX_PACKET_SIZE + 1))
        );
    }

    #[test]
    fn test_malformed_attribute_inside_packet() {
        let mut encoded = Packet::new(Code::AccessRequest, 1, [0u8; 16])
            .encode()
            .unwrap();
        encoded.extend_from_slice(&[1, 9, b'x']);
        encoded[3] = encoded.len() as u8;
        assert!(matches!(
            Packet::decode(&encoded),
            Err(PacketError::MalformedAttribute(_))
        ));
    }

    #[test]
    fn test_encode_too_large() {
        let mut packet = Packet::new(Code::AccessRequest, 1, [0u8; 16]);
        for _ in 0..17 {
            packet.add_attribute(Attribute::new(18, vec![b'a'; 253]).unwrap());
        }
        assert!(matches!(
            packet.encode(),
            Err(PacketError::PacketTooLarge(_))
        ));
    }

    #[test]
    fn test_encode_response_is_deterministic() {
        let attrs = vec![Attribute::string(18, "welcome").unwrap()];
        let a = Packet::encode_response(Code::AccessAccept, 9, &[3u8; 16], &attrs, b"secret")
            .unwrap();
        let b = Packet::encode_response(Code::AccessAccept, 9, &[3u8; 16], &attrs, b"secret")
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_encode_response_depends_on_every_secret_byte() {
        let secret = b"sharedsecret".to_vec();
        let baseline =
            Packet::encode_response(Code::AccessReject, 1, &[5u8; 16], &[], &secret).unwrap();

        for i in 0..secret.len() {
            let mut altered = secret.clone();
            altered[i] ^= 0x01;
            let other =
                Packet::encode_response(Code::AccessReject, 1, &[5u8; 16], &[], &altered).unwrap();
            assert_ne!(baseline[4..20], other[4..20], "secret byte {} ignored", i);
        }
    }

    #[test]
    fn test_encode_response_layout() {
        let request_auth = [0x11u8; 16];
        let attrs = vec![Attribute::new(33, vec![0xfe]).unwrap()];
        let bytes =
            Packet::encode_response(Code::AccessAccept, 77, &request_auth, &attrs, b"s3cr3t")
                .unwrap();

        assert_eq!(bytes[0], 2);
        assert_eq!(bytes[1], 77);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]) as usize, bytes.len());

        let mut signed = bytes.clone();
        signed[4..20].copy_from_slice(&request_auth);
        signed.extend_from_slice(b"s3cr3t");
        assert_eq!(bytes[4..20], md5::compute(&signed).0);

        let response = Packet::decode(&bytes).unwrap();
        assert!(verify_response_authenticator(&response, &request_auth, b"s3cr3t"));
        assert!(!verify_response_authenticator(&response, &[0u8; 16], b"s3cr3t"));
    }
}
