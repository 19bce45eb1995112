use super::AttributeType;
use crate::packet::PacketError;

/// RADIUS Attribute structure as defined in RFC 2865 Section 5
///
/// ```text
///  0                   1                   2
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Type      |    Length     |  Value ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute type (1 byte)
    pub attr_type: u8,
    /// Attribute value (0-253 bytes)
    pub value: Vec<u8>,
}

impl Attribute {
    /// Minimum attribute length (type + length fields = 2 bytes)
    pub const MIN_LENGTH: usize = 2;
    /// Maximum value length (253 bytes)
    pub const MAX_VALUE_LENGTH: usize = 253;

    pub fn new(attr_type: u8, value: Vec<u8>) -> Result<Self, PacketError> {
        if value.len() > Self::MAX_VALUE_LENGTH {
            return Err(PacketError::AttributeTooLarge(value.len()));
        }
        Ok(Attribute { attr_type, value })
    }

    /// Create a string attribute
    pub fn string(attr_type: u8, value: impl Into<String>) -> Result<Self, PacketError> {
        Self::new(attr_type, value.into().into_bytes())
    }

    /// Create an IP address attribute
    pub fn ipv4(attr_type: u8, value: [u8; 4]) -> Result<Self, PacketError> {
        Self::new(attr_type, value.to_vec())
    }

    /// The dictionary type, if this server knows it
    pub fn known_type(&self) -> Option<AttributeType> {
        AttributeType::from_u8(self.attr_type)
    }

    pub fn is(&self, attr_type: AttributeType) -> bool {
        self.attr_type == attr_type.as_u8()
    }

    /// Append the TLV encoding of this attribute to `buffer`
    pub fn encode_into(&self, buffer: &mut Vec<u8>) -> Result<(), PacketError> {
        if self.value.len() > Self::MAX_VALUE_LENGTH {
            return Err(PacketError::AttributeTooLarge(self.value.len()));
        }
        buffer.push(self.attr_type);
        buffer.push(self.encoded_length() as u8);
        buffer.extend_from_slice(&self.value);
        Ok(())
    }

    /// Encode attribute to bytes
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let mut buffer = Vec::with_capacity(self.encoded_length());
        self.encode_into(&mut buffer)?;
        Ok(buffer)
    }

    /// Decode the first attribute in `data`.
    ///
    /// Trailing bytes after the attribute are left for the caller; use
    /// [`encoded_length`](Self::encoded_length) to advance.
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < Self::MIN_LENGTH {
            return Err(PacketError::MalformedAttribute(format!(
                "{} trailing byte(s) cannot hold a type/length header",
                data.len()
            )));
        }

        let attr_type = data[0];
        let length = data[1] as usize;

        if length < Self::MIN_LENGTH {
            return Err(PacketError::MalformedAttribute(format!(
                "attribute {} declares length {} (minimum {})",
                attr_type,
                length,
                Self::MIN_LENGTH
            )));
        }

        if length > data.len() {
            return Err(PacketError::MalformedAttribute(format!(
                "attribute {} declares length {} but only {} bytes remain",
                attr_type,
                length,
                data.len()
            )));
        }

        Ok(Attribute {
            attr_type,
            value: data[Self::MIN_LENGTH..length].to_vec(),
        })
    }

    /// Get the encoded length of this attribute
    pub fn encoded_length(&self) -> usize {
        Self::MIN_LENGTH + self.value.len()
    }

    /// Try to interpret value as a string
    pub fn as_string(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.value.clone())
    }
}

/// Decode a complete attribute list.
///
/// Every byte of `data` must belong to a well-formed TLV; attribute order is
/// preserved and unknown types are kept as-is.
pub fn decode_attributes(mut data: &[u8]) -> Result<Vec<Attribute>, PacketError> {
    let mut attributes = Vec::new();
    while !data.is_empty() {
        let attr = Attribute::decode(data)?;
        data = &data[attr.encoded_length()..];
        attributes.push(attr);
    }
    Ok(attributes)
}

/// Encode attributes back to back, in the given order
pub fn encode_attributes(attributes: &[Attribute]) -> Result<Vec<u8>, PacketError> {
    let mut buffer = Vec::with_capacity(attributes.iter().map(Attribute::encoded_length).sum());
    for attr in attributes {
        attr.encode_into(&mut buffer)?;
    }
    Ok(buffer)
}
