/// RADIUS attribute types this server recognizes (RFC 2865, RFC 2869, RFC 3579).
///
/// Types outside this list are still decoded and carried as opaque
/// [`Attribute`](super::Attribute) values; they are simply not interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AttributeType {
    /// User-Name (1)
    UserName = 1,
    /// User-Password (2), obfuscated with the shared secret
    UserPassword = 2,
    /// CHAP-Password (3)
    ChapPassword = 3,
    /// NAS-IP-Address (4)
    NasIpAddress = 4,
    /// NAS-Port (5)
    NasPort = 5,
    /// Service-Type (6)
    ServiceType = 6,
    /// Reply-Message (18)
    ReplyMessage = 18,
    /// State (24)
    State = 24,
    /// Class (25)
    Class = 25,
    /// Vendor-Specific (26)
    VendorSpecific = 26,
    /// Called-Station-Id (30)
    CalledStationId = 30,
    /// Calling-Station-Id (31)
    CallingStationId = 31,
    /// NAS-Identifier (32)
    NasIdentifier = 32,
    /// Proxy-State (33), echoed back unmodified in responses
    ProxyState = 33,
    /// CHAP-Challenge (60)
    ChapChallenge = 60,
    /// NAS-Port-Type (61)
    NasPortType = 61,
    /// EAP-Message (79) - RFC 3579
    EapMessage = 79,
    /// Message-Authenticator (80) - RFC 2869
    MessageAuthenticator = 80,
}

impl AttributeType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(AttributeType::UserName),
            2 => Some(AttributeType::UserPassword),
            3 => Some(AttributeType::ChapPassword),
            4 => Some(AttributeType::NasIpAddress),
            5 => Some(AttributeType::NasPort),
            6 => Some(AttributeType::ServiceType),
            18 => Some(AttributeType::ReplyMessage),
            24 => Some(AttributeType::State),
            25 => Some(AttributeType::Class),
            26 => Some(AttributeType::VendorSpecific),
            30 => Some(AttributeType::CalledStationId),
            31 => Some(AttributeType::CallingStationId),
            32 => Some(AttributeType::NasIdentifier),
            33 => Some(AttributeType::ProxyState),
            60 => Some(AttributeType::ChapChallenge),
            61 => Some(AttributeType::NasPortType),
            79 => Some(AttributeType::EapMessage),
            80 => Some(AttributeType::MessageAuthenticator),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Dictionary name, as used in log output
    pub fn name(self) -> &'static str {
        match self {
            AttributeType::UserName => "User-Name",
            AttributeType::UserPassword => "User-Password",
            AttributeType::ChapPassword => "CHAP-Password",
            AttributeType::NasIpAddress => "NAS-IP-Address",
            AttributeType::NasPort => "NAS-Port",
            AttributeType::ServiceType => "Service-Type",
            AttributeType::ReplyMessage => "Reply-Message",
            AttributeType::State => "State",
            AttributeType::Class => "Class",
            AttributeType::VendorSpecific => "Vendor-Specific",
            AttributeType::CalledStationId => "Called-Station-Id",
            AttributeType::CallingStationId => "Calling-Station-Id",
            AttributeType::NasIdentifier => "NAS-Identifier",
            AttributeType::ProxyState => "Proxy-State",
            AttributeType::ChapChallenge => "CHAP-Challenge",
            AttributeType::NasPortType => "NAS-Port-Type",
            AttributeType::EapMessage => "EAP-Message",
            AttributeType::MessageAuthenticator => "Message-Authenticator",
        }
    }
}
