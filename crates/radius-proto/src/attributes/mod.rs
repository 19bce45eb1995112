//! RADIUS attribute (TLV) codec

mod attribute;
mod types;

pub use attribute::{Attribute, decode_attributes, encode_attributes};
pub use types::AttributeType;
