use crate::packet::{Packet, PacketError};
use rand::Rng;

/// Block size of the User-Password keystream (one MD5 digest)
const BLOCK_SIZE: usize = 16;
/// RFC 2865 Section 5.2 caps the obfuscated password at 128 bytes
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Generate a random Request Authenticator (16 bytes) per RFC 2865 Section 3
pub fn generate_request_authenticator() -> [u8; 16] {
    let mut rng = rand::rng();
    let mut authenticator = [0u8; 16];
    rng.fill(&mut authenticator);
    authenticator
}

/// Sign an encoded packet whose authenticator field currently holds the
/// Request Authenticator: MD5 over the whole buffer followed by the secret.
pub(crate) fn response_authenticator_for(encoded: &[u8], secret: &[u8]) -> [u8; 16] {
    let mut ctx = md5::Context::new();
    ctx.consume(encoded);
    ctx.consume(secret);
    ctx.compute().0
}

/// Calculate Response Authenticator per RFC 2865 Section 3
///
/// Response Authenticator = MD5(Code + ID + Length + Request Authenticator + Attributes + Secret)
pub fn calculate_response_authenticator(
    packet: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> Result<[u8; 16], PacketError> {
    let mut unsigned = packet.clone();
    unsigned.authenticator = *request_authenticator;
    let encoded = unsigned.encode()?;
    Ok(response_authenticator_for(&encoded, secret))
}

/// Verify the Response Authenticator of a decoded reply against the request
/// it is supposed to answer
pub fn verify_response_authenticator(
    response: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> bool {
    calculate_response_authenticator(response, request_authenticator, secret)
        .map(|expected| expected == response.authenticator)
        .unwrap_or(false)
}

/// Keystream block: MD5(secret + previous), where `previous` is the Request
/// Authenticator for the first block and the prior ciphertext block after that
fn keystream(secret: &[u8], previous: &[u8]) -> [u8; 16] {
    let mut ctx = md5::Context::new();
    ctx.consume(secret);
    ctx.consume(previous);
    ctx.compute().0
}

/// Obfuscate a User-Password per RFC 2865 Section 5.2
///
/// The password is null-padded to a multiple of 16 bytes (at least one block)
/// and XORed block by block with the chained keystream.
pub fn encrypt_user_password(password: &str, secret: &[u8], authenticator: &[u8; 16]) -> Vec<u8> {
    let mut padded = password.as_bytes().to_vec();
    let blocks = padded.len().div_ceil(BLOCK_SIZE).max(1);
    padded.resize(blocks * BLOCK_SIZE, 0);

    let mut result = Vec::with_capacity(padded.len());
    let mut previous = *authenticator;

    for chunk in padded.chunks(BLOCK_SIZE) {
        let key = keystream(secret, &previous);
        for (i, byte) in chunk.iter().enumerate() {
            previous[i] = byte ^ key[i];
        }
        result.extend_from_slice(&previous);
    }

    result
}

/// Recover a User-Password per RFC 2865 Section 5.2
///
/// The value must be a non-empty multiple of 16 bytes, at most 128. Null
/// padding is removed only from the final block; zero bytes in earlier blocks
/// are part of the password.
///
/// The result is raw bytes. A shared-secret mismatch cannot be detected here
/// and yields arbitrary bytes, which are not necessarily UTF-8.
pub fn decrypt_user_password(
    encrypted: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<Vec<u8>, PacketError> {
    if encrypted.is_empty() || encrypted.len() % BLOCK_SIZE != 0 {
        return Err(PacketError::InvalidPassword(format!(
            "length {} is not a non-zero multiple of {}",
            encrypted.len(),
            BLOCK_SIZE
        )));
    }
    if encrypted.len() > MAX_PASSWORD_LENGTH {
        return Err(PacketError::InvalidPassword(format!(
            "length {} exceeds {}",
            encrypted.len(),
            MAX_PASSWORD_LENGTH
        )));
    }

    let mut result = Vec::with_capacity(encrypted.len());
    let mut previous: &[u8] = authenticator;

    for chunk in encrypted.chunks(BLOCK_SIZE) {
        let key = keystream(secret, previous);
        result.extend(chunk.iter().zip(key.iter()).map(|(c, k)| c ^ k));
        previous = chunk;
    }

    let last_block_start = result.len() - BLOCK_SIZE;
    let mut end = result.len();
    while end > last_block_start && result[end - 1] == 0 {
        end -= 1;
    }
    result.truncate(end);
    Ok(result)
}
