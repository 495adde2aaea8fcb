use rand::{Rng, RngCore};

/// Opaque magic-link token: 32 random bytes, hex-encoded (256 bits of
/// entropy). Stored on the access request; never derived from user data.
pub fn mint_magic_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Six-digit email verification code, zero-padded.
pub fn verification_code() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000u32))
}
