//! One-time codes and invite codes.

use data_encoding::BASE32_NOPAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of a generated invite code.
pub const INVITE_CODE_LEN: usize = 10;

/// A uniformly random 6-digit code, zero-padded.
pub fn generate_otp() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", n)
}

/// SHA-256 hex digest of a code. Only digests are stored.
pub fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.trim().as_bytes()))
}

/// A random uppercase base32 code of [`INVITE_CODE_LEN`] characters.
pub fn generate_invite_code() -> String {
    let bytes: [u8; 8] = rand::thread_rng().r#gen();
    let mut code = BASE32_NOPAD.encode(&bytes);
    code.truncate(INVITE_CODE_LEN);
    code
}

pub fn normalize_invite_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// A password nobody knows, for accounts that activate through a reset.
pub fn unusable_password() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    hex::encode(bytes)
}
