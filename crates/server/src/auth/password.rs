//! PBKDF2-HMAC-SHA256 password hashing.
//!
//! Stored form: `pbkdf2-sha256$<iterations>$<salt>$<hash>` with base64url
//! (no padding) salt and hash.

use anyhow::{Result, anyhow};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;

pub fn hash_password(password: &str, iterations: u32) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);

    let hash = pbkdf2_sha256(password.as_bytes(), &salt, iterations)?;
    Ok(format!(
        "{SCHEME}${iterations}${}${}",
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(hash)
    ))
}

/// A well-formed hash no password matches. Verifying against it costs the same
/// as a real check, so unknown accounts are not revealed by response time.
pub fn dummy_hash(iterations: u32) -> String {
    let zeros = URL_SAFE_NO_PAD.encode([0u8; 32]);
    format!("{SCHEME}${iterations}${}${zeros}", &zeros[..22])
}

/// Returns `Ok(false)` on mismatch and `Err` only when `stored` is malformed.
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(anyhow!("malformed password hash"));
    };

    if scheme != SCHEME {
        return Err(anyhow!("unsupported password hash scheme '{scheme}'"));
    }

    let iterations: u32 = iterations
        .parse()
        .map_err(|_| anyhow!("malformed password hash iterations"))?;
    let salt = URL_SAFE_NO_PAD
        .decode(salt)
        .map_err(|e| anyhow!("malformed password salt: {e}"))?;
    let expected = URL_SAFE_NO_PAD
        .decode(hash)
        .map_err(|e| anyhow!("malformed password hash: {e}"))?;

    let actual = pbkdf2_sha256(password.as_bytes(), &salt, iterations)?;
    Ok(constant_time_eq(&actual, &expected))
}

/// Single-block PBKDF2 (RFC 8018) with HMAC-SHA256, giving a 32-byte key.
fn pbkdf2_sha256(password: &[u8], salt: &[u8], iterations: u32) -> Result<Vec<u8>> {
    if iterations == 0 {
        return Err(anyhow!("iteration count must be positive"));
    }

    let prf = HmacSha256::new_from_slice(password).map_err(|e| anyhow!("hmac key: {e}"))?;

    let mut mac = prf.clone();
    mac.update(salt);
    mac.update(&1u32.to_be_bytes());
    let mut block = mac.finalize().into_bytes();
    let mut output = block.to_vec();

    for _ in 1..iterations {
        let mut mac = prf.clone();
        mac.update(&block);
        block = mac.finalize().into_bytes();
        for (out, byte) in output.iter_mut().zip(block.iter()) {
            *out ^= byte;
        }
    }

    Ok(output)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pbkdf2_matches_rfc7914_vector() {
        // RFC 7914 section 11: PBKDF2-HMAC-SHA256 ("passwd", "salt", c=1)
        let derived = pbkdf2_sha256(b"passwd", b"salt", 1).unwrap();
        let expected = [
            0x55, 0xac, 0x04, 0x6e, 0x56, 0xe3, 0x08, 0x9f, 0xec, 0x16, 0x91, 0xc2, 0x25, 0x44,
            0xb6, 0x05, 0xf9, 0x41, 0x85, 0x21, 0x6d, 0xde, 0x04, 0x65, 0xe6, 0x8b, 0x9d, 0x57,
            0xc2, 0x0d, 0xac, 0xbc,
        ];
        assert_eq!(derived, expected);
    }

    #[test]
    fn test_hash_and_verify() {
        let stored = hash_password("s3cret-pass", 1_000).unwrap();
        assert!(stored.starts_with("pbkdf2-sha256$1000$"));
        assert!(verify_password("s3cret-pass", &stored).unwrap());
        assert!(!verify_password("wrong-pass", &stored).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same", 10).unwrap();
        let b = hash_password("same", 10).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_dummy_hash_runs_a_full_check() {
        let dummy = dummy_hash(1_000);
        assert!(dummy.starts_with("pbkdf2-sha256$1000$"));
        assert!(!verify_password("", &dummy).unwrap());
        assert!(!verify_password("correct-horse-battery", &dummy).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_error() {
        assert!(verify_password("x", "plaintext").is_err());
        assert!(verify_password("x", "bcrypt$10$abc$def").is_err());
        assert!(verify_password("x", "pbkdf2-sha256$many$abc$def").is_err());
        assert!(verify_password("x", "pbkdf2-sha256$10$abc$def$extra").is_err());
    }
}
