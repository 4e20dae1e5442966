//! Salted, iterated SHA-256 password hashing.
//!
//! Stored format: `sha256$<iterations>$<salt>$<hex digest>`.

use sha2::{Digest, Sha256};
use uuid::Uuid;

const SCHEME: &str = "sha256";
const ITERATIONS: u32 = 50_000;

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = derive(password, &salt, ITERATIONS);
    format!("{}${}${}${}", SCHEME, ITERATIONS, salt, digest)
}

/// Check a password against a stored hash in constant time over the digest.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let parts: Vec<&str> = stored.split('$').collect();
    let [scheme, iterations, salt, expected] = parts.as_slice() else {
        return false;
    };
    if *scheme != SCHEME {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };

    let actual = derive(password, salt, iterations);
    constant_time_eq(actual.as_bytes(), expected.as_bytes())
}

fn derive(password: &str, salt: &str, iterations: u32) -> String {
    let mut digest = Sha256::new()
        .chain_update(salt.as_bytes())
        .chain_update(password.as_bytes())
        .finalize();

    for _ in 1..iterations.max(1) {
        digest = Sha256::new()
            .chain_update(digest)
            .chain_update(password.as_bytes())
            .finalize();
    }

    format!("{:x}", digest)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
