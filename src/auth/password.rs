use argon2::{password_hash::Output, Argon2};
use rand::{rngs::OsRng, RngCore};
use tracing::{error, warn};

const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;
const MIN_SALT_LEN: usize = 8;

/// Salt and hash `plain`, producing `hex(salt).hex(hash)`.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let hash = derive(plain, &salt)?;
    Ok(format!("{}.{}", hex::encode(salt), hex::encode(hash)))
}

/// Check `plain` against a stored `salt.hash` value.
///
/// A stored value that is not in that form never matches.
pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let Some((salt_hex, hash_hex)) = stored.split_once('.') else {
        warn!("stored password is not salted");
        return Ok(false);
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(hash_hex)) else {
        warn!("stored password is not hex encoded");
        return Ok(false);
    };
    if salt.len() < MIN_SALT_LEN || expected.len() != HASH_LEN {
        warn!("stored password has unexpected lengths");
        return Ok(false);
    }
    let actual = derive(plain, &salt)?;
    let (Ok(actual), Ok(expected)) = (Output::new(&actual), Output::new(&expected)) else {
        return Ok(false);
    };
    // `Output` equality is constant-time.
    Ok(actual == expected)
}

fn derive(plain: &str, salt: &[u8]) -> anyhow::Result<[u8; HASH_LEN]> {
    let mut out = [0u8; HASH_LEN];
    Argon2::default()
        .hash_password_into(plain.as_bytes(), salt, &mut out)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password_into error");
            anyhow::anyhow!(e.to_string())
        })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_form_has_one_separator_and_two_non_empty_parts() {
        let stored = hash_password("asdf").expect("hashing should succeed");
        assert_ne!(stored, "asdf");
        assert_eq!(stored.matches('.').count(), 1);
        let (salt, hash) = stored.split_once('.').unwrap();
        assert_eq!(salt.len(), SALT_LEN * 2);
        assert_eq!(hash.len(), HASH_LEN * 2);
    }

    #[test]
    fn salts_differ_between_calls() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let stored = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &stored).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let stored = hash_password("correct-horse-battery-staple").unwrap();
        assert!(!verify_password("wrong-password", &stored).expect("verify should not error"));
    }

    #[test]
    fn verify_rejects_hash_differing_in_last_byte() {
        let stored = hash_password("pw").unwrap();
        let (salt, hash) = stored.split_once('.').unwrap();
        let mut bytes = hex::decode(hash).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 1;
        let tampered = format!("{salt}.{}", hex::encode(bytes));
        assert!(!verify_password("pw", &tampered).unwrap());
    }

    #[test]
    fn verify_rejects_unsalted_or_garbled_values() {
        assert!(!verify_password("dsada", "dsada").unwrap());
        assert!(!verify_password("x", "zz.zz").unwrap());
        assert!(!verify_password("x", "00.00").unwrap());
    }
}
