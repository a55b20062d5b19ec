//! Token, salt and password-hash primitives for the credential store.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};

/// Length of generated tokens and salts.
pub const KEY_LEN: usize = 64;

/// Random alphanumeric credential string (bearer token or salt), drawn from
/// the thread-local CSPRNG.
pub fn generate_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(KEY_LEN)
        .map(char::from)
        .collect()
}

/// `base64(SHA-256(password ‖ salt))`.
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    BASE64.encode(hasher.finalize())
}

pub fn verify_password(password: &str, salt: &str, hash: &str) -> bool {
    hash_password(password, salt) == hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_long_alphanumeric_and_distinct() {
        let a = generate_key();
        let b = generate_key();
        assert_eq!(a.len(), KEY_LEN);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn hash_is_deterministic_for_same_inputs() {
        assert_eq!(
            hash_password("hunter2", "salt-a"),
            hash_password("hunter2", "salt-a")
        );
    }

    #[test]
    fn hash_depends_on_salt() {
        assert_ne!(
            hash_password("hunter2", "salt-a"),
            hash_password("hunter2", "salt-b")
        );
    }

    #[test]
    fn verify_accepts_matching_password() {
        let salt = generate_key();
        let hash = hash_password("correct-horse", &salt);
        assert!(verify_password("correct-horse", &salt, &hash));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let salt = generate_key();
        let hash = hash_password("correct-horse", &salt);
        assert!(!verify_password("wrong-horse", &salt, &hash));
    }

    #[test]
    fn known_vector() {
        // SHA-256("passwordsalt"), base64 of the raw digest.
        assert_eq!(
            hash_password("password", "salt"),
            "eje4XIkY6sGakInA+loqtNzj+QUo3N7sEIsj3fNge5k="
        );
    }
}
