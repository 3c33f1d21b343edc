//! Key derivation using PBKDF2-HMAC-SHA256
//!
//! Derives the AES-256 key and the CBC initialisation vector from a passphrase
//! and an 8 byte salt, the same way `openssl enc -pbkdf2 -md sha256` does.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// PBKDF2 iteration count used by `openssl enc -pbkdf2`
pub const PBKDF2_ITERATIONS: u32 = 10_000;

/// Salt length of the OpenSSL envelope
pub const SALT_SIZE: usize = 8;

/// AES-256 key length
pub const KEY_SIZE: usize = 32;

/// AES block / CBC IV length
pub const IV_SIZE: usize = 16;

/// Key and IV derived from a passphrase, wiped on drop
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    key: [u8; KEY_SIZE],
    iv: [u8; IV_SIZE],
}

impl DerivedKey {
    /// Get the key bytes
    pub fn key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }

    /// Get the IV bytes
    pub fn iv(&self) -> &[u8; IV_SIZE] {
        &self.iv
    }
}

/// Derive key and IV from a passphrase
///
/// The first 32 bytes of the PBKDF2 output are the key, the next 16 the IV.
pub fn derive_key(passphrase: &str, salt: &[u8; SALT_SIZE]) -> DerivedKey {
    let mut material = [0u8; KEY_SIZE + IV_SIZE];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PBKDF2_ITERATIONS, &mut material);

    let mut derived = DerivedKey {
        key: [0u8; KEY_SIZE],
        iv: [0u8; IV_SIZE],
    };
    derived.key.copy_from_slice(&material[..KEY_SIZE]);
    derived.iv.copy_from_slice(&material[KEY_SIZE..]);
    material.zeroize();

    derived
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: [u8; SALT_SIZE] = [1, 2, 3, 4, 5, 6, 7, 8];

    #[test]
    fn test_same_passphrase_same_key() {
        let key1 = derive_key("test_passphrase", &SALT);
        let key2 = derive_key("test_passphrase", &SALT);
        assert_eq!(key1.key(), key2.key());
        assert_eq!(key1.iv(), key2.iv());
    }

    #[test]
    fn test_different_passphrase_different_key() {
        let key1 = derive_key("passphrase1", &SALT);
        let key2 = derive_key("passphrase2", &SALT);
        assert_ne!(key1.key(), key2.key());
    }

    #[test]
    fn test_different_salt_different_key() {
        let key1 = derive_key("same_passphrase", &SALT);
        let key2 = derive_key("same_passphrase", &[8, 7, 6, 5, 4, 3, 2, 1]);
        assert_ne!(key1.key(), key2.key());
        assert_ne!(key1.iv(), key2.iv());
    }

    #[test]
    fn test_empty_passphrase_is_derivable() {
        let key = derive_key("", &SALT);
        assert_eq!(key.key().len(), KEY_SIZE);
    }
}
