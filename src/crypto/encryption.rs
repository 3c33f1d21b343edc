//! AES-256-CBC encryption in the OpenSSL `enc` envelope
//!
//! Layout: `"Salted__" || salt (8 bytes) || ciphertext`, PKCS#7 padded. Files
//! produced here decrypt with
//! `openssl enc -d -aes-256-cbc -pbkdf2 -md sha256` and vice versa.
//!
//! The envelope is not authenticated. A wrong passphrase is detected by the
//! padding check, which is explicit but not airtight; callers that know the
//! plaintext format should validate it as well.

use std::fs;
use std::path::Path;

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{ParachuteError, ParachuteResult};

use super::key_derivation::{derive_key, IV_SIZE, SALT_SIZE};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Magic prefix of a salted OpenSSL envelope
pub const SALT_MAGIC: &[u8; 8] = b"Salted__";

const HEADER_SIZE: usize = SALT_MAGIC.len() + SALT_SIZE;

/// Encrypt bytes with a fresh random salt
pub fn encrypt_bytes(plaintext: &[u8], passphrase: &str) -> ParachuteResult<Vec<u8>> {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    encrypt_bytes_with_salt(plaintext, passphrase, &salt)
}

/// Encrypt bytes with the given salt
pub fn encrypt_bytes_with_salt(
    plaintext: &[u8],
    passphrase: &str,
    salt: &[u8; SALT_SIZE],
) -> ParachuteResult<Vec<u8>> {
    let derived = derive_key(passphrase, salt);

    let cipher = Aes256CbcEnc::new_from_slices(derived.key(), derived.iv())
        .map_err(|e| ParachuteError::Encryption(format!("Failed to create cipher: {}", e)))?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut envelope = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
    envelope.extend_from_slice(SALT_MAGIC);
    envelope.extend_from_slice(salt);
    envelope.extend_from_slice(&ciphertext);

    Ok(envelope)
}

/// Decrypt an OpenSSL envelope
pub fn decrypt_bytes(envelope: &[u8], passphrase: &str) -> ParachuteResult<Vec<u8>> {
    if envelope.len() < HEADER_SIZE || !envelope.starts_with(SALT_MAGIC) {
        return Err(ParachuteError::Decryption(
            "missing salt header, input is not an encrypted archive".to_string(),
        ));
    }

    let mut salt = [0u8; SALT_SIZE];
    salt.copy_from_slice(&envelope[SALT_MAGIC.len()..HEADER_SIZE]);
    let ciphertext = &envelope[HEADER_SIZE..];

    if ciphertext.is_empty() || ciphertext.len() % IV_SIZE != 0 {
        return Err(ParachuteError::Decryption(format!(
            "ciphertext length {} is not a multiple of the block size",
            ciphertext.len()
        )));
    }

    let derived = derive_key(passphrase, &salt);

    let cipher = Aes256CbcDec::new_from_slices(derived.key(), derived.iv())
        .map_err(|e| ParachuteError::Decryption(format!("Failed to create cipher: {}", e)))?;

    cipher.decrypt_padded_vec_mut::<Pkcs7>(ciphertext).map_err(|_| {
        ParachuteError::Decryption("bad decrypt: wrong passphrase or corrupted data".to_string())
    })
}

/// Encrypt a whole file into `cipher_file`
///
/// The output is written directly, not atomically.
pub fn encrypt_file(plain_file: &Path, cipher_file: &Path, passphrase: &str) -> ParachuteResult<()> {
    let plaintext = fs::read(plain_file).map_err(|e| {
        ParachuteError::Io(format!("Failed to read {}: {}", plain_file.display(), e))
    })?;

    let envelope = encrypt_bytes(&plaintext, passphrase)?;

    fs::write(cipher_file, envelope).map_err(|e| {
        ParachuteError::Io(format!("Failed to write {}: {}", cipher_file.display(), e))
    })
}

/// Decrypt a whole file into `plain_file`
///
/// Nothing is written when decryption fails.
pub fn decrypt_file(cipher_file: &Path, plain_file: &Path, passphrase: &str) -> ParachuteResult<()> {
    let envelope = fs::read(cipher_file).map_err(|e| {
        ParachuteError::Io(format!("Failed to read {}: {}", cipher_file.display(), e))
    })?;

    let plaintext = decrypt_bytes(&envelope, passphrase)?;

    fs::write(plain_file, plaintext).map_err(|e| {
        ParachuteError::Io(format!("Failed to write {}: {}", plain_file.display(), e))
    })
}
