//! Cryptographic functions for parachute
//!
//! Provides passphrase based AES-256-CBC encryption of whole archive files,
//! compatible with the OpenSSL `enc` binary format (PBKDF2-SHA256 key
//! derivation, salted envelope).

pub mod encryption;
pub mod key_derivation;
pub mod secure_memory;

pub use encryption::{decrypt_bytes, decrypt_file, encrypt_bytes, encrypt_file};
pub use key_derivation::{derive_key, DerivedKey};
pub use secure_memory::SecureString;
