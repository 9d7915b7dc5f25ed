//! Agent payload encryption
//!
//! Host agents return file contents encrypted with AES-256-GCM under a
//! secret shared with the engine. The wire format is base64 of:
//! - 12 bytes nonce
//! - Encrypted data
//! - 16 bytes authentication tag (appended by AES-GCM)

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use thiserror::Error;

const NONCE_LEN: usize = 12;

/// Error types for encryption operations
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Base64 decode error: {0}")]
    Base64Error(String),
}

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Cipher shared between the engine and the host agents
#[derive(Clone)]
pub struct AgentCipher {
    cipher: Aes256Gcm,
}

impl AgentCipher {
    /// Create a cipher from a 32-byte (256-bit) key
    pub fn new(key: &[u8; 32]) -> Self {
        let cipher = Aes256Gcm::new(key.into());
        Self { cipher }
    }

    /// Create a cipher from a base64-encoded key
    pub fn from_base64_key(key: &str) -> CryptoResult<Self> {
        let key_bytes = BASE64
            .decode(key.trim())
            .map_err(|e| CryptoError::Base64Error(e.to_string()))?;

        let key_array: [u8; 32] = key_bytes.try_into().map_err(|v: Vec<u8>| {
            CryptoError::InvalidKey(format!("Key must be 32 bytes, got {}", v.len()))
        })?;

        Ok(Self::new(&key_array))
    }

    /// Encrypt plaintext, returning base64 of nonce followed by ciphertext
    pub fn encrypt(&self, plaintext: &str) -> CryptoResult<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(combined))
    }

    /// Decrypt base64-encoded ciphertext produced by an agent
    pub fn decrypt(&self, ciphertext: &str) -> CryptoResult<String> {
        let combined = BASE64
            .decode(ciphertext.trim())
            .map_err(|e| CryptoError::Base64Error(e.to_string()))?;

        if combined.len() < NONCE_LEN {
            return Err(CryptoError::InvalidData("Ciphertext too short".to_string()));
        }

        let (nonce_bytes, ciphertext_bytes) = combined.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext_bytes)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::DecryptionFailed(format!("Invalid UTF-8: {}", e)))
    }
}

impl std::fmt::Debug for AgentCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentCipher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_cipher() -> AgentCipher {
        AgentCipher::new(&[7u8; 32])
    }

    #[test]
    fn test_decrypt_agent_payload() {
        let cipher = test_cipher();
        let encrypted = cipher.encrypt("[server]\nport = 8080\n").unwrap();
        assert_ne!(encrypted, "[server]\nport = 8080\n");
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), "[server]\nport = 8080\n");
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let encrypted = test_cipher().encrypt("secret").unwrap();
        let other = AgentCipher::new(&[9u8; 32]);
        assert!(matches!(
            other.decrypt(&encrypted),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_decrypt_invalid_base64() {
        let result = test_cipher().decrypt("not base64 !!!");
        assert!(matches!(result, Err(CryptoError::Base64Error(_))));
    }

    #[test]
    fn test_decrypt_too_short() {
        let short = BASE64.encode([1u8; 4]);
        let result = test_cipher().decrypt(&short);
        assert!(matches!(result, Err(CryptoError::InvalidData(_))));
    }

    #[test]
    fn test_from_base64_key_wrong_length() {
        let key = BASE64.encode([1u8; 16]);
        let result = AgentCipher::from_base64_key(&key);
        assert!(matches!(result, Err(CryptoError::InvalidKey(_))));
    }

    #[test]
    fn test_from_base64_key_valid() {
        let key = BASE64.encode([3u8; 32]);
        let cipher = AgentCipher::from_base64_key(&key).unwrap();
        let encrypted = cipher.encrypt("x").unwrap();
        assert_eq!(AgentCipher::new(&[3u8; 32]).decrypt(&encrypted).unwrap(), "x");
    }

    proptest! {
        #[test]
        fn prop_encrypted_payload_decrypts(content in ".{0,256}") {
            let cipher = test_cipher();
            let encrypted = cipher.encrypt(&content).unwrap();
            prop_assert_eq!(cipher.decrypt(&encrypted).unwrap(), content);
        }
    }
}
