//! AES-256-GCM helpers for the columns flagged `is_encrypted=true` in
//! SystemSetting (§6.5): `file_content`, `original_text`, `simplified_text`,
//! `translated_text`.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use rand::RngCore;

use crate::error::StoreError;

const NONCE_LEN: usize = 12;

#[derive(Clone)]
pub struct EncryptionKey(Key<Aes256Gcm>);

impl EncryptionKey {
    /// Decodes a base64-encoded 32-byte key, as read from the
    /// `ENCRYPTION_KEY` environment variable or the `encryption_key`
    /// SystemSetting row.
    pub fn from_base64(encoded: &str) -> Result<Self, StoreError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| StoreError::Encryption(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(StoreError::Encryption(format!(
                "encryption key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(*Key::<Aes256Gcm>::from_slice(&bytes)))
    }

    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(*Key::<Aes256Gcm>::from_slice(&bytes))
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.0)
    }

    /// Encrypts `plaintext`, prefixing the random nonce to the ciphertext
    /// so decryption is self-contained given only the key.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, StoreError> {
        let cipher = Aes256Gcm::new(&self.0);
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| StoreError::Encryption(e.to_string()))?;
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, StoreError> {
        if sealed.len() < NONCE_LEN {
            return Err(StoreError::Encryption("ciphertext too short".into()));
        }
        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(&self.0);
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| StoreError::Encryption(e.to_string()))
    }

    pub fn encrypt_str(&self, plaintext: &str) -> Result<Vec<u8>, StoreError> {
        self.encrypt(plaintext.as_bytes())
    }

    pub fn decrypt_str(&self, sealed: &[u8]) -> Result<String, StoreError> {
        let bytes = self.decrypt(sealed)?;
        String::from_utf8(bytes).map_err(|e| StoreError::Codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_plaintext() {
        let key = EncryptionKey::generate();
        let sealed = key.encrypt_str("original OCR text").unwrap();
        assert_eq!(key.decrypt_str(&sealed).unwrap(), "original OCR text");
    }

    #[test]
    fn distinct_nonces_for_same_plaintext() {
        let key = EncryptionKey::generate();
        let a = key.encrypt_str("same input").unwrap();
        let b = key.encrypt_str("same input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_wrong_key_length() {
        assert!(EncryptionKey::from_base64("dG9vc2hvcnQ=").is_err());
    }

    #[test]
    fn base64_round_trip() {
        let key = EncryptionKey::generate();
        let encoded = key.to_base64();
        let restored = EncryptionKey::from_base64(&encoded).unwrap();
        let sealed = restored.encrypt_str("hello").unwrap();
        assert_eq!(key.decrypt_str(&sealed).unwrap(), "hello");
    }
}
