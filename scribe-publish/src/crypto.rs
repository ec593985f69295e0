//! At-rest encryption for stored login secrets.
//!
//! Secrets are sealed with AES-256-GCM under a single master key supplied
//! through configuration. The random 96-bit nonce is prepended to the
//! ciphertext and the whole blob is base64-encoded for storage, so a
//! tampered or truncated record fails authentication instead of decrypting
//! to garbage.
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;

use scribe_common::{Result, ScribeError};

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Symmetric cipher for stored secrets.
///
/// Decryption failure is its own error kind, distinct from a missing
/// credential, so callers can tell "re-link the account" apart from a key
/// or data fault.
pub trait SecretCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String>;
    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

/// AES-256-GCM implementation of [`SecretCipher`].
pub struct AesGcmCipher {
    key: [u8; KEY_LEN],
}

impl AesGcmCipher {
    /// Build a cipher from key material encoded as hex (64 chars) or
    /// base64. The decoded key must be exactly 32 bytes.
    pub fn new(key_material: &str) -> Result<Self> {
        let trimmed = key_material.trim();
        if trimmed.is_empty() || trimmed.starts_with("${") {
            return Err(ScribeError::Config(
                "master key is not set (expected hex or base64, 32 bytes)".into(),
            ));
        }

        let decoded = if trimmed.len() == KEY_LEN * 2 && trimmed.chars().all(|c| c.is_ascii_hexdigit())
        {
            hex::decode(trimmed)
                .map_err(|e| ScribeError::Config(format!("master key is not valid hex: {e}")))?
        } else {
            BASE64
                .decode(trimmed)
                .map_err(|e| ScribeError::Config(format!("master key is not valid base64: {e}")))?
        };

        let key: [u8; KEY_LEN] = decoded.try_into().map_err(|v: Vec<u8>| {
            ScribeError::Config(format!("master key must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self { key })
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key))
    }
}

impl SecretCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = self
            .cipher()
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| ScribeError::Config("secret encryption failed".into()))?;

        let mut packed = Vec::with_capacity(NONCE_LEN + sealed.len());
        packed.extend_from_slice(&nonce_bytes);
        packed.extend_from_slice(&sealed);
        Ok(BASE64.encode(packed))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let packed = BASE64
            .decode(ciphertext.trim())
            .map_err(|e| ScribeError::SecretUnavailable(format!("not valid base64: {e}")))?;
        if packed.len() <= NONCE_LEN {
            return Err(ScribeError::SecretUnavailable(
                "stored blob is too short to contain a nonce".into(),
            ));
        }

        let (nonce_bytes, sealed) = packed.split_at(NONCE_LEN);
        let plain = self
            .cipher()
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|_| {
                ScribeError::SecretUnavailable("ciphertext failed authentication".into())
            })?;

        String::from_utf8(plain)
            .map_err(|e| ScribeError::SecretUnavailable(format!("decrypted bytes not UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> AesGcmCipher {
        AesGcmCipher::new(&"ab".repeat(32)).unwrap()
    }

    #[test]
    fn round_trips_a_secret() {
        let cipher = test_cipher();
        let sealed = cipher.encrypt("s3cret-비밀").unwrap();
        assert_eq!(cipher.decrypt(&sealed).unwrap(), "s3cret-비밀");
    }

    #[test]
    fn every_encryption_uses_a_fresh_nonce() {
        let cipher = test_cipher();
        let a = cipher.encrypt("same input").unwrap();
        let b = cipher.encrypt("same input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let cipher = test_cipher();
        let sealed = cipher.encrypt("payload").unwrap();
        let mut bytes = BASE64.decode(&sealed).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = BASE64.encode(bytes);

        match cipher.decrypt(&tampered) {
            Err(ScribeError::SecretUnavailable(_)) => {}
            other => panic!("expected SecretUnavailable, got {other:?}"),
        }
    }

    #[test]
    fn wrong_key_cannot_decrypt() {
        let sealed = test_cipher().encrypt("payload").unwrap();
        let other = AesGcmCipher::new(&"cd".repeat(32)).unwrap();
        assert!(other.decrypt(&sealed).is_err());
    }

    #[test]
    fn accepts_base64_key_material() {
        let key = BASE64.encode([7u8; 32]);
        let cipher = AesGcmCipher::new(&key).unwrap();
        let sealed = cipher.encrypt("x").unwrap();
        assert_eq!(cipher.decrypt(&sealed).unwrap(), "x");
    }

    #[test]
    fn rejects_unset_or_short_keys() {
        assert!(AesGcmCipher::new("").is_err());
        assert!(AesGcmCipher::new("${SCRIBE_MASTER_KEY}").is_err());
        assert!(AesGcmCipher::new(&BASE64.encode([1u8; 16])).is_err());
    }
}
