//! Score Payload Encryption
//!
//! Encrypts the canonical payload JSON with an RSA public key (PKCS#1 v1.5,
//! base64 output). The private key never reaches this process; only the
//! verifying party can read the result.
//!
//! Keys are accepted as:
//! - SPKI PEM (`BEGIN PUBLIC KEY`)
//! - PKCS#1 PEM (`BEGIN RSA PUBLIC KEY`)
//! - a bare base64 DER body without armor

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use thiserror::Error;

use crate::submit::payload::{EncryptedPayload, ScorePayload};

/// Where the public key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Read the named environment variable at encryption time.
    Env(String),
    /// Key text supplied directly.
    Pem(String),
}

impl KeySource {
    /// Resolve the key text.
    pub fn load(&self) -> Result<String, CipherError> {
        match self {
            KeySource::Env(var) => {
                let value = std::env::var(var)
                    .map_err(|_| CipherError::MissingKey(var.clone()))?;
                if value.trim().is_empty() {
                    return Err(CipherError::MissingKey(var.clone()));
                }
                // .env files often carry PEM newlines escaped
                Ok(value.replace("\\n", "\n"))
            }
            KeySource::Pem(text) => Ok(text.clone()),
        }
    }
}

/// Encryption errors.
#[derive(Debug, Error)]
pub enum CipherError {
    /// Key variable unset or empty.
    #[error("public key not provisioned in {0}")]
    MissingKey(String),
    /// Key text could not be parsed.
    #[error("invalid public key: {0}")]
    InvalidKey(String),
    /// Payload could not be serialized.
    #[error("payload serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    /// RSA operation failed (e.g. payload longer than the key allows).
    #[error("encryption failed: {0}")]
    Encrypt(#[from] rsa::Error),
}

/// Encrypts score payloads with a parsed public key.
#[derive(Debug, Clone)]
pub struct PayloadEncryptor {
    key: RsaPublicKey,
}

impl PayloadEncryptor {
    /// Load and parse the key from `source`.
    pub fn from_source(source: &KeySource) -> Result<Self, CipherError> {
        Self::from_text(&source.load()?)
    }

    /// Parse key text in any accepted form.
    pub fn from_text(text: &str) -> Result<Self, CipherError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CipherError::InvalidKey("empty key".into()));
        }

        let key = if text.contains("-----BEGIN") {
            RsaPublicKey::from_public_key_pem(text)
                .or_else(|_| RsaPublicKey::from_pkcs1_pem(text))
                .map_err(|e| CipherError::InvalidKey(e.to_string()))?
        } else {
            let body: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            let der = STANDARD
                .decode(body)
                .map_err(|e| CipherError::InvalidKey(format!("bad base64: {}", e)))?;
            RsaPublicKey::from_public_key_der(&der)
                .or_else(|_| RsaPublicKey::from_pkcs1_der(&der))
                .map_err(|e| CipherError::InvalidKey(e.to_string()))?
        };

        Ok(Self { key })
    }

    /// Wrap an already parsed key.
    pub fn from_key(key: RsaPublicKey) -> Self {
        Self { key }
    }

    /// Serialize and encrypt a payload.
    pub fn encrypt(&self, payload: &ScorePayload) -> Result<EncryptedPayload, CipherError> {
        let json = payload.to_canonical_json()?;
        let mut rng = rand::thread_rng();
        let ciphertext = self.key.encrypt(&mut rng, Pkcs1v15Encrypt, json.as_bytes())?;
        Ok(EncryptedPayload::new(STANDARD.encode(ciphertext)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{decrypt, private_key, public_key_pem as public_pem};
    use base64::Engine as _;
    use rsa::pkcs1::EncodeRsaPublicKey;
    use rsa::pkcs8::{EncodePublicKey, LineEnding};

    fn sample_payload() -> ScorePayload {
        ScorePayload {
            score: 321,
            game_id: Some("g-1".into()),
            season_id: Some("s-1".into()),
        }
    }

    #[test]
    fn test_encrypt_decrypts_to_canonical_json() {
        let encryptor = PayloadEncryptor::from_text(&public_pem()).unwrap();
        let payload = sample_payload();

        let encrypted = encryptor.encrypt(&payload).unwrap();

        assert!(!encrypted.as_str().contains("321"));
        assert_eq!(decrypt(&encrypted), payload.to_canonical_json().unwrap());
    }

    #[test]
    fn test_ciphertext_is_randomized() {
        let encryptor = PayloadEncryptor::from_text(&public_pem()).unwrap();
        let a = encryptor.encrypt(&sample_payload()).unwrap();
        let b = encryptor.encrypt(&sample_payload()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_pkcs1_pem_accepted() {
        let pem = RsaPublicKey::from(private_key())
            .to_pkcs1_pem(LineEnding::LF)
            .unwrap();
        assert!(PayloadEncryptor::from_text(&pem).is_ok());
    }

    #[test]
    fn test_bare_base64_body_accepted() {
        let der = RsaPublicKey::from(private_key()).to_public_key_der().unwrap();
        let body = STANDARD.encode(der.as_bytes());
        let encryptor = PayloadEncryptor::from_text(&body).unwrap();
        let encrypted = encryptor.encrypt(&sample_payload()).unwrap();
        assert!(decrypt(&encrypted).contains("\"score\":321"));
    }

    #[test]
    fn test_missing_env_key() {
        let source = KeySource::Env("ARCADE_TEST_KEY_THAT_IS_NEVER_SET".into());
        let result = PayloadEncryptor::from_source(&source);
        assert!(matches!(result, Err(CipherError::MissingKey(_))));
    }

    #[test]
    fn test_env_key_with_escaped_newlines() {
        let var = "ARCADE_TEST_ESCAPED_KEY";
        std::env::set_var(var, public_pem().replace('\n', "\\n"));
        let result = PayloadEncryptor::from_source(&KeySource::Env(var.into()));
        std::env::remove_var(var);
        assert!(result.is_ok());
    }

    #[test]
    fn test_malformed_key_rejected() {
        let result = PayloadEncryptor::from_text(
            "-----BEGIN PUBLIC KEY-----\nnot a key\n-----END PUBLIC KEY-----",
        );
        assert!(matches!(result, Err(CipherError::InvalidKey(_))));

        let result = PayloadEncryptor::from_text("%%%");
        assert!(matches!(result, Err(CipherError::InvalidKey(_))));
    }

    #[test]
    fn test_oversized_payload_surfaces_error() {
        let encryptor = PayloadEncryptor::from_text(&public_pem()).unwrap();
        let payload = ScorePayload {
            score: 1,
            game_id: Some("g".repeat(200)),
            season_id: None,
        };
        assert!(matches!(encryptor.encrypt(&payload), Err(CipherError::Encrypt(_))));
    }
}
