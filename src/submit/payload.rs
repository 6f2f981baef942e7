//! Submission payload types.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Result sent to the host, before encryption.
///
/// Field order is the serialized order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorePayload {
    /// Final score.
    pub score: u64,
    /// Game identifier.
    pub game_id: Option<String>,
    /// Season identifier.
    pub season_id: Option<String>,
}

impl ScorePayload {
    /// Canonical JSON text of the payload.
    pub fn to_canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Base64 ciphertext handed to `onGameEnd`.
///
/// `Debug` prints only the digest.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedPayload(String);

impl EncryptedPayload {
    /// Wrap base64 ciphertext.
    pub fn new(ciphertext_b64: String) -> Self {
        Self(ciphertext_b64)
    }

    /// The base64 ciphertext.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex of the first 8 bytes of the ciphertext's SHA-256, safe to log.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        hex::encode(&hasher.finalize()[..8])
    }
}

impl fmt::Debug for EncryptedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EncryptedPayload").field(&self.digest()).finish()
    }
}

/// Plaintext result for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    /// Final score.
    pub score: u64,
    /// Persisted high score after the update.
    pub high_score: u64,
    /// Whether this score (re)wrote the high score.
    pub new_high_score: bool,
    /// `finish - start`.
    pub elapsed: Duration,
    /// Wall-clock completion stamp.
    pub finished_at: DateTime<Utc>,
}
