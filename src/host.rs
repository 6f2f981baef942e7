//! Host Boundary
//!
//! Traits for everything the orchestrator calls out to: the embedding page's
//! callbacks and the UI layer's score panel.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::submit::payload::EncryptedPayload;

/// Event record passed to `onGameStart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStartEvent {
    /// State tag, always `"game_start"`.
    pub state: String,
    /// Game name tag.
    pub name: String,
}

impl GameStartEvent {
    /// Build the start record for a game.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            state: "game_start".to_string(),
            name: name.into(),
        }
    }
}

/// Callbacks supplied by the embedding page.
///
/// Each is invoked exactly once per session. `on_game_end` only ever sees
/// ciphertext.
pub trait HostCallbacks: Send + Sync {
    /// Play has started.
    fn on_game_start(&self, event: &GameStartEvent);

    /// Play has finished; `payload` is the encrypted score.
    fn on_game_end(&self, payload: &EncryptedPayload);
}

/// Presentation surface for the final result (the UI layer's score panel).
pub trait ScoreBoard: Send + Sync {
    /// Show the plaintext result on screen.
    fn show_score(&self, score: u64, high_score: u64, elapsed: Duration);
}

/// Host and score board that only log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHost;

impl HostCallbacks for TracingHost {
    fn on_game_start(&self, event: &GameStartEvent) {
        info!(state = %event.state, name = %event.name, "onGameStart");
    }

    fn on_game_end(&self, payload: &EncryptedPayload) {
        info!(digest = %payload.digest(), "onGameEnd");
    }
}

impl ScoreBoard for TracingHost {
    fn show_score(&self, score: u64, high_score: u64, elapsed: Duration) {
        info!(score, high_score, elapsed_secs = elapsed.as_secs_f64(), "showScore");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_event_shape() {
        let event = GameStartEvent::new("game_name");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({"state": "game_start", "name": "game_name"}));
    }
}
