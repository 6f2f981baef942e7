//! Session Context
//!
//! The shared store every component reads: host ids, volumes, the touch flag
//! and the persisted high score. It is created once at boot and passed by
//! reference; there is no ambient lookup.
//!
//! Well-known keys are typed fields. Anything else the host or a scene wants
//! to share goes through the string-keyed [`SessionContext::set`] /
//! [`SessionContext::get`] pair.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, info};

use crate::core::config::LaunchMetadata;

/// Volume written at boot for both music and effects.
pub const DEFAULT_VOLUME: f32 = 0.2;

/// Outcome of offering a finished score to the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighScoreUpdate {
    /// High score before the offer.
    pub previous: u64,
    /// High score after the offer.
    pub current: u64,
    /// Whether the stored value was (re)written. True on ties.
    pub written: bool,
}

/// Cross-scene session state.
#[derive(Debug, Clone)]
pub struct SessionContext {
    high_score: u64,
    high_score_writes: u32,
    sponsor: String,
    music_volume: f32,
    sfx_volume: f32,
    parent_size: Option<String>,
    is_touch: bool,
    game_id: Option<String>,
    season_id: Option<String>,
    game_name: String,
    extras: BTreeMap<String, Value>,
}

impl SessionContext {
    /// Populate the context from host launch metadata.
    pub fn from_metadata(meta: &LaunchMetadata) -> Self {
        Self {
            high_score: meta.high_score,
            high_score_writes: 0,
            sponsor: meta.sponsor.clone(),
            music_volume: DEFAULT_VOLUME,
            sfx_volume: DEFAULT_VOLUME,
            parent_size: meta.parent_size.clone(),
            is_touch: false,
            game_id: meta.game_id.clone(),
            season_id: meta.season_id.clone(),
            game_name: meta.game_name.clone(),
            extras: BTreeMap::new(),
        }
    }

    /// Offer a finished score. Replaces the high score when `score >= high_score`.
    pub fn record_score(&mut self, score: u64) -> HighScoreUpdate {
        let previous = self.high_score;
        if score >= previous {
            self.high_score = score;
            self.high_score_writes += 1;
            info!(previous, current = score, "high score written");
            HighScoreUpdate { previous, current: score, written: true }
        } else {
            debug!(score, high_score = previous, "score below high score");
            HighScoreUpdate { previous, current: previous, written: false }
        }
    }

    /// Persisted high score.
    pub fn high_score(&self) -> u64 {
        self.high_score
    }

    /// How many times the high score has been written this session.
    pub fn high_score_writes(&self) -> u32 {
        self.high_score_writes
    }

    /// Record that a touch-start was observed. Only the first call writes.
    ///
    /// Returns `true` if this call set the flag.
    pub fn mark_touch(&mut self) -> bool {
        if self.is_touch {
            return false;
        }
        self.is_touch = true;
        info!("touch input detected");
        true
    }

    /// Whether the device has produced touch input.
    pub fn is_touch(&self) -> bool {
        self.is_touch
    }

    /// Sponsor identifier.
    pub fn sponsor(&self) -> &str {
        &self.sponsor
    }

    /// Game identifier.
    pub fn game_id(&self) -> Option<&str> {
        self.game_id.as_deref()
    }

    /// Season identifier.
    pub fn season_id(&self) -> Option<&str> {
        self.season_id.as_deref()
    }

    /// Name tag for the game-start event.
    pub fn game_name(&self) -> &str {
        &self.game_name
    }

    /// Layout hint.
    pub fn parent_size(&self) -> Option<&str> {
        self.parent_size.as_deref()
    }

    /// Music volume in `[0, 1]`.
    pub fn music_volume(&self) -> f32 {
        self.music_volume
    }

    /// Effects volume in `[0, 1]`.
    pub fn sfx_volume(&self) -> f32 {
        self.sfx_volume
    }

    /// Set music volume, clamped to `[0, 1]`.
    pub fn set_music_volume(&mut self, volume: f32) {
        self.music_volume = clamp_volume(volume);
    }

    /// Set effects volume, clamped to `[0, 1]`.
    pub fn set_sfx_volume(&mut self, volume: f32) {
        self.sfx_volume = clamp_volume(volume);
    }

    /// Store an untyped value under `key`.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.extras.insert(key.into(), value);
    }

    /// Read an untyped value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn context_with_high_score(high_score: u64) -> SessionContext {
        SessionContext::from_metadata(&LaunchMetadata {
            high_score,
            ..Default::default()
        })
    }

    #[test]
    fn test_boot_population() {
        let meta = LaunchMetadata {
            high_score: 12,
            sponsor: "acme".into(),
            game_id: Some("g".into()),
            season_id: Some("s".into()),
            parent_size: Some("100%".into()),
            ..Default::default()
        };
        let ctx = SessionContext::from_metadata(&meta);

        assert_eq!(ctx.high_score(), 12);
        assert_eq!(ctx.sponsor(), "acme");
        assert_eq!(ctx.game_id(), Some("g"));
        assert_eq!(ctx.season_id(), Some("s"));
        assert_eq!(ctx.parent_size(), Some("100%"));
        assert_eq!(ctx.music_volume(), DEFAULT_VOLUME);
        assert_eq!(ctx.sfx_volume(), DEFAULT_VOLUME);
        assert!(!ctx.is_touch());
    }

    #[test]
    fn test_higher_score_replaces() {
        let mut ctx = context_with_high_score(50);
        let update = ctx.record_score(80);
        assert!(update.written);
        assert_eq!(update.previous, 50);
        assert_eq!(ctx.high_score(), 80);
    }

    #[test]
    fn test_lower_score_kept_out() {
        let mut ctx = context_with_high_score(50);
        let update = ctx.record_score(10);
        assert!(!update.written);
        assert_eq!(ctx.high_score(), 50);
        assert_eq!(ctx.high_score_writes(), 0);
    }

    #[test]
    fn test_tie_is_rewritten() {
        let mut ctx = context_with_high_score(100);
        let update = ctx.record_score(100);
        assert!(update.written);
        assert_eq!(ctx.high_score(), 100);
        assert_eq!(ctx.high_score_writes(), 1);
    }

    #[test]
    fn test_touch_written_once() {
        let mut ctx = context_with_high_score(0);
        assert!(ctx.mark_touch());
        assert!(!ctx.mark_touch());
        assert!(ctx.is_touch());
    }

    #[test]
    fn test_volume_clamped() {
        let mut ctx = context_with_high_score(0);
        ctx.set_music_volume(3.0);
        ctx.set_sfx_volume(-1.0);
        assert_eq!(ctx.music_volume(), 1.0);
        assert_eq!(ctx.sfx_volume(), 0.0);

        ctx.set_music_volume(f32::NAN);
        assert_eq!(ctx.music_volume(), 0.0);
    }

    #[test]
    fn test_extras_round_trip() {
        let mut ctx = context_with_high_score(0);
        ctx.set("difficulty", serde_json::json!("hard"));
        assert_eq!(ctx.get("difficulty"), Some(&serde_json::json!("hard")));
        assert!(ctx.get("missing").is_none());
    }

    proptest! {
        #[test]
        fn prop_high_score_is_max(prior in 0u64..1_000_000, score in 0u64..1_000_000) {
            let mut ctx = context_with_high_score(prior);
            ctx.record_score(score);
            prop_assert_eq!(ctx.high_score(), prior.max(score));
        }

        #[test]
        fn prop_high_score_never_decreases(scores in proptest::collection::vec(0u64..10_000, 1..20)) {
            let mut ctx = context_with_high_score(0);
            let mut last = 0;
            for score in scores {
                ctx.record_score(score);
                prop_assert!(ctx.high_score() >= last);
                last = ctx.high_score();
            }
        }
    }
}
