//! Score Submission Pipeline
//!
//! Runs once per session when the finish step is reached:
//!
//! 1. Offer the score to the context (ties rewrite the high score).
//! 2. Build and encrypt the payload. Failure aborts the submission; there is
//!    no plaintext fallback.
//! 3. Schedule a deferred task that, after the presentation delay, shows the
//!    plaintext result locally and hands the ciphertext to the host.
//!
//! The deferred task never blocks the frame loop and can be cancelled if the
//! session is torn down before it fires. Waiting on delivery never takes the
//! task away from its [`PendingSubmission`], and dropping that handle aborts
//! an undelivered task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::context::SessionContext;
use crate::host::{HostCallbacks, ScoreBoard};
use crate::submit::cipher::{CipherError, KeySource, PayloadEncryptor};
use crate::submit::payload::{GameResult, ScorePayload};

/// Submission errors.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Key provisioning or encryption failed.
    #[error("score encryption failed: {0}")]
    Cipher(#[from] CipherError),
    /// Deferred delivery needs a tokio runtime.
    #[error("no async runtime available to schedule the result")]
    NoRuntime,
    /// The deferred task was cancelled before delivery.
    #[error("submission cancelled before delivery")]
    Cancelled,
    /// The deferred task stopped without delivering.
    #[error("submission task failed: {0}")]
    Task(String),
}

/// Builds, encrypts and delivers a session's result.
#[derive(Clone)]
pub struct ScoreSubmissionPipeline {
    key_source: KeySource,
    presentation_delay: Duration,
    host: Arc<dyn HostCallbacks>,
    scoreboard: Arc<dyn ScoreBoard>,
}

impl ScoreSubmissionPipeline {
    /// Create a pipeline.
    pub fn new(
        key_source: KeySource,
        presentation_delay: Duration,
        host: Arc<dyn HostCallbacks>,
        scoreboard: Arc<dyn ScoreBoard>,
    ) -> Self {
        Self {
            key_source,
            presentation_delay,
            host,
            scoreboard,
        }
    }

    /// Run the finish sequence for `score` over `elapsed` play time.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(
        &self,
        ctx: &mut SessionContext,
        score: u64,
        elapsed: Duration,
    ) -> Result<PendingSubmission, SubmissionError> {
        let runtime = Handle::try_current().map_err(|_| SubmissionError::NoRuntime)?;

        let update = ctx.record_score(score);

        let payload = ScorePayload {
            score,
            game_id: ctx.game_id().map(str::to_owned),
            season_id: ctx.season_id().map(str::to_owned),
        };
        let encrypted = PayloadEncryptor::from_source(&self.key_source)?.encrypt(&payload)?;

        let result = GameResult {
            score,
            high_score: update.current,
            new_high_score: update.written,
            elapsed,
            finished_at: Utc::now(),
        };

        debug!(score, high_score = update.current, "final result");
        info!(
            digest = %encrypted.digest(),
            delay_ms = self.presentation_delay.as_millis() as u64,
            "score submission scheduled"
        );

        let delay = self.presentation_delay;
        let host = self.host.clone();
        let scoreboard = self.scoreboard.clone();
        let delivered = result.clone();
        let (done_tx, done_rx) = watch::channel(None);

        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            scoreboard.show_score(delivered.score, delivered.high_score, delivered.elapsed);
            host.on_game_end(&encrypted);
            info!(digest = %encrypted.digest(), "score submission delivered");
            let _ = done_tx.send(Some(delivered));
        });

        Ok(PendingSubmission {
            handle,
            done: done_rx,
            cancelled: AtomicBool::new(false),
            result,
        })
    }
}

/// Handle to a scheduled delivery.
///
/// Owns the deferred task: dropping the handle aborts it if it has not
/// delivered yet.
#[derive(Debug)]
pub struct PendingSubmission {
    handle: JoinHandle<()>,
    done: watch::Receiver<Option<GameResult>>,
    cancelled: AtomicBool,
    result: GameResult,
}

impl PendingSubmission {
    /// The plaintext result that will be shown.
    pub fn result(&self) -> &GameResult {
        &self.result
    }

    /// Whether the task has stopped (delivered or cancelled).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel delivery if it has not happened yet.
    pub fn cancel(&self) {
        if !self.handle.is_finished() {
            warn!("pending score submission cancelled");
            self.cancelled.store(true, Ordering::SeqCst);
            self.handle.abort();
        }
    }

    /// Wait for delivery.
    ///
    /// Can be called repeatedly. Dropping the returned future leaves the task
    /// owned by this handle, so it can still be cancelled.
    pub async fn delivered(&self) -> Result<GameResult, SubmissionError> {
        let mut done = self.done.clone();
        let outcome = done
            .wait_for(Option::is_some)
            .await
            .map(|delivered| (*delivered).clone());

        match outcome {
            Ok(Some(result)) => Ok(result),
            _ if self.cancelled.load(Ordering::SeqCst) => Err(SubmissionError::Cancelled),
            _ => Err(SubmissionError::Task(
                "delivery task stopped without a result".to_string(),
            )),
        }
    }
}

impl Drop for PendingSubmission {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            debug!("undelivered score submission dropped");
            self.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LaunchMetadata;
    use crate::testing::{decrypt, public_key_pem, RecordingHost};

    fn context(high_score: u64) -> SessionContext {
        SessionContext::from_metadata(&LaunchMetadata {
            high_score,
            game_id: Some("g-7".into()),
            season_id: Some("s-3".into()),
            ..Default::default()
        })
    }

    fn pipeline(host: &Arc<RecordingHost>, key_source: KeySource) -> ScoreSubmissionPipeline {
        ScoreSubmissionPipeline::new(
            key_source,
            Duration::from_millis(2000),
            host.clone(),
            host.clone(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivery_waits_for_presentation_delay() {
        let host = Arc::new(RecordingHost::default());
        let mut ctx = context(10);
        let pending = pipeline(&host, KeySource::Pem(public_key_pem()))
            .submit(&mut ctx, 50, Duration::from_secs(12))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(host.end_count(), 0);
        assert!(host.shown().is_empty());

        let result = pending.delivered().await.unwrap();
        assert_eq!(host.end_count(), 1);
        assert_eq!(host.shown(), vec![(50, 50, Duration::from_secs(12))]);
        assert_eq!(result.high_score, 50);
        assert!(result.new_high_score);
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_receives_only_ciphertext() {
        let host = Arc::new(RecordingHost::default());
        let mut ctx = context(0);
        pipeline(&host, KeySource::Pem(public_key_pem()))
            .submit(&mut ctx, 987654, Duration::from_secs(1))
            .unwrap()
            .delivered()
            .await
            .unwrap();

        let payload = host.last_end().unwrap();
        assert!(!payload.as_str().contains("987654"));
        assert_eq!(
            decrypt(&payload),
            r#"{"score":987654,"game_id":"g-7","season_id":"s-3"}"#
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_tie_score_rewrites_high_score() {
        let host = Arc::new(RecordingHost::default());
        let mut ctx = context(100);
        let pending = pipeline(&host, KeySource::Pem(public_key_pem()))
            .submit(&mut ctx, 100, Duration::ZERO)
            .unwrap();

        assert_eq!(ctx.high_score(), 100);
        assert_eq!(ctx.high_score_writes(), 1);
        assert!(pending.result().new_high_score);
    }

    #[tokio::test]
    async fn test_missing_key_aborts_submission() {
        let host = Arc::new(RecordingHost::default());
        let mut ctx = context(0);
        let result = pipeline(&host, KeySource::Env("ARCADE_TEST_PIPELINE_NO_KEY".into()))
            .submit(&mut ctx, 5, Duration::ZERO);

        assert!(matches!(
            result,
            Err(SubmissionError::Cipher(CipherError::MissingKey(_)))
        ));
        assert_eq!(host.end_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_delivery() {
        let host = Arc::new(RecordingHost::default());
        let mut ctx = context(0);
        let pending = pipeline(&host, KeySource::Pem(public_key_pem()))
            .submit(&mut ctx, 5, Duration::ZERO)
            .unwrap();

        pending.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(host.end_count(), 0);
        assert!(matches!(pending.delivered().await, Err(SubmissionError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_wait_keeps_task_cancellable() {
        let host = Arc::new(RecordingHost::default());
        let mut ctx = context(0);
        let pending = pipeline(&host, KeySource::Pem(public_key_pem()))
            .submit(&mut ctx, 5, Duration::ZERO)
            .unwrap();

        let waited = tokio::time::timeout(Duration::from_millis(100), pending.delivered()).await;
        assert!(waited.is_err());

        pending.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(host.end_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_aborts_undelivered_task() {
        let host = Arc::new(RecordingHost::default());
        let mut ctx = context(0);
        let pending = pipeline(&host, KeySource::Pem(public_key_pem()))
            .submit(&mut ctx, 5, Duration::ZERO)
            .unwrap();

        drop(pending);
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(host.end_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivered_can_be_awaited_again() {
        let host = Arc::new(RecordingHost::default());
        let mut ctx = context(0);
        let pending = pipeline(&host, KeySource::Pem(public_key_pem()))
            .submit(&mut ctx, 42, Duration::ZERO)
            .unwrap();

        let first = pending.delivered().await.unwrap();
        let second = pending.delivered().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(host.end_count(), 1);
    }

    #[test]
    fn test_no_runtime_is_an_error() {
        let host = Arc::new(RecordingHost::default());
        let mut ctx = context(0);
        let result = pipeline(&host, KeySource::Pem(public_key_pem()))
            .submit(&mut ctx, 5, Duration::ZERO);
        assert!(matches!(result, Err(SubmissionError::NoRuntime)));
        assert_eq!(ctx.high_score_writes(), 0);
    }
}
