//! Launch Orchestrator
//!
//! Owns everything that lives for a whole launch: the session context, the
//! host callbacks, the clock and the key source. Runs the boot phase, then
//! creates gameplay sessions on demand.
//!
//! ```text
//!   Booting ──boot()──▶ Menu ──start_session()──▶ Playing
//!                        ▲                          │
//!                        └──────exit_to_menu()──────┘
//! ```
//!
//! The tutorial detour is offered to the first session of a launch only.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::boot::readiness::{BootError, BootReport, SceneLayer, SceneReadinessCoordinator};
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::{ConfigError, LaunchMetadata, OrchestratorConfig};
use crate::core::context::SessionContext;
use crate::game::input::InputEvent;
use crate::game::session::{
    FrameOutcome, GameplaySession, SessionConfig, SessionParts, SessionServices,
};
use crate::host::{HostCallbacks, ScoreBoard};
use crate::submit::cipher::KeySource;
use crate::submit::payload::GameResult;
use crate::submit::pipeline::{ScoreSubmissionPipeline, SubmissionError};

/// Orchestrator errors.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Boot phase failed.
    #[error("Boot error: {0}")]
    Boot(#[from] BootError),

    /// Finish sequence failed.
    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// `onGameStart`/`onGameEnd` or the score board were never attached.
    #[error("Host callbacks not attached")]
    MissingHostCallbacks,

    /// Boot has not completed.
    #[error("Boot phase not complete")]
    NotReady,

    /// Boot already ran for this launch.
    #[error("Already booted")]
    AlreadyBooted,

    /// No gameplay session is active.
    #[error("No active session")]
    NoSession,

    /// The session has not reached its finish step.
    #[error("Session not finished")]
    NotFinished,
}

/// Launch phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorPhase {
    /// Boot layers not ready yet.
    Booting,
    /// Ready, no active session.
    Menu,
    /// A session is active.
    Playing,
}

/// Top-level driver for one launch of the game.
pub struct Orchestrator {
    config: OrchestratorConfig,
    ctx: SessionContext,
    host: Option<Arc<dyn HostCallbacks>>,
    scoreboard: Option<Arc<dyn ScoreBoard>>,
    clock: Arc<dyn Clock>,
    key_source: KeySource,
    phase: OrchestratorPhase,
    tutorial_pending: bool,
    session: Option<GameplaySession>,
}

impl Orchestrator {
    /// Create an orchestrator from config and host metadata.
    ///
    /// The key is read from the environment variable named by
    /// `config.public_key_var` at submission time unless
    /// [`with_key_source`](Self::with_key_source) overrides it.
    pub fn new(config: OrchestratorConfig, metadata: &LaunchMetadata) -> Self {
        let key_source = KeySource::Env(config.public_key_var.clone());
        Self {
            config,
            ctx: SessionContext::from_metadata(metadata),
            host: None,
            scoreboard: None,
            clock: Arc::new(SystemClock::new()),
            key_source,
            phase: OrchestratorPhase::Booting,
            tutorial_pending: true,
            session: None,
        }
    }

    /// Load config and metadata from the environment.
    pub fn from_env() -> Result<Self, OrchestratorError> {
        let config = OrchestratorConfig::from_env()?;
        let metadata = LaunchMetadata::from_env()?;
        Ok(Self::new(config, &metadata))
    }

    /// Attach the host's `onGameStart`/`onGameEnd` callbacks.
    pub fn with_host(mut self, host: Arc<dyn HostCallbacks>) -> Self {
        self.host = Some(host);
        self
    }

    /// Attach the UI layer's score panel.
    pub fn with_scoreboard(mut self, scoreboard: Arc<dyn ScoreBoard>) -> Self {
        self.scoreboard = Some(scoreboard);
        self
    }

    /// Replace the monotonic clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the key source.
    pub fn with_key_source(mut self, key_source: KeySource) -> Self {
        self.key_source = key_source;
        self
    }

    // =========================================================================
    // BOOT
    // =========================================================================

    /// Launch the UI and menu layers and wait for both to report ready.
    pub async fn boot(
        &mut self,
        ui: &mut dyn SceneLayer,
        menu: &mut dyn SceneLayer,
    ) -> Result<BootReport, OrchestratorError> {
        if self.phase != OrchestratorPhase::Booting {
            return Err(OrchestratorError::AlreadyBooted);
        }
        if self.host.is_none() || self.scoreboard.is_none() {
            return Err(OrchestratorError::MissingHostCallbacks);
        }

        info!(
            sponsor = self.ctx.sponsor(),
            high_score = self.ctx.high_score(),
            "boot phase started"
        );
        let coordinator = SceneReadinessCoordinator::new(self.config.ready_timeout);
        let report = coordinator.launch(&self.ctx, ui, menu).await?;

        self.phase = OrchestratorPhase::Menu;
        Ok(report)
    }

    // =========================================================================
    // SESSIONS
    // =========================================================================

    /// Start a new gameplay session, discarding any current one.
    pub fn start_session(&mut self, parts: SessionParts) -> Result<Uuid, OrchestratorError> {
        if self.phase == OrchestratorPhase::Booting {
            return Err(OrchestratorError::NotReady);
        }
        let services = self.services()?;

        if let Some(mut old) = self.session.take() {
            debug!(session = %old.id(), "replacing session");
            old.teardown();
        }

        let tutorial = std::mem::take(&mut self.tutorial_pending);
        let config = SessionConfig {
            tutorial,
            max_frame_delta: self.config.max_frame_delta,
            game_name: self.ctx.game_name().to_string(),
        };
        let session = GameplaySession::new(config, services, parts);
        let id = session.id();

        self.session = Some(session);
        self.phase = OrchestratorPhase::Playing;
        Ok(id)
    }

    /// Start over from the current session. Never shows the tutorial.
    pub fn restart(&mut self, parts: SessionParts) -> Result<Uuid, OrchestratorError> {
        if self.session.is_none() {
            return Err(OrchestratorError::NoSession);
        }
        info!("restarting session");
        self.start_session(parts)
    }

    /// Leave gameplay, discarding the session and any pending delivery.
    pub fn exit_to_menu(&mut self) {
        if let Some(mut session) = self.session.take() {
            info!(session = %session.id(), "exit to menu");
            session.teardown();
        }
        if self.phase == OrchestratorPhase::Playing {
            self.phase = OrchestratorPhase::Menu;
        }
    }

    fn services(&self) -> Result<SessionServices, OrchestratorError> {
        let (Some(host), Some(scoreboard)) = (self.host.clone(), self.scoreboard.clone()) else {
            return Err(OrchestratorError::MissingHostCallbacks);
        };
        let pipeline = ScoreSubmissionPipeline::new(
            self.key_source.clone(),
            self.config.presentation_delay,
            host.clone(),
            scoreboard,
        );
        Ok(SessionServices {
            clock: self.clock.clone(),
            host,
            pipeline,
        })
    }

    // =========================================================================
    // PER-FRAME
    // =========================================================================

    /// Advance the active session by one frame.
    pub fn frame(&mut self, delta: Duration) -> Result<FrameOutcome, OrchestratorError> {
        let session = self.session.as_mut().ok_or(OrchestratorError::NoSession)?;
        Ok(session.update(&mut self.ctx, delta)?)
    }

    /// Dispatch a host input event. Returns `true` if it changed anything.
    pub fn handle_input(&mut self, event: InputEvent) -> bool {
        let mut handled = false;
        if event.is_touch() {
            handled |= self.ctx.mark_touch();
        }
        if event.toggles_pause() {
            match self.session.as_mut() {
                Some(session) => handled |= session.pause_game(),
                None => debug!("pause key without session"),
            }
        }
        handled
    }

    /// External end trigger for the active session.
    pub fn end_game(&mut self) -> bool {
        match self.session.as_mut() {
            Some(session) => session.end_game(),
            None => {
                warn!("end requested without session");
                false
            }
        }
    }

    /// Wait until the finished session's result has been delivered.
    ///
    /// The delivery stays owned by the session while waiting, so teardown
    /// still cancels it if this future is dropped.
    pub async fn wait_for_result(&self) -> Result<GameResult, OrchestratorError> {
        let session = self.session.as_ref().ok_or(OrchestratorError::NoSession)?;
        let pending = session.submission().ok_or(OrchestratorError::NotFinished)?;
        Ok(pending.delivered().await?)
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Launch phase.
    pub fn phase(&self) -> OrchestratorPhase {
        self.phase
    }

    /// Shared session context.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Shared session context, mutably (volume settings, extras).
    pub fn context_mut(&mut self) -> &mut SessionContext {
        &mut self.ctx
    }

    /// Active session.
    pub fn session(&self) -> Option<&GameplaySession> {
        self.session.as_ref()
    }

    /// Active session, mutably (tutorial dismissal, start holds, awards).
    pub fn session_mut(&mut self) -> Option<&mut GameplaySession> {
        self.session.as_mut()
    }

    /// Effective configuration.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }
}
