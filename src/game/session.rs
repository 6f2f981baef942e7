//! Gameplay Session
//!
//! One play-through, driven once per frame by [`GameplaySession::update`].
//! The frame asks the transition table what to do ([`plan_frame`]) and
//! performs exactly that action; state is never consulted twice per frame.
//!
//! Collaborators are injected as [`SessionParts`] (score model, tutorial,
//! time-driven subsystems) and [`SessionServices`] (clock, host callbacks,
//! submission pipeline).

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::clock::Clock;
use crate::core::context::SessionContext;
use crate::game::pause::{FiredEvent, PauseController, Suspendable, TimerId};
use crate::game::state::{
    clamp_frame_delta, plan_frame, FrameAction, GameplayState, SessionFlags, SessionTiming,
};
use crate::host::{GameStartEvent, HostCallbacks};
use crate::submit::pipeline::{PendingSubmission, ScoreSubmissionPipeline, SubmissionError};

// =============================================================================
// COLLABORATORS
// =============================================================================

/// Score accounting advanced during play.
pub trait ScoreModel: Send {
    /// Advance by the clamped frame delta.
    fn advance(&mut self, dt: Duration);
    /// Add points earned by gameplay events.
    fn award(&mut self, points: u64);
    /// Current score.
    fn score(&self) -> u64;
}

/// Score that accrues with play time, plus awarded points.
#[derive(Debug, Clone, Default)]
pub struct TimeScore {
    points_per_second: u64,
    played: Duration,
    awarded: u64,
}

impl TimeScore {
    /// Accrue `points_per_second` of play.
    pub fn new(points_per_second: u64) -> Self {
        Self {
            points_per_second,
            played: Duration::ZERO,
            awarded: 0,
        }
    }
}

impl ScoreModel for TimeScore {
    fn advance(&mut self, dt: Duration) {
        self.played += dt;
    }

    fn award(&mut self, points: u64) {
        self.awarded = self.awarded.saturating_add(points);
    }

    fn score(&self) -> u64 {
        let millis = self.played.as_millis() as u64;
        let accrued = millis.saturating_mul(self.points_per_second) / 1000;
        accrued.saturating_add(self.awarded)
    }
}

/// Result of showing the tutorial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TutorialProgress {
    /// Done already; start may proceed next frame.
    Finished,
    /// Still on screen; call [`GameplaySession::complete_tutorial`] when dismissed.
    Showing,
}

/// Presents the tutorial intro.
pub trait TutorialPresenter: Send {
    /// Show the instructions.
    fn show_instructions(&mut self) -> TutorialProgress;
}

/// Tutorial that completes immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkipTutorial;

impl TutorialPresenter for SkipTutorial {
    fn show_instructions(&mut self) -> TutorialProgress {
        TutorialProgress::Finished
    }
}

/// Per-session collaborators.
pub struct SessionParts {
    /// Score accounting.
    pub score: Box<dyn ScoreModel>,
    /// Tutorial presentation.
    pub tutorial: Box<dyn TutorialPresenter>,
    /// Time-driven subsystems paused with the session.
    pub subsystems: Vec<Box<dyn Suspendable>>,
}

impl Default for SessionParts {
    fn default() -> Self {
        Self {
            score: Box::new(TimeScore::new(10)),
            tutorial: Box::new(SkipTutorial),
            subsystems: Vec::new(),
        }
    }
}

/// Services shared by every session of a launch.
#[derive(Clone)]
pub struct SessionServices {
    /// Monotonic clock.
    pub clock: Arc<dyn Clock>,
    /// Host callbacks.
    pub host: Arc<dyn HostCallbacks>,
    /// Finish sequence.
    pub pipeline: ScoreSubmissionPipeline,
}

/// Per-session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Take the tutorial detour before the first start.
    pub tutorial: bool,
    /// Ceiling applied to each frame delta.
    pub max_frame_delta: Duration,
    /// Name tag for the game-start event.
    pub game_name: String,
}

/// What a frame did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOutcome {
    /// State after the frame.
    pub state: GameplayState,
    /// Action performed.
    pub action: FrameAction,
    /// Delta used for accounting (zero unless playing).
    pub effective_delta: Duration,
    /// Timed events that came due.
    pub fired: Vec<FiredEvent>,
}

// =============================================================================
// SESSION
// =============================================================================

/// A single play-through.
pub struct GameplaySession {
    id: Uuid,
    state: GameplayState,
    flags: SessionFlags,
    tutorial_showing: bool,
    start_held: bool,
    timing: SessionTiming,
    config: SessionConfig,
    services: SessionServices,
    score: Box<dyn ScoreModel>,
    tutorial: Box<dyn TutorialPresenter>,
    pause: PauseController,
    submission: Option<PendingSubmission>,
    frame: u64,
}

impl GameplaySession {
    /// Create a session in `Init`.
    pub fn new(config: SessionConfig, services: SessionServices, parts: SessionParts) -> Self {
        let mut pause = PauseController::new(services.clock.clone());
        for mut subsystem in parts.subsystems {
            // Shared animators may still be frozen from the previous session
            subsystem.resume();
            pause.register(subsystem);
        }

        let id = Uuid::new_v4();
        info!(session = %id, tutorial = config.tutorial, "session created");

        Self {
            id,
            state: GameplayState::Init,
            flags: SessionFlags::new(config.tutorial),
            tutorial_showing: false,
            start_held: false,
            timing: SessionTiming::default(),
            config,
            services,
            score: parts.score,
            tutorial: parts.tutorial,
            pause,
            submission: None,
            frame: 0,
        }
    }

    /// Run one frame.
    ///
    /// Only the finish step can fail; the error is returned once and the
    /// session stays in `GameOver` without retrying.
    pub fn update(
        &mut self,
        ctx: &mut SessionContext,
        delta: Duration,
    ) -> Result<FrameOutcome, SubmissionError> {
        self.frame += 1;
        let action = plan_frame(self.state, &self.flags);
        let mut effective_delta = Duration::ZERO;
        let mut fired = Vec::new();

        match action {
            FrameAction::EnterRestart => self.set_state(GameplayState::Restart),
            FrameAction::BeginTutorial => self.begin_tutorial(),
            FrameAction::StartPlay => self.start_play(),
            FrameAction::AdvancePlay => {
                effective_delta = clamp_frame_delta(delta, self.config.max_frame_delta);
                if effective_delta < delta {
                    debug!(
                        session = %self.id,
                        delta_ms = delta.as_millis() as u64,
                        "frame delta clamped"
                    );
                }
                self.score.advance(effective_delta);
                fired = self.pause.timers_mut().advance(effective_delta);
            }
            FrameAction::Finish => self.finish(ctx)?,
            FrameAction::Wait => {}
        }

        Ok(FrameOutcome {
            state: self.state,
            action,
            effective_delta,
            fired,
        })
    }

    fn set_state(&mut self, next: GameplayState) {
        debug!(session = %self.id, frame = self.frame, from = %self.state, to = %next, "transition");
        self.state = next;
    }

    fn refresh_start_gate(&mut self) {
        self.flags.start_blocked = self.tutorial_showing || self.start_held;
    }

    fn begin_tutorial(&mut self) {
        self.flags.tutorial = false;
        self.flags.auto_start = false;
        self.flags.paused = true;
        self.pause.pause();

        info!(session = %self.id, "tutorial started");
        self.tutorial_showing = self.tutorial.show_instructions() == TutorialProgress::Showing;
        self.refresh_start_gate();
        if !self.tutorial_showing {
            info!(session = %self.id, "tutorial finished");
        }
    }

    fn start_play(&mut self) {
        self.timing.start = Some(self.services.clock.now());
        self.flags.paused = false;
        self.pause.resume();
        self.set_state(GameplayState::Play);

        info!(session = %self.id, "play started");
        let event = GameStartEvent::new(self.config.game_name.as_str());
        self.services.host.on_game_start(&event);
    }

    fn finish(&mut self, ctx: &mut SessionContext) -> Result<(), SubmissionError> {
        self.timing.finish = Some(self.services.clock.now());
        self.flags.paused = true;
        self.flags.finished = true;
        self.pause.pause();

        let score = self.score.score();
        let elapsed = self.timing.elapsed().unwrap_or_default();
        info!(
            session = %self.id,
            elapsed_secs = elapsed.as_secs_f64(),
            paused_secs = self.pause.total_paused().as_secs_f64(),
            "session finished"
        );

        match self.services.pipeline.submit(ctx, score, elapsed) {
            Ok(pending) => {
                self.submission = Some(pending);
                Ok(())
            }
            Err(e) => {
                warn!(session = %self.id, error = %e, "score submission failed");
                Err(e)
            }
        }
    }

    // =========================================================================
    // TRIGGERS
    // =========================================================================

    /// Toggle pause. Only meaningful while playing.
    ///
    /// Returns `true` if the pause state changed.
    pub fn pause_game(&mut self) -> bool {
        if self.state != GameplayState::Play {
            debug!(session = %self.id, state = %self.state, "pause ignored outside play");
            return false;
        }
        self.flags.paused = !self.flags.paused;
        if self.flags.paused {
            self.pause.pause();
        } else {
            self.pause.resume();
        }
        true
    }

    /// External end trigger. Only applies while playing.
    ///
    /// A paused session is unflagged so the finish step runs on the next
    /// frame; its subsystems stay suspended.
    pub fn end_game(&mut self) -> bool {
        if self.state != GameplayState::Play {
            debug!(session = %self.id, state = %self.state, "end ignored outside play");
            return false;
        }
        self.flags.paused = false;
        self.set_state(GameplayState::GameOver);
        true
    }

    /// The tutorial was dismissed. Returns `false` if none was showing.
    pub fn complete_tutorial(&mut self) -> bool {
        if !self.tutorial_showing {
            return false;
        }
        self.tutorial_showing = false;
        self.refresh_start_gate();
        info!(session = %self.id, "tutorial finished");
        true
    }

    /// Hold the start gate (intro animation playing).
    pub fn hold_start(&mut self) {
        self.start_held = true;
        self.refresh_start_gate();
    }

    /// Release a start hold.
    pub fn release_start(&mut self) {
        self.start_held = false;
        self.refresh_start_gate();
    }

    /// Add points from a gameplay event. Ignored unless playing.
    pub fn award(&mut self, points: u64) {
        if self.state == GameplayState::Play && !self.flags.paused {
            self.score.award(points);
        }
    }

    /// Schedule an event that fires after `delay` of unpaused play.
    pub fn schedule_event(&mut self, label: impl Into<String>, delay: Duration) -> TimerId {
        self.pause.timers_mut().schedule(label, delay)
    }

    /// Cancel the pending submission, if any. Called on teardown.
    pub fn teardown(&mut self) {
        if let Some(pending) = self.submission.take() {
            pending.cancel();
        }
        debug!(session = %self.id, "session torn down");
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Session id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> GameplayState {
        self.state
    }

    /// Current flags.
    pub fn flags(&self) -> &SessionFlags {
        &self.flags
    }

    /// Whether paused.
    pub fn is_paused(&self) -> bool {
        self.flags.paused
    }

    /// Current score.
    pub fn score(&self) -> u64 {
        self.score.score()
    }

    /// Timing samples.
    pub fn timing(&self) -> &SessionTiming {
        &self.timing
    }

    /// Pause controller.
    pub fn pause_controller(&self) -> &PauseController {
        &self.pause
    }

    /// Pending submission, if the finish step ran.
    pub fn submission(&self) -> Option<&PendingSubmission> {
        self.submission.as_ref()
    }
}

impl Drop for GameplaySession {
    fn drop(&mut self) {
        self.teardown();
    }
}
