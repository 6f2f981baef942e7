//! Gameplay State Definitions
//!
//! The session's states, its flags, and the transition table as a pure
//! function so it can be tested without a frame loop.
//!
//! | State      | Condition                          | Action          |
//! |------------|------------------------------------|-----------------|
//! | `Init`     | always                             | `EnterRestart`  |
//! | `Restart`  | auto-start and tutorial pending    | `BeginTutorial` |
//! | `Restart`  | start not blocked                  | `StartPlay`     |
//! | `Play`     | unpaused                           | `AdvancePlay`   |
//! | `GameOver` | unpaused and not yet finished      | `Finish`        |
//! | otherwise  |                                    | `Wait`          |

use std::fmt;
use std::time::Duration;

// =============================================================================
// STATE
// =============================================================================

/// Gameplay session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameplayState {
    /// Session just created.
    #[default]
    Init,
    /// Waiting at the start gate (tutorial, intro hold).
    Restart,
    /// Active play.
    Play,
    /// Ended by an external trigger.
    GameOver,
}

impl GameplayState {
    /// Stable lowercase tag for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            GameplayState::Init => "init",
            GameplayState::Restart => "restart",
            GameplayState::Play => "play",
            GameplayState::GameOver => "game_over",
        }
    }
}

impl fmt::Display for GameplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// FLAGS
// =============================================================================

/// Flags consulted by the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionFlags {
    /// Tutorial detour still pending.
    pub tutorial: bool,
    /// Session may take the tutorial detour automatically.
    pub auto_start: bool,
    /// Start gate held (tutorial showing, intro animation).
    pub start_blocked: bool,
    /// Session paused.
    pub paused: bool,
    /// Finish sequence already ran.
    pub finished: bool,
}

impl SessionFlags {
    /// Flags for a fresh session.
    pub fn new(tutorial: bool) -> Self {
        Self {
            tutorial,
            auto_start: true,
            start_blocked: false,
            paused: false,
            finished: false,
        }
    }
}

// =============================================================================
// TRANSITIONS
// =============================================================================

/// What a frame should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    /// `Init` -> `Restart`.
    EnterRestart,
    /// Disable auto-start, pause, show the tutorial, clear the tutorial flag.
    BeginTutorial,
    /// Sample start time, unpause, notify the host, -> `Play`.
    StartPlay,
    /// Advance score accounting by the clamped delta.
    AdvancePlay,
    /// Sample finish time, pause, run the submission.
    Finish,
    /// Nothing this frame.
    Wait,
}

/// Decide the frame's action. State is consulted once.
pub fn plan_frame(state: GameplayState, flags: &SessionFlags) -> FrameAction {
    match state {
        GameplayState::Init => FrameAction::EnterRestart,
        GameplayState::Restart => {
            if flags.auto_start && flags.tutorial {
                FrameAction::BeginTutorial
            } else if !flags.start_blocked {
                FrameAction::StartPlay
            } else {
                FrameAction::Wait
            }
        }
        GameplayState::Play => {
            if flags.paused {
                FrameAction::Wait
            } else {
                FrameAction::AdvancePlay
            }
        }
        GameplayState::GameOver => {
            if flags.paused || flags.finished {
                FrameAction::Wait
            } else {
                FrameAction::Finish
            }
        }
    }
}

/// Clamp a frame delta to `max`.
#[inline]
pub fn clamp_frame_delta(delta: Duration, max: Duration) -> Duration {
    delta.min(max)
}

// =============================================================================
// TIMING
// =============================================================================

/// Monotonic samples taken at the start and finish of play.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionTiming {
    /// Sampled on entry to `Play`.
    pub start: Option<Duration>,
    /// Sampled at the finish step.
    pub finish: Option<Duration>,
}

impl SessionTiming {
    /// `finish - start`, never negative. `None` until both are set.
    pub fn elapsed(&self) -> Option<Duration> {
        match (self.start, self.finish) {
            (Some(start), Some(finish)) => Some(finish.saturating_sub(start)),
            _ => None,
        }
    }
}
