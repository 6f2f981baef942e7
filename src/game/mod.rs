//! Gameplay Module
//!
//! The per-session state machine and everything it drives.
//!
//! ## Module Structure
//!
//! - `state`: States, flags, and the frame transition table
//! - `session`: One play-through driven per frame
//! - `pause`: Pause controller and scheduled events
//! - `input`: Host input events

pub mod input;
pub mod pause;
pub mod session;
pub mod state;

// Re-export key types
pub use input::{InputEvent, Key};
pub use pause::{FiredEvent, PauseController, ScheduledEvents, Suspendable, TimerId};
pub use session::{
    FrameOutcome, GameplaySession, ScoreModel, SessionConfig, SessionParts, SessionServices,
    SkipTutorial, TimeScore, TutorialPresenter, TutorialProgress,
};
pub use state::{FrameAction, GameplayState, SessionFlags, SessionTiming};
