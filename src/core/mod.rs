//! Core primitives shared by every phase.
//!
//! Configuration, the session context and the monotonic clock.

pub mod clock;
pub mod config;
pub mod context;

// Re-export core types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, LaunchMetadata, OrchestratorConfig};
pub use context::{HighScoreUpdate, SessionContext};
