//! # Arcade Session Orchestrator
//!
//! Lifecycle of an embedded arcade game launch: boot readiness, the
//! per-session gameplay state machine, pause handling, and the encrypted
//! hand-off of the final score to the hosting page.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ARCADE SESSION                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Shared primitives                         │
//! │  ├── context.rs  - Session context (high score, flags)       │
//! │  ├── config.rs   - Env config and launch metadata            │
//! │  └── clock.rs    - Monotonic clock                           │
//! │                                                              │
//! │  boot/           - Boot phase                                │
//! │  └── readiness.rs- UI then menu readiness handshake          │
//! │                                                              │
//! │  game/           - Gameplay                                  │
//! │  ├── state.rs    - States and frame transition table         │
//! │  ├── session.rs  - Per-frame session driver                  │
//! │  ├── pause.rs    - Pause controller, scheduled events        │
//! │  └── input.rs    - Host input events                         │
//! │                                                              │
//! │  submit/         - Finish sequence                           │
//! │  ├── payload.rs  - Score payload and result                  │
//! │  ├── cipher.rs   - RSA encryption boundary                   │
//! │  └── pipeline.rs - High score update, deferred delivery      │
//! │                                                              │
//! │  host.rs         - Host callback traits                      │
//! │  orchestrator.rs - Launch driver                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Score Confidentiality
//!
//! The host's `onGameEnd` callback only ever receives ciphertext. The
//! plaintext score is shown on the UI layer's score panel and kept in the
//! session context; it never crosses the host boundary.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod boot;
pub mod core;
pub mod game;
pub mod host;
pub mod orchestrator;
pub mod submit;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use core::config::{LaunchMetadata, OrchestratorConfig};
pub use core::context::SessionContext;
pub use game::input::{InputEvent, Key};
pub use game::session::{GameplaySession, SessionParts};
pub use game::state::GameplayState;
pub use host::{GameStartEvent, HostCallbacks, ScoreBoard, TracingHost};
pub use orchestrator::{Orchestrator, OrchestratorError, OrchestratorPhase};
pub use submit::{EncryptedPayload, GameResult, KeySource, ScorePayload};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Nominal frame rate of the host loop (Hz)
pub const FRAME_RATE: u32 = 60;
