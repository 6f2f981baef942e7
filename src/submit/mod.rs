//! Score Submission
//!
//! Everything between the finish step and the host's `onGameEnd`:
//!
//! - `payload`: plaintext payload, ciphertext wrapper, presentation result
//! - `cipher`: public-key encryption boundary
//! - `pipeline`: high-score update and deferred, cancellable delivery

pub mod cipher;
pub mod payload;
pub mod pipeline;

pub use cipher::{CipherError, KeySource, PayloadEncryptor};
pub use payload::{EncryptedPayload, GameResult, ScorePayload};
pub use pipeline::{PendingSubmission, ScoreSubmissionPipeline, SubmissionError};
