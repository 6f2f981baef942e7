//! Boot Phase
//!
//! Launches the boot layers and gates gameplay on their readiness.

pub mod readiness;

pub use readiness::{
    BootError, BootLayer, BootReport, ReadinessBarrier, ReadySignal, SceneLayer,
    SceneReadinessCoordinator,
};
