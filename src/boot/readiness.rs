//! Scene Readiness Handshake
//!
//! Boot launches the UI overlay, waits for its one-shot "created" signal,
//! then launches the menu layer and waits for that one. Only when both have
//! reported does the boot phase stop and hand control to gameplay.
//!
//! ```text
//!   launch(ui) ──created──▶ launch(menu) ──created──▶ all ready ──▶ boot stopped
//! ```
//!
//! Each wait is bounded by the configured timeout. Extra signals are ignored.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::core::context::SessionContext;

/// Layers launched during boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BootLayer {
    /// UI overlay (panels, score board, animations manager).
    Ui,
    /// Menu layer, drawn behind the UI.
    Menu,
}

impl fmt::Display for BootLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootLayer::Ui => write!(f, "ui"),
            BootLayer::Menu => write!(f, "menu"),
        }
    }
}

/// Boot errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BootError {
    /// A layer did not report readiness in time.
    #[error("{layer} layer not ready after {waited:?}")]
    ReadinessTimeout {
        /// Layer that stalled.
        layer: BootLayer,
        /// How long we waited.
        waited: Duration,
    },
    /// A layer dropped its signal without firing it.
    #[error("{layer} layer dropped its ready signal")]
    LayerAbandoned {
        /// Layer that gave up.
        layer: BootLayer,
    },
}

/// One-shot "created" signal handed to a layer at launch.
///
/// Clones share the same slot; only the first `fire` is delivered.
#[derive(Debug, Clone)]
pub struct ReadySignal {
    layer: BootLayer,
    slot: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl ReadySignal {
    fn channel(layer: BootLayer) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let signal = Self {
            layer,
            slot: Arc::new(Mutex::new(Some(tx))),
        };
        (signal, rx)
    }

    /// Layer this signal belongs to.
    pub fn layer(&self) -> BootLayer {
        self.layer
    }

    /// Report the layer as created. Returns `false` if already fired.
    pub fn fire(&self) -> bool {
        let sender = match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        match sender {
            Some(tx) => {
                // Receiver may be gone if boot already timed out
                let delivered = tx.send(()).is_ok();
                debug!(layer = %self.layer, delivered, "ready signal fired");
                delivered
            }
            None => {
                debug!(layer = %self.layer, "duplicate ready signal ignored");
                false
            }
        }
    }
}

/// A layer started during boot.
pub trait SceneLayer {
    /// Begin initialization. Call `created.fire()` once done, now or later.
    fn launch(&mut self, ctx: &SessionContext, created: ReadySignal);

    /// Move the layer behind the others. Presentation only.
    fn send_to_back(&mut self) {}
}

/// Two readiness flags and their conjunction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadinessBarrier {
    ui_ready: bool,
    menu_ready: bool,
}

impl ReadinessBarrier {
    /// Mark a layer ready. Returns `true` only the first time.
    pub fn mark(&mut self, layer: BootLayer) -> bool {
        let flag = match layer {
            BootLayer::Ui => &mut self.ui_ready,
            BootLayer::Menu => &mut self.menu_ready,
        };
        let first = !*flag;
        *flag = true;
        first
    }

    /// Whether a given layer has reported.
    pub fn is_ready(&self, layer: BootLayer) -> bool {
        match layer {
            BootLayer::Ui => self.ui_ready,
            BootLayer::Menu => self.menu_ready,
        }
    }

    /// Both layers have reported.
    pub fn all_ready(&self) -> bool {
        self.ui_ready && self.menu_ready
    }
}

/// Timing of a completed boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootReport {
    /// Time from boot start to the UI signal.
    pub ui_ready_after: Duration,
    /// Time from boot start to the menu signal.
    pub menu_ready_after: Duration,
}

/// Sequences the boot layers.
///
/// Consumed by [`launch`](Self::launch); nothing of it survives the boot phase.
#[derive(Debug)]
pub struct SceneReadinessCoordinator {
    timeout: Duration,
    barrier: ReadinessBarrier,
}

impl SceneReadinessCoordinator {
    /// Create a coordinator with a per-layer timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            barrier: ReadinessBarrier::default(),
        }
    }

    /// Launch the UI, then the menu, and wait for both.
    #[instrument(skip_all, fields(timeout_ms = self.timeout.as_millis() as u64))]
    pub async fn launch(
        mut self,
        ctx: &SessionContext,
        ui: &mut dyn SceneLayer,
        menu: &mut dyn SceneLayer,
    ) -> Result<BootReport, BootError> {
        let started = Instant::now();

        self.launch_layer(BootLayer::Ui, ctx, ui).await?;
        let ui_ready_after = started.elapsed();

        self.launch_layer(BootLayer::Menu, ctx, menu).await?;
        let menu_ready_after = started.elapsed();

        debug_assert!(self.barrier.all_ready());
        info!(
            ui_ms = ui_ready_after.as_millis() as u64,
            menu_ms = menu_ready_after.as_millis() as u64,
            "all layers ready; boot phase stopped"
        );

        Ok(BootReport {
            ui_ready_after,
            menu_ready_after,
        })
    }

    async fn launch_layer(
        &mut self,
        layer: BootLayer,
        ctx: &SessionContext,
        scene: &mut dyn SceneLayer,
    ) -> Result<(), BootError> {
        let (signal, created) = ReadySignal::channel(layer);

        info!(%layer, "launching layer");
        scene.launch(ctx, signal);
        if layer == BootLayer::Menu {
            scene.send_to_back();
        }

        match tokio::time::timeout(self.timeout, created).await {
            Ok(Ok(())) => {
                self.barrier.mark(layer);
                info!(%layer, "layer ready");
                Ok(())
            }
            Ok(Err(_)) => {
                warn!(%layer, "layer dropped its ready signal");
                Err(BootError::LayerAbandoned { layer })
            }
            Err(_) => {
                warn!(%layer, waited_ms = self.timeout.as_millis() as u64, "layer readiness timed out");
                Err(BootError::ReadinessTimeout {
                    layer,
                    waited: self.timeout,
                })
            }
        }
    }
}
