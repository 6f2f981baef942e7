//! Pause Controller
//!
//! Suspends every time-driven subsystem together with the session's pause
//! flag: animation and audio collaborators plus the session's scheduled
//! events. Both directions are idempotent, and suspended time is counted once.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::core::clock::Clock;

/// A collaborator that runs on time (animations, music).
pub trait Suspendable: Send {
    /// Name for logs.
    fn label(&self) -> &str;
    /// Stop advancing.
    fn suspend(&mut self);
    /// Continue from where it stopped.
    fn resume(&mut self);
}

/// Identifier returned by [`ScheduledEvents::schedule`].
pub type TimerId = u32;

/// An event whose delay elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredEvent {
    /// Timer id.
    pub id: TimerId,
    /// Label given at scheduling time.
    pub label: String,
}

#[derive(Debug, Clone)]
struct TimedEvent {
    id: TimerId,
    label: String,
    remaining: Duration,
}

/// Delayed events driven by frame time. Nothing fires while suspended.
#[derive(Debug, Default)]
pub struct ScheduledEvents {
    events: Vec<TimedEvent>,
    next_id: TimerId,
    suspended: bool,
}

impl ScheduledEvents {
    /// Schedule `label` to fire after `delay` of unsuspended time.
    pub fn schedule(&mut self, label: impl Into<String>, delay: Duration) -> TimerId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.events.push(TimedEvent {
            id,
            label: label.into(),
            remaining: delay,
        });
        id
    }

    /// Drop a pending event. Returns `false` if it was not pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.events.len();
        self.events.retain(|e| e.id != id);
        self.events.len() != before
    }

    /// Advance by `dt` and return the events that came due, in schedule order.
    pub fn advance(&mut self, dt: Duration) -> Vec<FiredEvent> {
        if self.suspended {
            return Vec::new();
        }

        let mut fired = Vec::new();
        self.events.retain_mut(|event| {
            event.remaining = event.remaining.saturating_sub(dt);
            if event.remaining.is_zero() {
                fired.push(FiredEvent {
                    id: event.id,
                    label: event.label.clone(),
                });
                false
            } else {
                true
            }
        });
        fired
    }

    /// Number of events not yet fired.
    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// Whether time is frozen.
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    fn suspend(&mut self) {
        self.suspended = true;
    }

    fn resume(&mut self) {
        self.suspended = false;
    }
}

/// Pauses and resumes all time-driven subsystems as one.
pub struct PauseController {
    subsystems: Vec<Box<dyn Suspendable>>,
    timers: ScheduledEvents,
    clock: Arc<dyn Clock>,
    paused_since: Option<Duration>,
    total_paused: Duration,
}

impl PauseController {
    /// Create a running controller with no subsystems.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            subsystems: Vec::new(),
            timers: ScheduledEvents::default(),
            clock,
            paused_since: None,
            total_paused: Duration::ZERO,
        }
    }

    /// Register a subsystem. It is suspended immediately if paused.
    pub fn register(&mut self, mut subsystem: Box<dyn Suspendable>) {
        if self.is_paused() {
            subsystem.suspend();
        }
        self.subsystems.push(subsystem);
    }

    /// Suspend everything. No-op if already paused.
    ///
    /// Returns `true` if this call paused.
    pub fn pause(&mut self) -> bool {
        if self.paused_since.is_some() {
            debug!("pause ignored, already paused");
            return false;
        }
        self.paused_since = Some(self.clock.now());
        for subsystem in &mut self.subsystems {
            subsystem.suspend();
            debug!(subsystem = subsystem.label(), "suspended");
        }
        self.timers.suspend();
        info!(subsystems = self.subsystems.len(), "paused");
        true
    }

    /// Resume everything. No-op if running.
    ///
    /// Returns `true` if this call resumed.
    pub fn resume(&mut self) -> bool {
        let Some(since) = self.paused_since.take() else {
            debug!("resume ignored, not paused");
            return false;
        };
        self.total_paused += self.clock.now().saturating_sub(since);
        for subsystem in &mut self.subsystems {
            subsystem.resume();
            debug!(subsystem = subsystem.label(), "resumed");
        }
        self.timers.resume();
        info!(total_paused_ms = self.total_paused.as_millis() as u64, "resumed");
        true
    }

    /// Whether paused.
    pub fn is_paused(&self) -> bool {
        self.paused_since.is_some()
    }

    /// Time spent paused, including an ongoing pause.
    pub fn total_paused(&self) -> Duration {
        match self.paused_since {
            Some(since) => self.total_paused + self.clock.now().saturating_sub(since),
            None => self.total_paused,
        }
    }

    /// Scheduled events.
    pub fn timers(&self) -> &ScheduledEvents {
        &self.timers
    }

    /// Scheduled events, mutably.
    pub fn timers_mut(&mut self) -> &mut ScheduledEvents {
        &mut self.timers
    }
}
