//! # StudyBuddy Core Library
//!
//! This library provides the core logic for the StudyBuddy study/break
//! tracker: several students, each working through a fixed number of
//! study→break cycles on their own clock, all driven by one shared tick.
//!
//! ## Architecture
//!
//! - **Timer**: pure per-student transitions. No clock, no I/O
//! - **Tracker**: the arena of every student's timer plus the session
//!   controller commands (toggle, start break, finish early, acknowledge)
//! - **Scheduler**: a single tokio task that serializes ticks and commands
//!   and hands effects to a notifier
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`Tracker`]: state of the tracking phase
//! - [`Scheduler`]: the tick loop
//! - [`Notifier`]: seam for sound and prompt output
//! - [`Config`]: session parameters

pub mod effects;
pub mod error;
pub mod plan;
pub mod scheduler;
pub mod storage;
pub mod timer;
pub mod tracker;

pub use effects::{Dispatched, Effect, Notifier, RecordingNotifier, SilentNotifier};
pub use error::{ConfigError, CoreError, ValidationError};
pub use plan::{PlanEntry, SessionPlan, Student, StudentId, StudySession};
pub use scheduler::{
    Command, Commander, IntervalTicker, ManualTicker, PhaseEnd, PhaseOutcome, Scheduler,
    TickSender, Ticker, TrackingHandle,
};
pub use storage::{Config, SoundType};
pub use timer::{EarlyFinish, Expiry, TimerMode, TimerPhase, TimerState};
pub use tracker::{CommandOutcome, StudentStatus, TickOutcome, Tracker, Transition};
