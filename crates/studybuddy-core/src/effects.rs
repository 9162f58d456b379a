//! Side effects requested by the tracker.
//!
//! The tracker only produces [`Effect`] tokens. Turning them into sound or
//! on-screen prompts is the job of a [`Notifier`], called by the scheduler
//! after a tick or command has been fully applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::plan::{Student, StudentId};
use crate::storage::SoundType;

/// Every sound the core asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// A break ran out.
    PlayAlertSound {
        sound: SoundType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        custom_data: Option<String>,
    },
    /// A study period ended.
    PlayDing,
}

/// Receives effects and prompts. Fire-and-forget: the core never reads
/// anything back beyond logging a failure.
pub trait Notifier: Send {
    /// Play the sound for `effect`.
    fn notify(&mut self, effect: &Effect) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Surface the break-over prompt for `student`.
    fn prompt_break_over(
        &mut self,
        _student: &Student,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(()) // default no-op
    }

    /// Dismiss a prompt that is no longer pending.
    fn dismiss_prompt(&mut self, _student_id: &StudentId) {}
}

/// Drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&mut self, _effect: &Effect) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// One thing a [`RecordingNotifier`] saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum Dispatched {
    Effect { effect: Effect, at: DateTime<Utc> },
    Prompt { student_id: StudentId, at: DateTime<Utc> },
    Dismissed { student_id: StudentId, at: DateTime<Utc> },
}

/// Keeps a shared log of everything it is handed. Clones share the log,
/// so one clone can go to the scheduler while another is inspected.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    log: Arc<Mutex<Vec<Dispatched>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Dispatched> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Only the effects, in dispatch order.
    pub fn effects(&self) -> Vec<Effect> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Dispatched::Effect { effect, .. } => Some(effect),
                _ => None,
            })
            .collect()
    }

    /// Students prompted, in order.
    pub fn prompts(&self) -> Vec<StudentId> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                Dispatched::Prompt { student_id, .. } => Some(student_id),
                _ => None,
            })
            .collect()
    }

    fn push(&self, record: Dispatched) {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).push(record);
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, effect: &Effect) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.push(Dispatched::Effect {
            effect: effect.clone(),
            at: Utc::now(),
        });
        Ok(())
    }

    fn prompt_break_over(
        &mut self,
        student: &Student,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.push(Dispatched::Prompt {
            student_id: student.id.clone(),
            at: Utc::now(),
        });
        Ok(())
    }

    fn dismiss_prompt(&mut self, student_id: &StudentId) {
        self.push(Dispatched::Dismissed {
            student_id: student_id.clone(),
            at: Utc::now(),
        });
    }
}
