use serde::{Deserialize, Serialize};

use crate::storage::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    Study,
    Break,
}

/// Where a student's timer stands, as the dashboard would show it.
///
/// Derived from [`TimerState`] plus the break-over prompt flag; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerPhase {
    Studying,
    StudyPaused,
    /// Study time is up; waiting for "start break".
    AwaitingBreak,
    OnBreak,
    BreakPaused,
    /// Break time is up; waiting for the prompt to be acknowledged.
    BreakOver,
    Finished,
}

/// One student's countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub mode: TimerMode,
    pub seconds_left: u32,
    pub is_running: bool,
    pub current_session_index: usize,
    /// Terminal: all sessions done.
    pub is_session_finished: bool,
}

impl TimerState {
    /// State every student enters the tracking phase with: first study
    /// session, full clock, already running.
    pub fn initial(config: &Config) -> Self {
        Self {
            mode: TimerMode::Study,
            seconds_left: config.study_secs(),
            is_running: true,
            current_session_index: 0,
            is_session_finished: false,
        }
    }

    /// Study clock ran out and the break has not started.
    ///
    /// The running flag is ignored: toggling here does not leave the state,
    /// so "start break" is still accepted afterwards.
    pub fn is_awaiting_break(&self) -> bool {
        self.mode == TimerMode::Study && self.seconds_left == 0 && !self.is_session_finished
    }

    /// Break clock ran out and nothing has moved the student on yet.
    pub fn is_break_expired(&self) -> bool {
        self.mode == TimerMode::Break && self.seconds_left == 0 && !self.is_session_finished
    }

    pub fn phase(&self) -> TimerPhase {
        if self.is_session_finished {
            return TimerPhase::Finished;
        }
        match (self.mode, self.seconds_left == 0, self.is_running) {
            (TimerMode::Study, true, _) => TimerPhase::AwaitingBreak,
            (TimerMode::Study, false, true) => TimerPhase::Studying,
            (TimerMode::Study, false, false) => TimerPhase::StudyPaused,
            (TimerMode::Break, true, _) => TimerPhase::BreakOver,
            (TimerMode::Break, false, true) => TimerPhase::OnBreak,
            (TimerMode::Break, false, false) => TimerPhase::BreakPaused,
        }
    }

    /// Remaining time as `MM:SS`.
    pub fn clock(&self) -> String {
        format_clock(self.seconds_left)
    }
}

pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
