//! Pure per-student transitions.
//!
//! Nothing here touches the session plan, plays a sound or reads a clock.
//! Each function takes the current [`TimerState`] by reference and returns
//! the next one; the tracker decides what to do with the result.
//!
//! ## State Transitions
//!
//! ```text
//! Studying --tick to 0--> AwaitingBreak --start_break--> OnBreak
//! OnBreak  --tick to 0--> BreakOver --acknowledge--> Studying (next, running)
//! OnBreak/BreakOver --finish_early--> StudyPaused (next, paused)
//! last session --acknowledge | finish_early in break--> Finished
//! ```

use serde::{Deserialize, Serialize};

use super::state::{TimerMode, TimerState};
use crate::storage::Config;

/// A countdown that reached zero during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expiry {
    StudyComplete { session_index: usize },
    BreakOver { session_index: usize },
}

/// What `finish_early` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyFinish {
    /// Study cut short; the session counts as completed.
    StudyEnded { session_index: usize },
    /// Break cut short; next study session loaded, paused.
    BreakSkipped { next_session_index: usize },
    /// Break cut short on the last session.
    AllSessionsDone,
}

/// Advance one second.
///
/// A running clock above zero loses exactly one second. When the clock is
/// at zero after that (or was already at zero while running) the period
/// expires: the timer stops and the expiry is reported.
pub fn tick(state: &TimerState) -> (TimerState, Option<Expiry>) {
    if state.is_session_finished || !state.is_running {
        return (*state, None);
    }

    let mut next = *state;
    if next.seconds_left > 0 {
        next.seconds_left -= 1;
        if next.seconds_left > 0 {
            return (next, None);
        }
    }

    next.is_running = false;
    next.seconds_left = 0;
    let session_index = next.current_session_index;
    let expiry = match next.mode {
        TimerMode::Study => Expiry::StudyComplete { session_index },
        TimerMode::Break => Expiry::BreakOver { session_index },
    };
    (next, Some(expiry))
}

/// Flip running/paused. `None` once finished.
pub fn toggle_run(state: &TimerState) -> Option<TimerState> {
    if state.is_session_finished {
        return None;
    }
    Some(TimerState {
        is_running: !state.is_running,
        ..*state
    })
}

/// Start the break. Only valid while awaiting it.
pub fn start_break(state: &TimerState, config: &Config) -> Option<TimerState> {
    if !state.is_awaiting_break() {
        return None;
    }
    Some(TimerState {
        mode: TimerMode::Break,
        seconds_left: config.break_secs(),
        is_running: true,
        ..*state
    })
}

/// Cut the current period short.
pub fn finish_early(state: &TimerState, config: &Config) -> Option<(TimerState, EarlyFinish)> {
    if state.is_session_finished {
        return None;
    }
    match state.mode {
        TimerMode::Study => {
            let next = TimerState {
                seconds_left: 0,
                is_running: false,
                ..*state
            };
            Some((
                next,
                EarlyFinish::StudyEnded {
                    session_index: state.current_session_index,
                },
            ))
        }
        TimerMode::Break => {
            let next = next_session(state, config, false);
            let outcome = if next.is_session_finished {
                EarlyFinish::AllSessionsDone
            } else {
                EarlyFinish::BreakSkipped {
                    next_session_index: next.current_session_index,
                }
            };
            Some((next, outcome))
        }
    }
}

/// Move past the current break into the next study session, or finish.
///
/// `auto_start` decides whether the new study clock runs straight away.
pub fn next_session(state: &TimerState, config: &Config, auto_start: bool) -> TimerState {
    let next_index = state.current_session_index + 1;
    if next_index >= config.num_sessions as usize {
        return TimerState {
            is_running: false,
            seconds_left: 0,
            is_session_finished: true,
            ..*state
        };
    }
    TimerState {
        mode: TimerMode::Study,
        seconds_left: config.study_secs(),
        is_running: auto_start,
        current_session_index: next_index,
        is_session_finished: false,
    }
}
