mod engine;
mod state;

pub use engine::{finish_early, next_session, start_break, tick, toggle_run, EarlyFinish, Expiry};
pub use state::{format_clock, TimerMode, TimerPhase, TimerState};
