//! The tick driver.
//!
//! A [`Scheduler`] owns the [`Tracker`] for the whole tracking phase. One
//! task runs a single event loop that takes clock ticks from a [`Ticker`]
//! and controller commands from a channel, applying each to completion
//! before looking at the next. Nothing else ever touches the tracker, so no
//! update can be lost between a tick and a command.
//!
//! Effects are dispatched to the [`Notifier`] only after the tick or command
//! that produced them has been fully applied.
//!
//! ## Usage
//!
//! ```ignore
//! let handle = Scheduler::new(tracker, IntervalTicker::default(), notifier)
//!     .on_exit(|| println!("all done"))
//!     .spawn();
//! let commands = handle.commander();
//! commands.start_break("kid-0").await?;
//! let outcome = handle.finished().await?;
//! ```

mod ticker;

pub use ticker::{IntervalTicker, ManualTicker, TickSender, Ticker, TICK_PERIOD};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::effects::{Effect, Notifier};
use crate::error::{CoreError, Result};
use crate::plan::StudentId;
use crate::tracker::{CommandOutcome, StudentStatus, TickOutcome, Tracker};

const COMMAND_BUFFER: usize = 64;

/// A controller request for the scheduler loop.
#[derive(Debug)]
pub enum Command {
    ToggleRun(StudentId),
    StartBreak(StudentId),
    FinishEarly(StudentId),
    AcknowledgeBreakOver(StudentId),
    /// Reply with the current status of every student.
    Status(oneshot::Sender<Vec<StudentStatus>>),
    /// Leave the tracking phase.
    Reset,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEnd {
    AllFinished,
    Reset,
    /// The host stopped the loop (or dropped its handle).
    Stopped,
}

/// Final result of a tracking phase.
#[derive(Debug)]
pub struct PhaseOutcome {
    pub end: PhaseEnd,
    pub tracker: Tracker,
}

pub type ExitCallback = Box<dyn FnOnce() + Send>;

pub struct Scheduler<T, N> {
    tracker: Tracker,
    ticker: T,
    notifier: N,
    on_exit: Option<ExitCallback>,
}

impl<T, N> Scheduler<T, N>
where
    T: Ticker + 'static,
    N: Notifier + 'static,
{
    pub fn new(tracker: Tracker, ticker: T, notifier: N) -> Self {
        Self {
            tracker,
            ticker,
            notifier,
            on_exit: None,
        }
    }

    /// Called once, with no payload, when every student has finished or
    /// the phase is reset. Not called when the host stops the loop.
    pub fn on_exit(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_exit = Some(Box::new(callback));
        self
    }

    /// Run the loop on the current tokio runtime.
    pub fn spawn(self) -> TrackingHandle {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(rx, stop_rx));
        TrackingHandle {
            commands: Commander { tx },
            stop: stop_tx,
            task,
        }
    }

    /// The event loop. Ticks are taken before queued commands, so commands
    /// sent after queuing manual ticks see the clock already advanced.
    pub async fn run(
        self,
        mut commands: mpsc::Receiver<Command>,
        mut stop: oneshot::Receiver<()>,
    ) -> PhaseOutcome {
        let Scheduler {
            mut tracker,
            mut ticker,
            mut notifier,
            mut on_exit,
        } = self;
        let mut commands_open = true;
        let mut ticks_open = true;

        let end = loop {
            tokio::select! {
                biased;

                _ = &mut stop => break PhaseEnd::Stopped,

                alive = ticker.tick(), if ticks_open => {
                    if alive {
                        let outcome = tracker.tick();
                        dispatch_tick(&tracker, &mut notifier, &outcome);
                    } else {
                        debug!("ticker exhausted");
                        ticks_open = false;
                    }
                }

                command = commands.recv(), if commands_open => match command {
                    Some(Command::Reset) => {
                        tracker.reset();
                        break PhaseEnd::Reset;
                    }
                    Some(command) => apply_command(&mut tracker, &mut notifier, command),
                    None => commands_open = false,
                },
            }

            if tracker.all_finished() {
                break PhaseEnd::AllFinished;
            }
        };

        info!(end = ?end, "tracking phase ended");
        if end != PhaseEnd::Stopped {
            if let Some(callback) = on_exit.take() {
                callback();
            }
        }
        PhaseOutcome { end, tracker }
    }
}

fn dispatch_tick<N: Notifier>(tracker: &Tracker, notifier: &mut N, outcome: &TickOutcome) {
    dispatch_effects(notifier, &outcome.effects);
    for id in outcome.breaks_over() {
        if let Some(student) = tracker.student(id.as_str()) {
            if let Err(e) = notifier.prompt_break_over(student) {
                warn!(student = %id, error = %e, "break-over prompt failed");
            }
        }
    }
}

fn dispatch_effects<N: Notifier>(notifier: &mut N, effects: &[Effect]) {
    for effect in effects {
        if let Err(e) = notifier.notify(effect) {
            warn!(effect = ?effect, error = %e, "notifier failed");
        }
    }
}

fn apply_command<N: Notifier>(tracker: &mut Tracker, notifier: &mut N, command: Command) {
    let (id, outcome): (StudentId, CommandOutcome) = match command {
        Command::Status(reply) => {
            // Receiver may have given up waiting.
            let _ = reply.send(tracker.status());
            return;
        }
        Command::Reset => return,
        Command::ToggleRun(id) => {
            let outcome = tracker.toggle_run(id.as_str());
            (id, outcome)
        }
        Command::StartBreak(id) => {
            let outcome = tracker.start_break(id.as_str());
            (id, outcome)
        }
        Command::FinishEarly(id) => {
            let had_prompt = tracker.is_break_over_pending(id.as_str());
            let outcome = tracker.finish_early(id.as_str());
            if had_prompt && !tracker.is_break_over_pending(id.as_str()) {
                notifier.dismiss_prompt(&id);
            }
            (id, outcome)
        }
        Command::AcknowledgeBreakOver(id) => {
            let outcome = tracker.acknowledge_break_over(id.as_str());
            if outcome.applied {
                notifier.dismiss_prompt(&id);
            }
            (id, outcome)
        }
    };

    if !outcome.applied {
        debug!(student = %id, "command ignored");
    }
    dispatch_effects(notifier, &outcome.effects);
}

/// Cloneable sender for controller commands.
#[derive(Debug, Clone)]
pub struct Commander {
    tx: mpsc::Sender<Command>,
}

impl Commander {
    /// # Errors
    ///
    /// Returns [`CoreError::PhaseEnded`] if the loop has stopped.
    pub async fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).await.map_err(|_| CoreError::PhaseEnded)
    }

    pub async fn toggle_run(&self, id: impl Into<StudentId>) -> Result<()> {
        self.send(Command::ToggleRun(id.into())).await
    }

    pub async fn start_break(&self, id: impl Into<StudentId>) -> Result<()> {
        self.send(Command::StartBreak(id.into())).await
    }

    pub async fn finish_early(&self, id: impl Into<StudentId>) -> Result<()> {
        self.send(Command::FinishEarly(id.into())).await
    }

    pub async fn acknowledge_break_over(&self, id: impl Into<StudentId>) -> Result<()> {
        self.send(Command::AcknowledgeBreakOver(id.into())).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.send(Command::Reset).await
    }

    /// Round-trips through the loop, so everything sent before it has
    /// been applied when it returns.
    pub async fn status(&self) -> Result<Vec<StudentStatus>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Status(tx)).await?;
        rx.await.map_err(|_| CoreError::PhaseEnded)
    }
}

/// Owner's handle on a spawned scheduler. Dropping it stops the loop.
#[derive(Debug)]
pub struct TrackingHandle {
    commands: Commander,
    stop: oneshot::Sender<()>,
    task: JoinHandle<PhaseOutcome>,
}

impl TrackingHandle {
    pub fn commander(&self) -> Commander {
        self.commands.clone()
    }

    /// Stop the loop and collect the final tracker.
    ///
    /// # Errors
    ///
    /// Returns an error if the loop task panicked.
    pub async fn stop(self) -> Result<PhaseOutcome> {
        let TrackingHandle { stop, task, .. } = self;
        // Already-ended loops have dropped the receiver.
        let _ = stop.send(());
        task.await.map_err(|e| CoreError::Custom(e.to_string()))
    }

    /// Wait for the phase to end on its own (all finished or reset).
    ///
    /// # Errors
    ///
    /// Returns an error if the loop task panicked.
    pub async fn finished(self) -> Result<PhaseOutcome> {
        let TrackingHandle { stop: _stop, task, .. } = self;
        task.await.map_err(|e| CoreError::Custom(e.to_string()))
    }
}
