use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Length of one tick in real time.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Source of clock ticks for the scheduler.
pub trait Ticker: Send {
    /// Wait for the next tick. Resolves to `false` once no more ticks will
    /// ever come.
    fn tick(&mut self) -> impl Future<Output = bool> + Send;
}

/// Wall-clock ticks from a tokio interval.
///
/// The first tick fires one period after creation. Late ticks are delayed,
/// not bunched up.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

impl Default for IntervalTicker {
    fn default() -> Self {
        Self::new(TICK_PERIOD)
    }
}

impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Ticks on demand, for tests and replays.
#[derive(Debug)]
pub struct ManualTicker {
    rx: mpsc::UnboundedReceiver<()>,
}

/// Sending half of a [`ManualTicker`]. Dropping every clone ends the ticker.
#[derive(Debug, Clone)]
pub struct TickSender {
    tx: mpsc::UnboundedSender<()>,
}

impl ManualTicker {
    pub fn new() -> (Self, TickSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, TickSender { tx })
    }
}

impl TickSender {
    /// Queue `n` ticks. Returns `false` if the ticker is gone.
    pub fn advance(&self, n: usize) -> bool {
        (0..n).all(|_| self.tx.send(()).is_ok())
    }
}

impl Ticker for ManualTicker {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_ticker_yields_queued_ticks_then_ends() {
        let (mut ticker, sender) = ManualTicker::new();
        assert!(sender.advance(2));
        drop(sender);
        assert!(ticker.tick().await);
        assert!(ticker.tick().await);
        assert!(!ticker.tick().await);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_ticker_waits_one_period_first() {
        let start = Instant::now();
        let mut ticker = IntervalTicker::default();
        ticker.tick().await;
        assert_eq!(start.elapsed(), TICK_PERIOD);
        ticker.tick().await;
        assert_eq!(start.elapsed(), TICK_PERIOD * 2);
    }
}
