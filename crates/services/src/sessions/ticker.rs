//! Tick sources for the session clock.
//!
//! The countdown never reads wall time. Something has to call it on a fixed
//! cadence, and that something is injected so tests can drive it by hand.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

/// Stream of ticks produced by a [`Scheduler`].
#[derive(Debug)]
pub struct Ticks {
    rx: mpsc::UnboundedReceiver<()>,
}

impl Ticks {
    #[must_use]
    pub fn new(rx: mpsc::UnboundedReceiver<()>) -> Self {
        Self { rx }
    }

    /// Wait for the next tick. `None` once the source is gone or stopped.
    pub async fn next(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    /// Stop receiving; the producer notices and shuts down.
    pub fn stop(&mut self) {
        self.rx.close();
    }
}

/// Capability to emit ticks at a fixed period.
pub trait Scheduler: Send + Sync {
    fn start(&self, period: Duration) -> Ticks;
}

//
// ─── TOKIO ─────────────────────────────────────────────────────────────────────
//

/// Real-time ticks from a tokio interval. The first tick arrives one full
/// period after `start`.
///
/// Must be started from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn start(&self, period: Duration) -> Ticks {
        let period = period.max(Duration::from_millis(1));
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if tx.send(()).is_err() {
                            break;
                        }
                    }
                    () = tx.closed() => break,
                }
            }
        });
        Ticks::new(rx)
    }
}

//
// ─── MANUAL ────────────────────────────────────────────────────────────────────
//

/// Ticks fired explicitly with [`fire`](Self::fire). The period is ignored.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    senders: Arc<Mutex<Vec<mpsc::UnboundedSender<()>>>>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `count` ticks on every live tick stream. Returns how many streams
    /// received them.
    pub fn fire(&self, count: usize) -> usize {
        let Ok(mut senders) = self.senders.lock() else {
            return 0;
        };
        senders.retain(|tx| !tx.is_closed());
        for tx in senders.iter() {
            for _ in 0..count {
                if tx.send(()).is_err() {
                    break;
                }
            }
        }
        senders.len()
    }

    /// Number of tick streams still being consumed.
    #[must_use]
    pub fn active(&self) -> usize {
        self.senders
            .lock()
            .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }
}

impl Scheduler for ManualScheduler {
    fn start(&self, _period: Duration) -> Ticks {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut senders) = self.senders.lock() {
            senders.push(tx);
        }
        Ticks::new(rx)
    }
}
