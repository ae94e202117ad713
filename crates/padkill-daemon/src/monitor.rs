//! Monitor loop
//!
//! Drives the [`HoldTracker`] at a fixed poll rate and dispatches fired
//! triggers to the action. The loop only stops when the shutdown channel
//! flips to `true` (or its sender goes away). Shutdown is observed between
//! ticks, so an action that is already running always completes.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, Instant, MissedTickBehavior};

use crate::action::ActionInvoker;
use crate::hold_tracker::HoldTracker;
use crate::snapshot::InputSnapshotSource;

pub struct MonitorLoop<S, A> {
    source: S,
    tracker: HoldTracker,
    action: A,
    poll_interval: Duration,
}

impl<S, A> MonitorLoop<S, A>
where
    S: InputSnapshotSource,
    A: ActionInvoker,
{
    pub fn new(source: S, tracker: HoldTracker, action: A, poll_interval: Duration) -> Self {
        Self {
            source,
            tracker,
            action,
            poll_interval,
        }
    }

    /// Sample, track and dispatch once. Returns the number of triggers fired.
    pub fn tick(&mut self, now: std::time::Instant) -> usize {
        let pressed = self.source.poll();
        let events = self.tracker.update(now, &pressed);

        for event in &events {
            // Blocks this tick until the action is done
            self.action.on_trigger(event);
        }

        events.len()
    }

    /// Run until shutdown is requested. Returns the total number of triggers
    /// fired.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> u64 {
        tracing::info!(
            "Monitoring {} trigger(s): hold {:.1}s, cooldown {:.1}s, polling every {:.1}ms",
            self.tracker.len(),
            self.tracker.hold().as_secs_f64(),
            self.tracker.cooldown().as_secs_f64(),
            self.poll_interval.as_secs_f64() * 1000.0
        );
        if self.tracker.is_empty() {
            tracing::warn!("No trigger buttons configured; monitoring will never fire");
        }
        tracing::info!("Press Ctrl+C to exit.");

        let mut ticker = interval(self.poll_interval);
        // An action can take longer than a tick; don't burst afterwards
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut fired = 0u64;

        while !*shutdown.borrow() {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        tracing::debug!("Shutdown sender dropped, stopping monitor");
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            fired += self.tick(Instant::now().into_std()) as u64;
        }

        fired
    }
}
