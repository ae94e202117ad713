//! Hold detection
//!
//! # Hold State Machine
//!
//! Every trigger in the [`TriggerSet`] gets its own [`HoldState`]. The tracker
//! is fed one snapshot of pressed buttons per poll tick and moves each trigger
//! through the following lifecycle independently:
//!
//! ```text
//!  ┌──────────┐   pressed    ┌──────────┐  elapsed >= hold   ┌──────────┐
//!  │ RELEASED │ ───────────► │ HOLDING  │ ─────────────────► │ LATCHED  │
//!  └──────────┘              └──────────┘  and not cooling   └──────────┘
//!       ▲                         │          (emit event)          │
//!       │        not pressed      │                                │
//!       └─────────────────────────┴────────────────────────────────┘
//! ```
//!
//! ## Rules
//!
//! - A hold starts on the first tick the trigger is seen pressed and ends on
//!   the first tick it is not. There is no grace period.
//! - The threshold check is inclusive: a hold of exactly `hold` fires.
//! - A latched hold never fires again, even if the cooldown runs out while
//!   the trigger is still held. Release and press again to re-arm.
//! - The cooldown starts when a trigger fires and survives release. A quick
//!   release/re-press can cross the threshold again but stays suppressed
//!   until the cooldown has passed.

use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};

use padkill_config::ButtonInput;

use crate::trigger::{Trigger, TriggerEvent, TriggerSet};

/// Granularity of the "still holding" progress log.
const PROGRESS_STEP: Duration = Duration::from_millis(250);

/// Per-trigger bookkeeping.
#[derive(Debug, Clone, Default)]
struct HoldState {
    /// When the current unbroken hold began
    press_since: Option<Instant>,
    /// When this trigger last fired; the cooldown runs from here
    last_fired_at: Option<Instant>,
    /// Latch: the current hold has already fired
    fired_this_hold: bool,
    /// Last progress step reported for the current hold
    progress_step: u128,
    /// Cooldown suppression already reported for the current hold
    cooldown_reported: bool,
}

impl HoldState {
    fn start_hold(&mut self, now: Instant) {
        self.press_since = Some(now);
        self.fired_this_hold = false;
        self.progress_step = 0;
        self.cooldown_reported = false;
    }

    /// Remaining cooldown at `now`, or `None` when a new trigger is allowed.
    fn cooldown_remaining(&self, now: Instant, cooldown: Duration) -> Option<Duration> {
        let since_fired = now.saturating_duration_since(self.last_fired_at?);
        cooldown.checked_sub(since_fired).filter(|left| !left.is_zero())
    }
}

/// Converts a stream of pressed-button snapshots into [`TriggerEvent`]s.
///
/// The tracker owns all hold state and has a single caller (the monitor
/// loop), so it needs no locking.
#[derive(Debug)]
pub struct HoldTracker {
    hold: Duration,
    cooldown: Duration,
    states: BTreeMap<Trigger, HoldState>,
}

impl HoldTracker {
    /// Create a tracker with fresh state for every trigger in `triggers`.
    pub fn new(triggers: &TriggerSet, hold: Duration, cooldown: Duration) -> Self {
        let states = triggers
            .iter()
            .map(|trigger| (trigger.clone(), HoldState::default()))
            .collect();

        Self {
            hold,
            cooldown,
            states,
        }
    }

    pub fn hold(&self) -> Duration {
        self.hold
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Number of tracked triggers.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Whether `trigger` is currently inside an unbroken hold.
    #[cfg(test)]
    pub fn is_holding(&self, trigger: &Trigger) -> bool {
        self.states
            .get(trigger)
            .map(|state| state.press_since.is_some())
            .unwrap_or(false)
    }

    /// Advance every trigger by one tick.
    ///
    /// `now` must not go backwards between calls. Returns the triggers that
    /// fired on this tick, in trigger order.
    pub fn update(&mut self, now: Instant, pressed: &HashSet<ButtonInput>) -> Vec<TriggerEvent> {
        let mut events = Vec::new();

        for (trigger, state) in self.states.iter_mut() {
            if !trigger.is_pressed(pressed) {
                if state.press_since.take().is_some() {
                    state.fired_this_hold = false;
                    tracing::info!("{} released, hold reset", trigger);
                }
                continue;
            }

            let since = match state.press_since {
                Some(since) => since,
                None => {
                    state.start_hold(now);
                    tracing::info!("{} pressed, starting hold timer", trigger);
                    now
                }
            };

            if state.fired_this_hold {
                continue;
            }

            let elapsed = now.saturating_duration_since(since);

            if elapsed < self.hold {
                let step = elapsed.as_millis() / PROGRESS_STEP.as_millis();
                if step > state.progress_step {
                    state.progress_step = step;
                    tracing::info!(
                        "{} holding... {:.2}/{:.2}s",
                        trigger,
                        elapsed.as_secs_f64(),
                        self.hold.as_secs_f64()
                    );
                }
                continue;
            }

            if let Some(remaining) = state.cooldown_remaining(now, self.cooldown) {
                if !state.cooldown_reported {
                    state.cooldown_reported = true;
                    tracing::debug!(
                        "{} held for {:.2}s but cooling down for another {:.2}s",
                        trigger,
                        elapsed.as_secs_f64(),
                        remaining.as_secs_f64()
                    );
                }
                continue;
            }

            tracing::info!(
                "{} held for {:.2}s (>= {:.2}s), triggering action",
                trigger,
                elapsed.as_secs_f64(),
                self.hold.as_secs_f64()
            );

            state.fired_this_hold = true;
            state.last_fired_at = Some(now);
            events.push(TriggerEvent {
                trigger: trigger.clone(),
                held: elapsed,
            });
        }

        events
    }
}
