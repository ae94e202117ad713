//! Interactive trigger selection
//!
//! When the config has no `trigger` block (or `--select` is given), the daemon
//! asks the user to press the buttons they want to watch. Every button seen
//! pressed is added to the selection until ENTER is pressed in the console.
//!
//! The console read blocks, so it runs on its own thread. The only thing it
//! shares with the polling loop is a one-shot "done" signal.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use padkill_config::ButtonInput;
use tokio::sync::oneshot;
use tokio::time::{interval, MissedTickBehavior};

use crate::snapshot::InputSnapshotSource;

/// Buttons chosen so far.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Selection {
    chosen: BTreeSet<ButtonInput>,
}

impl Selection {
    /// Add every pressed button not already chosen.
    ///
    /// Returns the newly added buttons in order.
    pub fn observe(&mut self, pressed: &HashSet<ButtonInput>) -> Vec<ButtonInput> {
        let mut added: Vec<ButtonInput> = pressed
            .iter()
            .filter(|button| !self.chosen.contains(button))
            .copied()
            .collect();
        added.sort();
        self.chosen.extend(added.iter().copied());
        added
    }

    pub fn is_empty(&self) -> bool {
        self.chosen.is_empty()
    }

    pub fn into_buttons(self) -> BTreeSet<ButtonInput> {
        self.chosen
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.chosen.is_empty() {
            return f.write_str("(none)");
        }
        let names: Vec<String> = self.chosen.iter().map(|b| b.to_string()).collect();
        f.write_str(&names.join(", "))
    }
}

/// Start waiting for ENTER on stdin.
///
/// The returned future completes once a line has been read. If stdin is
/// closed or unreadable it never completes; the user can still leave with
/// Ctrl+C.
pub fn spawn_enter_listener() -> Result<impl Future<Output = ()>> {
    let (done_tx, done_rx) = oneshot::channel::<()>();

    // A plain thread rather than `spawn_blocking`: a read that never returns
    // must not hold up runtime shutdown.
    std::thread::Builder::new()
        .name("padkill-stdin".to_string())
        .spawn(move || {
            let mut line = String::new();
            match std::io::stdin().read_line(&mut line) {
                Ok(0) => {
                    tracing::warn!("stdin is closed; finish selection with Ctrl+C");
                }
                Ok(_) => {
                    let _ = done_tx.send(());
                }
                Err(e) => {
                    tracing::warn!("Could not read stdin: {}", e);
                }
            }
        })
        .context("Failed to start stdin listener thread")?;

    Ok(async move {
        if done_rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    })
}

/// Poll `source` every `poll_interval`, collecting pressed buttons until
/// `done` completes.
pub async fn select_buttons<S, F>(
    source: &mut S,
    poll_interval: Duration,
    done: F,
) -> BTreeSet<ButtonInput>
where
    S: InputSnapshotSource,
    F: Future<Output = ()>,
{
    tracing::info!("Press any buttons on any controller to add them to the trigger set.");
    tracing::info!("Press ENTER in this console when you're done selecting.");

    let mut selection = Selection::default();
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(done);

    loop {
        tokio::select! {
            biased;
            _ = &mut done => break,
            _ = ticker.tick() => {}
        }

        let added = selection.observe(&source.poll());
        if !added.is_empty() {
            for button in &added {
                tracing::info!("Added: {}", button);
            }
            tracing::info!("Current selection: {}", selection);
        }
    }

    if selection.is_empty() {
        tracing::warn!("No buttons selected. Monitoring will never trigger.");
    } else {
        tracing::info!("Final selection: {}", selection);
    }

    selection.into_buttons()
}
