//! Trigger definitions
//!
//! A [`Trigger`] is the unit the hold tracker watches. In `any` mode each
//! selected button is its own trigger; in `all` mode the whole selection is a
//! single combo trigger that is only held while every member is pressed.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::time::Duration;

use padkill_config::{ButtonInput, TriggerMode};

/// Something that can be held: one button, or several buttons together.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Trigger {
    Button(ButtonInput),
    Combo(BTreeSet<ButtonInput>),
}

impl Trigger {
    /// Whether this trigger counts as held in the given snapshot.
    pub fn is_pressed(&self, pressed: &HashSet<ButtonInput>) -> bool {
        match self {
            Trigger::Button(button) => pressed.contains(button),
            Trigger::Combo(buttons) => {
                !buttons.is_empty() && buttons.iter().all(|b| pressed.contains(b))
            }
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Button(button) => write!(f, "{}", button),
            Trigger::Combo(buttons) => {
                for (i, button) in buttons.iter().enumerate() {
                    if i > 0 {
                        f.write_str("+")?;
                    }
                    write!(f, "{}", button)?;
                }
                Ok(())
            }
        }
    }
}

/// The immutable set of triggers monitored for the lifetime of the daemon.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerSet {
    triggers: Vec<Trigger>,
}

impl TriggerSet {
    /// One independent trigger per button.
    pub fn any(buttons: impl IntoIterator<Item = ButtonInput>) -> Self {
        let unique: BTreeSet<ButtonInput> = buttons.into_iter().collect();
        Self {
            triggers: unique.into_iter().map(Trigger::Button).collect(),
        }
    }

    /// A single trigger that requires every button at once.
    ///
    /// An empty selection yields an empty set rather than a combo that could
    /// never be satisfied.
    pub fn all(buttons: impl IntoIterator<Item = ButtonInput>) -> Self {
        let unique: BTreeSet<ButtonInput> = buttons.into_iter().collect();
        let triggers = match unique.len() {
            0 => Vec::new(),
            1 => unique.into_iter().map(Trigger::Button).collect(),
            _ => vec![Trigger::Combo(unique)],
        };
        Self { triggers }
    }

    pub fn from_mode(mode: TriggerMode, buttons: impl IntoIterator<Item = ButtonInput>) -> Self {
        match mode {
            TriggerMode::Any => Self::any(buttons),
            TriggerMode::All => Self::all(buttons),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trigger> {
        self.triggers.iter()
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }
}

impl fmt::Display for TriggerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("(none)");
        }
        for (i, trigger) in self.triggers.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", trigger)?;
        }
        Ok(())
    }
}

/// Emitted once when a hold crosses the threshold outside cooldown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    pub trigger: Trigger,
    /// How long the trigger had been held when it fired
    pub held: Duration,
}
