//! Controller and button numbering
//!
//! `ButtonInput { device, button }` in a config file refers to these numbers,
//! so the daemon and the CLI both go through this module. Codes are raw
//! Linux input event codes.

use std::path::Path;

/// First code in the button range (`BTN_MISC`). Everything below is a
/// keyboard key.
pub const FIRST_BUTTON_CODE: u16 = 0x100;

/// `BTN_TRIGGER`, the first joystick button.
pub const BTN_TRIGGER: u16 = 0x120;

/// `BTN_SOUTH` (a.k.a. `BTN_A`), the first gamepad button.
pub const BTN_SOUTH: u16 = 0x130;

/// Button codes in index order: codes in the button range, ascending.
///
/// The position in the returned list is the button index.
pub fn button_codes(codes: impl IntoIterator<Item = u16>) -> Vec<u16> {
    let mut buttons: Vec<u16> = codes
        .into_iter()
        .filter(|code| *code >= FIRST_BUTTON_CODE)
        .collect();
    buttons.sort_unstable();
    buttons.dedup();
    buttons
}

/// Whether a device supporting `codes` counts as a game controller.
pub fn is_controller_codes(codes: impl IntoIterator<Item = u16>) -> bool {
    codes
        .into_iter()
        .any(|code| code == BTN_SOUTH || code == BTN_TRIGGER)
}

/// Numeric suffix of an `eventN` node. Controllers are numbered in this
/// order.
pub fn event_number(path: &Path) -> Option<u32> {
    path.file_name()?
        .to_str()?
        .strip_prefix("event")?
        .parse()
        .ok()
}
