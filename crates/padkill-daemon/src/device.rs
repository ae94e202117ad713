//! Controller enumeration and button state

use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use evdev::{AttributeSetRef, Device, Key};
use padkill_config::buttons;

/// Information about an input device
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: PathBuf,
    pub name: String,
    pub vendor: u16,
    pub product: u16,
}

impl DeviceInfo {
    /// Get vendor:product string (e.g., "045e:028e")
    pub fn vendor_product(&self) -> String {
        format!("{:04x}:{:04x}", self.vendor, self.product)
    }
}

/// A device that can report which of its buttons are down right now.
///
/// Button indices are dense (`0..button_count()`) and stable for the
/// lifetime of the device handle.
pub trait ButtonDevice {
    fn name(&self) -> &str;

    fn button_count(&self) -> usize;

    /// Indices of the buttons currently pressed.
    fn pressed_buttons(&mut self) -> io::Result<BTreeSet<usize>>;
}

/// A game controller opened through evdev.
///
/// The device is opened read-only and not grabbed, so other applications
/// (the game being watched) keep receiving its events. The file handle is
/// closed when this value is dropped.
pub struct GamepadDevice {
    device: Device,
    info: DeviceInfo,
    /// Button codes in index order
    buttons: Vec<Key>,
}

impl GamepadDevice {
    fn new(path: PathBuf, device: Device) -> Self {
        let name = device.name().unwrap_or("Unknown").to_string();
        let id = device.input_id();
        let buttons = device
            .supported_keys()
            .map(|keys| button_codes(keys.iter()))
            .unwrap_or_default();

        Self {
            info: DeviceInfo {
                path,
                name,
                vendor: id.vendor(),
                product: id.product(),
            },
            device,
            buttons,
        }
    }
}

impl ButtonDevice for GamepadDevice {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn button_count(&self) -> usize {
        self.buttons.len()
    }

    fn pressed_buttons(&mut self) -> io::Result<BTreeSet<usize>> {
        let state = self.device.get_key_state()?;
        Ok(pressed_indices(&self.buttons, &state))
    }
}

/// Button keys a device supports, in button index order.
fn button_codes(keys: impl Iterator<Item = Key>) -> Vec<Key> {
    buttons::button_codes(keys.map(|key| key.code()))
        .into_iter()
        .map(Key::new)
        .collect()
}

/// Map a key state bitmap to button indices.
fn pressed_indices(buttons: &[Key], state: &AttributeSetRef<Key>) -> BTreeSet<usize> {
    buttons
        .iter()
        .enumerate()
        .filter(|(_, key)| state.contains(**key))
        .map(|(index, _)| index)
        .collect()
}

/// Check if a device is a gamepad or joystick
fn is_controller(device: &Device) -> bool {
    device
        .supported_keys()
        .map(|keys| buttons::is_controller_codes(keys.iter().map(|key| key.code())))
        .unwrap_or(false)
}

/// Open every connected controller.
///
/// Devices are ordered by their `/dev/input/eventN` number; the position in
/// the returned list is the controller index. Nodes that cannot be opened
/// (usually permissions) are skipped.
pub fn enumerate_controllers() -> Result<Vec<GamepadDevice>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir("/dev/input")
        .context("Failed to read /dev/input")?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| buttons::event_number(path).is_some())
        .collect();
    paths.sort_by_key(|path| buttons::event_number(path));

    let mut controllers = Vec::new();

    for path in paths {
        match Device::open(&path) {
            Ok(device) => {
                if !is_controller(&device) {
                    continue;
                }
                let controller = GamepadDevice::new(path, device);
                tracing::info!(
                    "Joy{}: name='{}', buttons={} ({}, {})",
                    controllers.len(),
                    controller.info.name,
                    controller.button_count(),
                    controller.info.vendor_product(),
                    controller.info.path.display()
                );
                controllers.push(controller);
            }
            Err(e) => {
                tracing::debug!("Could not open {}: {}", path.display(), e);
            }
        }
    }

    tracing::info!("Detected {} controller(s)", controllers.len());

    Ok(controllers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use evdev::AttributeSet;

    #[test]
    fn test_button_codes_skip_keyboard_keys() {
        let keys = vec![Key::BTN_EAST, Key::KEY_A, Key::BTN_SOUTH, Key::KEY_ENTER, Key::BTN_START];
        let buttons = button_codes(keys.into_iter());
        assert_eq!(buttons, vec![Key::BTN_SOUTH, Key::BTN_EAST, Key::BTN_START]);
    }

    #[test]
    fn test_pressed_indices() {
        let buttons = vec![Key::BTN_SOUTH, Key::BTN_EAST, Key::BTN_START];
        let mut state = AttributeSet::<Key>::new();
        state.insert(Key::BTN_START);
        state.insert(Key::BTN_SOUTH);
        // Not one of the device's buttons
        state.insert(Key::KEY_A);

        assert_eq!(pressed_indices(&buttons, &state), BTreeSet::from([0, 2]));
    }

    #[test]
    fn test_shared_codes_match_evdev_keys() {
        assert_eq!(buttons::BTN_SOUTH, Key::BTN_SOUTH.code());
        assert_eq!(buttons::BTN_TRIGGER, Key::BTN_TRIGGER.code());
        assert_eq!(buttons::FIRST_BUTTON_CODE, Key::BTN_0.code());
    }

    #[test]
    fn test_vendor_product_format() {
        let info = DeviceInfo {
            path: PathBuf::from("/dev/input/event3"),
            name: "Xbox 360 Controller".to_string(),
            vendor: 0x045e,
            product: 0x028e,
        };
        assert_eq!(info.vendor_product(), "045e:028e");
    }
}
