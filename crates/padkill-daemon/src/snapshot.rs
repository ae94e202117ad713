//! Per-tick pressed-button snapshots
//!
//! [`InputSnapshotSource`] is what the setup phase and the monitor loop poll
//! once per tick. [`DeviceSnapshotSource`] composes any number of
//! [`ButtonDevice`]s into one snapshot keyed by [`ButtonInput`], where the
//! device index is the device's position in the source.

use std::collections::HashSet;

use padkill_config::ButtonInput;

use crate::device::ButtonDevice;

/// Supplies the set of buttons pressed right now across all devices.
///
/// Must return quickly; it is called on every poll tick.
pub trait InputSnapshotSource {
    fn poll(&mut self) -> HashSet<ButtonInput>;
}

/// Snapshot source backed by a fixed list of devices.
///
/// A device that fails to report its state contributes no presses for that
/// tick. Failures are logged once per failure streak rather than every tick.
pub struct DeviceSnapshotSource<D: ButtonDevice> {
    devices: Vec<D>,
    failing: Vec<bool>,
}

impl<D: ButtonDevice> DeviceSnapshotSource<D> {
    pub fn new(devices: Vec<D>) -> Self {
        let failing = vec![false; devices.len()];
        Self { devices, failing }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl<D: ButtonDevice> InputSnapshotSource for DeviceSnapshotSource<D> {
    fn poll(&mut self) -> HashSet<ButtonInput> {
        let mut pressed = HashSet::new();

        for (index, device) in self.devices.iter_mut().enumerate() {
            match device.pressed_buttons() {
                Ok(buttons) => {
                    if self.failing[index] {
                        self.failing[index] = false;
                        tracing::info!("Joy{} ('{}') is readable again", index, device.name());
                    }
                    pressed.extend(buttons.into_iter().map(|button| ButtonInput::new(index, button)));
                }
                Err(e) => {
                    if !self.failing[index] {
                        self.failing[index] = true;
                        tracing::warn!(
                            "Failed to read button state from Joy{} ('{}'): {}",
                            index,
                            device.name(),
                            e
                        );
                    }
                }
            }
        }

        pressed
    }
}

impl<D: ButtonDevice> Drop for DeviceSnapshotSource<D> {
    fn drop(&mut self) {
        if !self.devices.is_empty() {
            tracing::info!("Released {} controller(s)", self.devices.len());
        }
    }
}
