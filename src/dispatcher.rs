//! Turns hierarchy notifications into repeat-rate updates and hook runs.

use crate::config::Config;
use crate::event::{
    DeviceId, DeviceTransition, DeviceUse, HierarchyNotification, Transition, CORE_KEYBOARD,
};
use crate::script::{run_hook, CommandRunner};
use anyhow::Result;

/// Applies a key repeat delay and interval (both in ms) to a device.
pub trait RepeatRateSetter {
    fn set_repeat_rate(&mut self, device_id: DeviceId, delay: u32, interval: u32);
}

/// Blocking source of hierarchy notifications.
pub trait NotificationSource {
    /// Wait for the next notification. `Ok(None)` means the source is closed.
    fn next_notification(&mut self) -> Result<Option<HierarchyNotification>>;
}

/// Reacts to keyboard hotplug using a fixed configuration.
///
/// Processing is strictly sequential: each notification, including any hook
/// it triggers, is handled to completion before the next one is read.
pub struct Dispatcher<'a, S, R> {
    config: &'a Config,
    repeat: S,
    runner: R,
}

impl<'a, S: RepeatRateSetter, R: CommandRunner> Dispatcher<'a, S, R> {
    pub fn new(config: &'a Config, repeat: S, runner: R) -> Self {
        Self {
            config,
            repeat,
            runner,
        }
    }

    /// Apply the configured rate to the core keyboard.
    pub fn apply_core_keyboard(&mut self) {
        log::info!("Setting repeat rate on core keyboard");
        self.apply_repeat_rate(CORE_KEYBOARD);
    }

    /// Handle notifications until `source` is closed.
    pub fn run<N: NotificationSource>(&mut self, mut source: N) -> Result<()> {
        log::info!("Processing events...");
        while let Some(notification) = source.next_notification()? {
            self.handle(&notification);
        }
        log::info!("Notification source closed");
        Ok(())
    }

    /// Handle a single notification.
    pub fn handle(&mut self, notification: &HierarchyNotification) {
        for event in notification.transitions() {
            if event.use_class == DeviceUse::SlaveKeyboard {
                self.dispatch(event);
            }
        }
    }

    fn dispatch(&mut self, event: DeviceTransition) {
        match event.transition {
            Transition::Enabled => self.on_enabled(event.device_id),
            Transition::Disabled => self.on_disabled(event.device_id),
        }
    }

    fn on_enabled(&mut self, device_id: DeviceId) {
        log::info!("Keyboard enabled: device={}", device_id);
        self.apply_repeat_rate(device_id);
        let command = &self.config.keyboard.on_connect;
        if !command.is_empty() {
            run_hook(&mut self.runner, command.as_str(), device_id);
        }
    }

    fn on_disabled(&mut self, device_id: DeviceId) {
        log::info!("Keyboard disabled: device={}", device_id);
        let command = &self.config.keyboard.on_disconnect;
        if !command.is_empty() {
            run_hook(&mut self.runner, command.as_str(), device_id);
        }
    }

    fn apply_repeat_rate(&mut self, device_id: DeviceId) {
        let kb = &self.config.keyboard;
        log::debug!(
            "Setting repeat rate on device={}: delay={} interval={}",
            device_id,
            kb.delay,
            kb.interval
        );
        self.repeat.set_repeat_rate(device_id, kb.delay, kb.interval);
    }
}
