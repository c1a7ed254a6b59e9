//! Typed view of input device hierarchy changes.
//!
//! The display backend decodes raw hierarchy events into these types once,
//! so the dispatcher never has to look at protocol bitmasks.

/// Input device identifier as assigned by the X server.
pub type DeviceId = u32;

/// Pseudo device id addressing the core (virtual master) keyboard.
pub const CORE_KEYBOARD: DeviceId = 0x0100;

/// How a device is used in the input hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceUse {
    /// A keyboard attached to a master keyboard.
    SlaveKeyboard,
    /// Master devices, pointers and floating slaves.
    Other,
}

/// A device state change we react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Enabled,
    Disabled,
}

/// Set of transitions reported for a device or a whole notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transitions {
    pub enabled: bool,
    pub disabled: bool,
}

impl Transitions {
    pub const NONE: Transitions = Transitions {
        enabled: false,
        disabled: false,
    };
    pub const ENABLED: Transitions = Transitions {
        enabled: true,
        disabled: false,
    };
    pub const DISABLED: Transitions = Transitions {
        enabled: false,
        disabled: true,
    };

    /// True if neither transition is present.
    pub fn is_empty(&self) -> bool {
        !self.enabled && !self.disabled
    }

    /// The contained transitions, `Enabled` before `Disabled`.
    pub fn iter(&self) -> impl Iterator<Item = Transition> {
        let enabled = self.enabled.then_some(Transition::Enabled);
        let disabled = self.disabled.then_some(Transition::Disabled);
        enabled.into_iter().chain(disabled)
    }
}

/// One per-device entry of a hierarchy notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceRecord {
    pub device_id: DeviceId,
    pub use_class: DeviceUse,
    pub transitions: Transitions,
}

/// A decoded "hierarchy changed" notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyNotification {
    /// Union of the changes reported by this notification.
    pub flags: Transitions,
    pub devices: Vec<DeviceRecord>,
}

/// A single device transition, consumed immediately by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceTransition {
    pub device_id: DeviceId,
    pub use_class: DeviceUse,
    pub transition: Transition,
}

impl HierarchyNotification {
    /// All device transitions carried by this notification, in record order.
    ///
    /// Yields nothing when the notification-level flags contain neither
    /// enable nor disable.
    pub fn transitions(&self) -> impl Iterator<Item = DeviceTransition> + '_ {
        let devices: &[DeviceRecord] = if self.flags.is_empty() {
            &[]
        } else {
            &self.devices
        };
        devices.iter().flat_map(|record| {
            record.transitions.iter().map(move |transition| DeviceTransition {
                device_id: record.device_id,
                use_class: record.use_class,
                transition,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(device_id: DeviceId, use_class: DeviceUse, transitions: Transitions) -> DeviceRecord {
        DeviceRecord {
            device_id,
            use_class,
            transitions,
        }
    }

    #[test]
    fn test_transitions_order() {
        let both = Transitions {
            enabled: true,
            disabled: true,
        };
        let order: Vec<_> = both.iter().collect();
        assert_eq!(order, vec![Transition::Enabled, Transition::Disabled]);
        assert_eq!(Transitions::NONE.iter().count(), 0);
        assert!(Transitions::NONE.is_empty());
        assert!(!Transitions::DISABLED.is_empty());
    }

    #[test]
    fn test_notification_without_flags_yields_nothing() {
        let notification = HierarchyNotification {
            flags: Transitions::NONE,
            devices: vec![record(7, DeviceUse::SlaveKeyboard, Transitions::ENABLED)],
        };
        assert_eq!(notification.transitions().count(), 0);
    }

    #[test]
    fn test_notification_transitions_in_record_order() {
        let notification = HierarchyNotification {
            flags: Transitions {
                enabled: true,
                disabled: true,
            },
            devices: vec![
                record(9, DeviceUse::SlaveKeyboard, Transitions::DISABLED),
                record(3, DeviceUse::Other, Transitions::ENABLED),
                record(7, DeviceUse::SlaveKeyboard, Transitions::NONE),
            ],
        };
        let events: Vec<_> = notification.transitions().collect();
        assert_eq!(
            events,
            vec![
                DeviceTransition {
                    device_id: 9,
                    use_class: DeviceUse::SlaveKeyboard,
                    transition: Transition::Disabled,
                },
                DeviceTransition {
                    device_id: 3,
                    use_class: DeviceUse::Other,
                    transition: Transition::Enabled,
                },
            ]
        );
    }
}
