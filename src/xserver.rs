//! X11 implementation using Xlib, XInput2 and XKB.

use crate::dispatcher::{NotificationSource, RepeatRateSetter};
use crate::error::DisplayError;
use crate::event::{DeviceId, DeviceRecord, DeviceUse, HierarchyNotification, Transitions};
use anyhow::Result;
use libc::{c_char, c_int, c_uchar};
use std::ffi::CStr;
use std::ptr::{self, NonNull};
use std::{mem, slice};
use x11::{xinput2, xlib};

const XINPUT_EXTENSION: &[u8] = b"XInputExtension\0";

/// Decode the hierarchy flag bits into enable/disable transitions.
pub fn decode_flags(flags: c_int) -> Transitions {
    Transitions {
        enabled: flags & xinput2::XIDeviceEnabled != 0,
        disabled: flags & xinput2::XIDeviceDisabled != 0,
    }
}

/// Decode an XI device use into our classification.
pub fn decode_use(device_use: c_int) -> DeviceUse {
    if device_use == xinput2::XISlaveKeyboard {
        DeviceUse::SlaveKeyboard
    } else {
        DeviceUse::Other
    }
}

/// Decode the per-device part of an `XIHierarchyEvent`.
pub fn decode_hierarchy(flags: c_int, infos: &[xinput2::XIHierarchyInfo]) -> HierarchyNotification {
    let devices = infos
        .iter()
        .filter_map(|info| match DeviceId::try_from(info.deviceid) {
            Ok(device_id) => Some(DeviceRecord {
                device_id,
                use_class: decode_use(info._use),
                transitions: decode_flags(info.flags),
            }),
            Err(_) => {
                log::debug!("Ignoring invalid device id {}", info.deviceid);
                None
            }
        })
        .collect();

    HierarchyNotification {
        flags: decode_flags(flags),
        devices,
    }
}

/// Decode a raw hierarchy event.
///
/// # Safety
///
/// `info` must point to `num_info` valid records, as delivered by `XGetEventData`.
unsafe fn decode_event(event: &xinput2::XIHierarchyEvent) -> HierarchyNotification {
    let infos: &[xinput2::XIHierarchyInfo] = if event.info.is_null() || event.num_info <= 0 {
        &[]
    } else {
        slice::from_raw_parts(event.info, event.num_info as usize)
    };
    decode_hierarchy(event.flags, infos)
}

/// Owned connection to the X server. Closed on drop.
pub struct XDisplay {
    display: NonNull<xlib::Display>,
    xi_opcode: c_int,
}

impl XDisplay {
    /// Connect to the display named by `$DISPLAY` and check for XInput2.
    pub fn open() -> Result<Self, DisplayError> {
        log::info!("Connecting to X...");
        // SAFETY: a null name selects $DISPLAY
        let raw = unsafe { xlib::XOpenDisplay(ptr::null()) };
        let Some(display) = NonNull::new(raw) else {
            // SAFETY: XDisplayName returns a pointer to a static string
            let name = unsafe { CStr::from_ptr(xlib::XDisplayName(ptr::null())) };
            return Err(DisplayError::OpenDisplay(format!("'{}'", name.to_string_lossy())));
        };

        let mut display = Self {
            display,
            xi_opcode: 0,
        };
        display.xi_opcode = display.query_xinput()?;
        Ok(display)
    }

    fn raw(&self) -> *mut xlib::Display {
        self.display.as_ptr()
    }

    fn query_xinput(&self) -> Result<c_int, DisplayError> {
        let (mut opcode, mut first_event, mut first_error) = (0, 0, 0);
        // SAFETY: display is open, out-pointers are valid
        let present = unsafe {
            xlib::XQueryExtension(
                self.raw(),
                XINPUT_EXTENSION.as_ptr() as *const c_char,
                &mut opcode,
                &mut first_event,
                &mut first_error,
            )
        };
        if present == 0 {
            return Err(DisplayError::MissingExtension("XInput"));
        }

        let (mut major, mut minor) = (2, 0);
        // SAFETY: display is open, out-pointers are valid
        let status = unsafe { xinput2::XIQueryVersion(self.raw(), &mut major, &mut minor) };
        if status != 0 {
            return Err(DisplayError::UnsupportedVersion { major, minor });
        }
        log::debug!("XInput {}.{} available, opcode={}", major, minor, opcode);
        Ok(opcode)
    }

    /// Ask for hierarchy change events from all devices on the root window.
    pub fn select_hierarchy_events(&self) {
        let event = xinput2::XI_HierarchyChanged;
        let mut mask_bits: Vec<c_uchar> = vec![0; ((event >> 3) + 1) as usize];
        mask_bits[(event >> 3) as usize] |= 1 << (event & 7);

        let mut mask = xinput2::XIEventMask {
            deviceid: xinput2::XIAllDevices,
            mask_len: mask_bits.len() as c_int,
            mask: mask_bits.as_mut_ptr(),
        };
        // SAFETY: display is open, mask points to mask_len bytes that outlive the call
        unsafe {
            let root = xlib::XDefaultRootWindow(self.raw());
            xinput2::XISelectEvents(self.raw(), root, &mut mask, 1);
            xlib::XFlush(self.raw());
        }
    }

    /// Block until the next hierarchy change event arrives.
    pub fn wait_hierarchy_event(&self) -> HierarchyNotification {
        loop {
            // SAFETY: XEvent is plain data, all-zero is a valid value
            let mut event: xlib::XEvent = unsafe { mem::zeroed() };
            // SAFETY: display is open, event is a valid out-pointer
            unsafe { xlib::XNextEvent(self.raw(), &mut event) };

            if event.get_type() != xlib::GenericEvent {
                continue;
            }

            // SAFETY: GenericEvent events carry a cookie; data is only read
            // after XGetEventData succeeded and is freed before the next loop.
            unsafe {
                let cookie: *mut xlib::XGenericEventCookie = &mut event.generic_event_cookie;
                if (*cookie).extension != self.xi_opcode
                    || (*cookie).evtype != xinput2::XI_HierarchyChanged
                {
                    continue;
                }
                if xlib::XGetEventData(self.raw(), cookie) == 0 {
                    continue;
                }
                let notification =
                    decode_event(&*((*cookie).data as *const xinput2::XIHierarchyEvent));
                xlib::XFreeEventData(self.raw(), cookie);
                return notification;
            }
        }
    }

    /// Set the XKB repeat delay and interval on a device.
    pub fn set_auto_repeat_rate(&self, device_id: DeviceId, delay: u32, interval: u32) {
        // SAFETY: display is open
        let ok = unsafe {
            let ok = xlib::XkbSetAutoRepeatRate(self.raw(), device_id, delay, interval);
            xlib::XFlush(self.raw());
            ok
        };
        if ok == 0 {
            log::warn!("Failed to set repeat rate on device={}", device_id);
        }
    }
}

impl Drop for XDisplay {
    fn drop(&mut self) {
        // SAFETY: we own the connection and nothing uses it after drop
        unsafe { xlib::XCloseDisplay(self.raw()) };
    }
}

impl RepeatRateSetter for &XDisplay {
    fn set_repeat_rate(&mut self, device_id: DeviceId, delay: u32, interval: u32) {
        self.set_auto_repeat_rate(device_id, delay, interval);
    }
}

impl NotificationSource for &XDisplay {
    fn next_notification(&mut self) -> Result<Option<HierarchyNotification>> {
        // Xlib terminates the process on a lost connection, so this never ends
        Ok(Some(self.wait_hierarchy_event()))
    }
}
