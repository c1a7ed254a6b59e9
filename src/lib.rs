//! Automatically configure X11 keyboards as they are plugged in.
//!
//! Whenever a keyboard is enabled on the X server, its key repeat delay and
//! interval are set from the config file, and an optional hook command is
//! run. Another hook runs when a keyboard goes away.
//!
//! # Config file
//!
//! `~/.config/xautocfg.cfg` unless another path is given:
//!
//! ```text
//! [keyboard]
//! delay = 200          # ms before a held key repeats
//! rate = 25            # repeats per second (or `interval = 40` in ms)
//! on_connect = ~/bin/keyboard-setup
//! on_disconnect = notify-send "keyboard $XINPUTID gone"
//! ```
//!
//! Hooks run through `/bin/sh -c` with `XINPUTID` set to the X input device id.
//!
//! # Example
//!
//! ```no_run
//! use xautocfg::{Config, Dispatcher, ShellRunner, XDisplay};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::parse("[keyboard]\nrate = 30\n")?;
//!
//!     let display = XDisplay::open()?;
//!     display.select_hierarchy_events();
//!
//!     let mut dispatcher = Dispatcher::new(&config, &display, ShellRunner::new());
//!     dispatcher.apply_core_keyboard();
//!     dispatcher.run(&display)
//! }
//! ```

mod config;
mod dispatcher;
mod error;
mod event;
mod parser;
mod script;

#[cfg(unix)]
mod xserver;

pub use config::{
    default_path, load, rate_to_interval, Config, ConfigSource, HookCommand, KeyboardConfig, Loaded,
    DEFAULT_DELAY, DEFAULT_INTERVAL,
};
pub use dispatcher::{Dispatcher, NotificationSource, RepeatRateSetter};
pub use error::{ConfigError, DisplayError, InvalidCommand};
pub use event::{
    DeviceId, DeviceRecord, DeviceTransition, DeviceUse, HierarchyNotification, Transition,
    Transitions, CORE_KEYBOARD,
};
pub use parser::{classify, parse_config, strip_comment, ConfigSection, Line, ParseOptions};
pub use script::{run_hook, CommandRunner, ShellRunner, DEVICE_ID_VAR};

#[cfg(unix)]
pub use xserver::XDisplay;
