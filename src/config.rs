//! Validated program settings and the rules for locating and loading them.

use crate::error::{ConfigError, InvalidCommand};
use crate::parser::{parse_config, ParseOptions};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Default repeat delay in milliseconds.
pub const DEFAULT_DELAY: u32 = 200;
/// Default repeat interval in milliseconds (50 repeats per second).
pub const DEFAULT_INTERVAL: u32 = 20;

/// File name of the implicit config, relative to `~/.config`.
const CONFIG_FILE_NAME: &str = "xautocfg.cfg";

/// Settings for the `[keyboard]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardConfig {
    /// Milliseconds a key is held before it starts repeating.
    pub delay: u32,
    /// Milliseconds between two repeats.
    pub interval: u32,
    /// Shell command run when a keyboard is enabled. Empty means none.
    pub on_connect: HookCommand,
    /// Shell command run when a keyboard is disabled. Empty means none.
    pub on_disconnect: HookCommand,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            interval: DEFAULT_INTERVAL,
            on_connect: HookCommand::default(),
            on_disconnect: HookCommand::default(),
        }
    }
}

/// A hook command line as it can appear in the config file.
///
/// Always trimmed and free of line breaks, so every value can be written
/// back as a single `key = value` line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookCommand(String);

impl HookCommand {
    /// Trim `command` and reject it if it spans more than one line.
    pub fn new(command: &str) -> Result<Self, InvalidCommand> {
        if command.contains(|c: char| c == '\n' || c == '\r') {
            return Err(InvalidCommand(command.to_string()));
        }
        Ok(Self(command.trim().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<&str> for HookCommand {
    type Error = InvalidCommand;

    fn try_from(command: &str) -> Result<Self, Self::Error> {
        Self::new(command)
    }
}

impl PartialEq<&str> for HookCommand {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for HookCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The complete program configuration.
///
/// Built once at startup and never mutated afterwards; the dispatcher
/// borrows it for the lifetime of the process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub keyboard: KeyboardConfig,
}

impl Config {
    /// Parse config text without home directory expansion.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        parse_config(text, &ParseOptions::default())
    }
}

/// Convert a repeats-per-second rate into a millisecond interval,
/// rounded to the nearest integer. `rate` must be non-zero.
pub fn rate_to_interval(rate: u32) -> u32 {
    (1000 + rate / 2) / rate
}

/// Renders the config in the file format accepted by the parser.
impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kb = &self.keyboard;
        writeln!(f, "[keyboard]")?;
        writeln!(f, "delay = {}", kb.delay)?;
        writeln!(f, "interval = {}", kb.interval)?;
        if !kb.on_connect.is_empty() {
            writeln!(f, "on_connect = {}", escape_comment(kb.on_connect.as_str()))?;
        }
        if !kb.on_disconnect.is_empty() {
            writeln!(f, "on_disconnect = {}", escape_comment(kb.on_disconnect.as_str()))?;
        }
        Ok(())
    }
}

fn escape_comment(value: &str) -> String {
    value.replace('#', "\\#")
}

/// Where the config file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// The derived default location. A missing file means "use defaults".
    Implicit(PathBuf),
    /// A path the user asked for. A missing file is an error.
    Explicit(PathBuf),
}

impl ConfigSource {
    pub fn path(&self) -> &Path {
        match self {
            ConfigSource::Implicit(path) | ConfigSource::Explicit(path) => path,
        }
    }
}

/// Result of [`load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loaded {
    /// The file was read and parsed.
    Parsed(Config),
    /// The implicit file could not be opened; defaults are in effect.
    Defaults(Config),
}

impl Loaded {
    pub fn into_config(self) -> Config {
        match self {
            Loaded::Parsed(config) | Loaded::Defaults(config) => config,
        }
    }
}

/// The implicit config location, `~/.config/xautocfg.cfg`.
///
/// The home directory comes from `$HOME`, falling back to the passwd entry
/// when it is unset. Returns `None` only when neither is available.
pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join(CONFIG_FILE_NAME))
}

/// Load and parse the config from `source`.
pub fn load(source: &ConfigSource, options: &ParseOptions) -> Result<Loaded, ConfigError> {
    let path = source.path();

    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            return match source {
                ConfigSource::Explicit(_) => Err(ConfigError::Unreadable {
                    path: path.to_path_buf(),
                    source: e,
                }),
                ConfigSource::Implicit(_) => {
                    log::info!(
                        "Failed to open config file '{}' ({}), using default config",
                        path.display(),
                        e
                    );
                    Ok(Loaded::Defaults(Config::default()))
                }
            };
        }
    };

    let mut text = String::new();
    file.read_to_string(&mut text)
        .map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        })?;

    log::debug!("Parsing config file '{}'", path.display());
    parse_config(&text, options).map(Loaded::Parsed)
}
