//! Error types surfaced by config loading and the display backend.

use std::path::PathBuf;
use thiserror::Error;

/// A failure to turn a config source into a [`Config`](crate::Config).
///
/// Every syntax variant carries the 1-based line number and the line text
/// as it appeared in the file, so the caller can report it verbatim.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown section name '{name}' in line {line}:\n{text}")]
    UnknownSection {
        line: usize,
        text: String,
        name: String,
    },

    #[error("unknown key '{key}' in line {line}:\n{text}")]
    UnknownKey {
        line: usize,
        text: String,
        key: String,
    },

    #[error("not in a config section in line {line}:\n{text}")]
    EntryOutsideSection { line: usize, text: String },

    #[error("invalid syntax in line {line}:\n{text}")]
    MalformedLine { line: usize, text: String },

    #[error("invalid value '{value}' for '{key}' in line {line} ({reason}):\n{text}")]
    BadIntegerValue {
        line: usize,
        text: String,
        key: String,
        value: String,
        reason: &'static str,
    },

    #[error("failed to open config file '{}'", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Line number the error refers to, if it came from the parser.
    pub fn line(&self) -> Option<usize> {
        match self {
            ConfigError::UnknownSection { line, .. }
            | ConfigError::UnknownKey { line, .. }
            | ConfigError::EntryOutsideSection { line, .. }
            | ConfigError::MalformedLine { line, .. }
            | ConfigError::BadIntegerValue { line, .. } => Some(*line),
            ConfigError::Unreadable { .. } => None,
        }
    }
}

/// A hook command that cannot be written as a single config line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("command must fit on a single line: {0:?}")]
pub struct InvalidCommand(pub String);

/// Failures while setting up the X server connection.
#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("failed to open X display {0}")]
    OpenDisplay(String),

    #[error("no {0} extension on the X server")]
    MissingExtension(&'static str),

    #[error("X server supports XInput {major}.{minor}, need at least 2.0")]
    UnsupportedVersion { major: i32, minor: i32 },
}
