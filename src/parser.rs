//! Line-oriented parser for the `[section]` / `key = value` config format.
//!
//! ```text
//! # comment
//! [keyboard]
//! delay = 200
//! rate = 25
//! on_connect = notify-send "keyboard $XINPUTID connected"
//! ```
//!
//! Each physical line is first stripped of its comment and then classified
//! into a [`Line`]. Parsing stops at the first bad line; a partially built
//! config is never returned.

use crate::config::{rate_to_interval, Config, HookCommand};
use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Knobs for [`parse_config`].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Home directory used to expand a leading `~` in command values.
    /// `None` leaves commands untouched.
    pub home: Option<PathBuf>,
}

impl ParseOptions {
    /// Options that expand `~` to the current user's home directory.
    pub fn with_home_expansion() -> Self {
        Self {
            home: dirs::home_dir(),
        }
    }
}

/// Section the parser is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    /// Before the first section header.
    None,
    Keyboard,
}

impl ConfigSection {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "keyboard" => Some(ConfigSection::Keyboard),
            _ => None,
        }
    }
}

/// Shape of a single comment-stripped config line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    Blank,
    SectionHeader(&'a str),
    KeyValue { key: &'a str, value: &'a str },
    Malformed,
}

/// Remove everything from the first unescaped `#` on. `\#` yields a literal `#`.
///
/// `\#` is the only escape. A backslash that must end up right before a
/// comment marker cannot be written: `foo\\#c` reads as `foo\#c`.
pub fn strip_comment(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'#') => {
                out.push('#');
                chars.next();
            }
            '#' => break,
            _ => out.push(c),
        }
    }
    out
}

fn is_bracket(c: char) -> bool {
    c == '[' || c == ']'
}

/// Classify a line that has already been through [`strip_comment`].
pub fn classify(line: &str) -> Line<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }

    if let Some(inner) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        let name = inner.trim();
        if name.is_empty() || name.contains(is_bracket) {
            return Line::Malformed;
        }
        return Line::SectionHeader(name);
    }

    if let Some((key, value)) = trimmed.split_once('=') {
        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) || key.contains(is_bracket) {
            return Line::Malformed;
        }
        return Line::KeyValue {
            key,
            value: value.trim(),
        };
    }

    Line::Malformed
}

/// Position of the line being parsed, for error reporting.
struct Location<'a> {
    line: usize,
    text: &'a str,
}

impl Location<'_> {
    fn unknown_section(&self, name: &str) -> ConfigError {
        ConfigError::UnknownSection {
            line: self.line,
            text: self.text.to_string(),
            name: name.to_string(),
        }
    }

    fn unknown_key(&self, key: &str) -> ConfigError {
        ConfigError::UnknownKey {
            line: self.line,
            text: self.text.to_string(),
            key: key.to_string(),
        }
    }

    fn outside_section(&self) -> ConfigError {
        ConfigError::EntryOutsideSection {
            line: self.line,
            text: self.text.to_string(),
        }
    }

    fn malformed(&self) -> ConfigError {
        ConfigError::MalformedLine {
            line: self.line,
            text: self.text.to_string(),
        }
    }

    fn bad_integer(&self, key: &str, value: &str, reason: &'static str) -> ConfigError {
        ConfigError::BadIntegerValue {
            line: self.line,
            text: self.text.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            reason,
        }
    }

    fn parse_u32(&self, key: &str, value: &str) -> Result<u32, ConfigError> {
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(self.bad_integer(key, value, "expected an unsigned integer"));
        }
        value
            .parse()
            .map_err(|_| self.bad_integer(key, value, "number too large"))
    }

    fn command(&self, value: &str, options: &ParseOptions) -> Result<HookCommand, ConfigError> {
        HookCommand::new(&expand_home(value, options.home.as_deref()))
            .map_err(|_| self.malformed())
    }
}

/// Replace a leading `~` (alone or followed by `/`) with `home`.
fn expand_home(value: &str, home: Option<&Path>) -> String {
    match home {
        Some(home) if value == "~" || value.starts_with("~/") => {
            format!("{}{}", home.display(), &value[1..])
        }
        _ => value.to_string(),
    }
}

fn apply_keyboard_entry(
    config: &mut Config,
    key: &str,
    value: &str,
    loc: &Location<'_>,
    options: &ParseOptions,
) -> Result<(), ConfigError> {
    let kb = &mut config.keyboard;
    match key {
        "delay" => kb.delay = loc.parse_u32(key, value)?,
        "interval" => kb.interval = loc.parse_u32(key, value)?,
        "rate" => {
            let rate = loc.parse_u32(key, value)?;
            if rate == 0 {
                return Err(loc.bad_integer(key, value, "rate must be at least 1"));
            }
            // X wants the interval in ms, `rate` is repeats per second
            kb.interval = rate_to_interval(rate);
        }
        "on_connect" | "on_enable" => {
            kb.on_connect = loc.command(value, options)?;
        }
        "on_disconnect" | "on_disable" => {
            kb.on_disconnect = loc.command(value, options)?;
        }
        _ => return Err(loc.unknown_key(key)),
    }
    Ok(())
}

/// Parse config text into a validated [`Config`].
///
/// Unspecified settings keep their defaults. Later assignments to the same
/// setting win, and `rate` and `interval` both assign the repeat interval.
pub fn parse_config(text: &str, options: &ParseOptions) -> Result<Config, ConfigError> {
    let mut config = Config::default();
    let mut section = ConfigSection::None;

    for (idx, raw) in text.lines().enumerate() {
        let loc = Location {
            line: idx + 1,
            text: raw,
        };
        let stripped = strip_comment(raw);

        match classify(&stripped) {
            Line::Blank => {}
            Line::SectionHeader(name) => {
                section = ConfigSection::from_name(name).ok_or_else(|| loc.unknown_section(name))?;
            }
            Line::KeyValue { key, value } => match section {
                ConfigSection::None => return Err(loc.outside_section()),
                ConfigSection::Keyboard => {
                    apply_keyboard_entry(&mut config, key, value, &loc, options)?;
                }
            },
            Line::Malformed => return Err(loc.malformed()),
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Config, ConfigError> {
        parse_config(text, &ParseOptions::default())
    }

    #[test]
    fn test_strip_comment() {
        assert_eq!(strip_comment("delay = 5 # five"), "delay = 5 ");
        assert_eq!(strip_comment("# whole line"), "");
        assert_eq!(strip_comment("no comment"), "no comment");
        assert_eq!(strip_comment(r"echo \#1 # tail"), "echo #1 ");
        assert_eq!(strip_comment(r"a \b"), r"a \b");
        assert_eq!(strip_comment(r"foo\\#c"), r"foo\#c");
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(""), Line::Blank);
        assert_eq!(classify("   \t"), Line::Blank);
        assert_eq!(classify("[keyboard]"), Line::SectionHeader("keyboard"));
        assert_eq!(classify("  [ keyboard ]  "), Line::SectionHeader("keyboard"));
        assert_eq!(
            classify("delay=5"),
            Line::KeyValue {
                key: "delay",
                value: "5"
            }
        );
        assert_eq!(
            classify("on_connect = env A=b cmd --flag"),
            Line::KeyValue {
                key: "on_connect",
                value: "env A=b cmd --flag"
            }
        );
        assert_eq!(classify("[]"), Line::Malformed);
        assert_eq!(classify("[key]board]"), Line::Malformed);
        assert_eq!(classify("= 5"), Line::Malformed);
        assert_eq!(classify("two words = 5"), Line::Malformed);
        assert_eq!(classify("delay 5"), Line::Malformed);
    }

    #[test]
    fn test_parse_empty_is_default() {
        assert_eq!(parse("").unwrap(), Config::default());
        assert_eq!(parse("\n  \n# only comments\n").unwrap(), Config::default());
        assert_eq!(parse("[keyboard]\n").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_full() {
        let text = "\
# repeat settings
[keyboard]
delay = 250   # ms
rate = 25
on_connect = notify-send \"keyboard $XINPUTID\"
on_disconnect = logger gone
";
        let config = parse(text).unwrap();
        assert_eq!(config.keyboard.delay, 250);
        assert_eq!(config.keyboard.interval, 40);
        assert_eq!(config.keyboard.on_connect, "notify-send \"keyboard $XINPUTID\"");
        assert_eq!(config.keyboard.on_disconnect, "logger gone");
    }

    #[test]
    fn test_rate_derives_rounded_interval() {
        for (rate, interval) in [(1, 1000), (3, 333), (6, 167), (25, 40), (30, 33), (400, 3)] {
            let config = parse(&format!("[keyboard]\nrate = {}\n", rate)).unwrap();
            assert_eq!(config.keyboard.interval, interval, "rate {}", rate);
            assert_eq!(config.keyboard.delay, 200);
        }
    }

    #[test]
    fn test_delay_taken_unchanged() {
        for delay in [0, 1, 200, 660, u32::MAX] {
            let config = parse(&format!("[keyboard]\ndelay = {}\n", delay)).unwrap();
            assert_eq!(config.keyboard.delay, delay);
            assert_eq!(config.keyboard.interval, 20);
        }
    }

    #[test]
    fn test_last_write_wins() {
        let config = parse("[keyboard]\nrate = 25\ninterval = 15\ndelay = 1\ndelay = 2\n").unwrap();
        assert_eq!(config.keyboard.interval, 15);
        assert_eq!(config.keyboard.delay, 2);

        let config = parse("[keyboard]\ninterval = 15\nrate = 50\n").unwrap();
        assert_eq!(config.keyboard.interval, 20);
    }

    #[test]
    fn test_entry_outside_section() {
        let err = parse("\n# header missing\ndelay = 200\n[keyboard]\n").unwrap_err();
        match err {
            ConfigError::EntryOutsideSection { line, text } => {
                assert_eq!(line, 3);
                assert_eq!(text, "delay = 200");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_section() {
        let err = parse("[keyboard]\n[bogus]\n").unwrap_err();
        match &err {
            ConfigError::UnknownSection { line, name, .. } => {
                assert_eq!(*line, 2);
                assert_eq!(name, "bogus");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn test_unknown_key() {
        let err = parse("[keyboard]\nspeed = 9\n").unwrap_err();
        match err {
            ConfigError::UnknownKey { line, key, .. } => {
                assert_eq!(line, 2);
                assert_eq!(key, "speed");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_malformed_line_reports_original_text() {
        let err = parse("[keyboard]\ndelay 200 # oops\n").unwrap_err();
        match err {
            ConfigError::MalformedLine { line, text } => {
                assert_eq!(line, 2);
                assert_eq!(text, "delay 200 # oops");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_bad_integer_values() {
        for value in ["", "abc", "-5", "+5", "1.5", "10 20", "99999999999"] {
            let err = parse(&format!("[keyboard]\ndelay = {}\n", value)).unwrap_err();
            assert!(
                matches!(err, ConfigError::BadIntegerValue { line: 2, .. }),
                "value {:?} gave {:?}",
                value,
                err
            );
        }
    }

    #[test]
    fn test_zero_rate_rejected() {
        let err = parse("[keyboard]\nrate = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::BadIntegerValue { line: 2, .. }));
    }

    #[test]
    fn test_error_stops_before_later_lines() {
        // the bad second line must fail even though line 3 is fine
        let err = parse("[keyboard]\nwhat\ndelay = 5\n").unwrap_err();
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_command_aliases_and_empty_value() {
        let config = parse("[keyboard]\non_enable = a\non_disable = b\n").unwrap();
        assert_eq!(config.keyboard.on_connect, "a");
        assert_eq!(config.keyboard.on_disconnect, "b");

        let config = parse("[keyboard]\non_connect = a\non_connect =\n").unwrap();
        assert!(config.keyboard.on_connect.is_empty());
    }

    #[test]
    fn test_command_keeps_hash_when_escaped() {
        let config = parse("[keyboard]\non_connect = echo \\#1 # comment\n").unwrap();
        assert_eq!(config.keyboard.on_connect, "echo #1");
    }

    #[test]
    fn test_carriage_return_in_command_rejected() {
        let err = parse("[keyboard]\non_connect = a\rb\n").unwrap_err();
        assert!(matches!(err, ConfigError::MalformedLine { line: 2, .. }));
    }

    #[test]
    fn test_home_expansion() {
        let options = ParseOptions {
            home: Some(PathBuf::from("/home/kb")),
        };
        let text = "[keyboard]\non_connect = ~/bin/kbd-up --now\non_disconnect = ~other/x\n";
        let config = parse_config(text, &options).unwrap();
        assert_eq!(config.keyboard.on_connect, "/home/kb/bin/kbd-up --now");
        assert_eq!(config.keyboard.on_disconnect, "~other/x");

        let config = parse(text).unwrap();
        assert_eq!(config.keyboard.on_connect, "~/bin/kbd-up --now");
    }

    #[test]
    fn test_expand_home_alone() {
        assert_eq!(expand_home("~", Some(Path::new("/h"))), "/h");
        assert_eq!(expand_home("x ~/y", Some(Path::new("/h"))), "x ~/y");
        assert_eq!(expand_home("~/y", None), "~/y");
    }
}
