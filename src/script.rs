//! Running user hooks through the shell.

use crate::event::DeviceId;
use std::io;
use std::process::{Command, ExitStatus};

/// Environment variable carrying the id of the device that triggered a hook.
pub const DEVICE_ID_VAR: &str = "XINPUTID";

/// Synchronous execution of an external command.
pub trait CommandRunner {
    /// Run `command` with `env` added to the inherited environment and wait
    /// for it to exit.
    fn run(&mut self, command: &str, env: &[(&str, String)]) -> io::Result<ExitStatus>;
}

/// Runs commands with `/bin/sh -c`.
///
/// The caller blocks until the child exits. There is no timeout: a hook
/// that never returns stalls every later hotplug reaction.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::with_shell("/bin/sh")
    }

    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for ShellRunner {
    fn run(&mut self, command: &str, env: &[(&str, String)]) -> io::Result<ExitStatus> {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c").arg(command);
        for (key, value) in env {
            cmd.env(key, value);
        }
        cmd.status()
    }
}

/// Run a hook for `device_id` and log the outcome.
///
/// Failures are reported as warnings and otherwise ignored; hooks are not retried.
pub fn run_hook<R: CommandRunner + ?Sized>(
    runner: &mut R,
    command: &str,
    device_id: DeviceId,
) -> Option<ExitStatus> {
    log::info!("Running '{}' for device={}", command, device_id);
    let env = [(DEVICE_ID_VAR, device_id.to_string())];
    match runner.run(command, &env) {
        Ok(status) => {
            if !status.success() {
                match status.code() {
                    Some(code) => {
                        log::warn!("Command '{}' failed with exit code {}", command, code)
                    }
                    None => log::warn!("Command '{}' terminated by signal ({})", command, status),
                }
            }
            Some(status)
        }
        Err(e) => {
            log::warn!("Failed to run command '{}': {}", command, e);
            None
        }
    }
}
