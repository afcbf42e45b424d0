use std::fs;
use std::path::Path;

use crate::cmd::{self, shell_quote};
use crate::error::DeployResult;

/// A machine the deployment steps run against.
///
/// Every command is a POSIX shell snippet. [`LocalHost`] runs it on
/// this machine (the usual case: the tool runs on the server it
/// provisions); [`SshSession`](crate::ssh::SshSession) runs it on a
/// remote server.
pub trait Host {
    /// Human-readable target, used in log lines.
    fn describe(&self) -> String;

    /// Execute a shell snippet and capture its trimmed stdout.
    fn exec(&self, command: &str) -> DeployResult<String>;

    /// Execute a shell snippet with output streamed to the terminal.
    fn exec_interactive(&self, command: &str) -> DeployResult<()>;

    /// Write `content` to `path`, replacing any existing file.
    fn write_file(&self, content: &str, path: &str) -> DeployResult<()>;

    /// Read a file, returning `None` when it does not exist.
    fn read_file(&self, path: &str) -> DeployResult<Option<String>> {
        let quoted = shell_quote(path);
        if self.exec(&format!("test -f {quoted}")).is_err() {
            return Ok(None);
        }
        self.exec(&format!("cat {quoted}")).map(Some)
    }

    fn file_exists(&self, path: &str) -> bool {
        self.exec(&format!("test -e {}", shell_quote(path))).is_ok()
    }

    fn command_exists(&self, program: &str) -> bool {
        self.exec(&format!("command -v {}", shell_quote(program)))
            .is_ok()
    }
}

/// The machine this process runs on.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalHost;

impl LocalHost {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Host for LocalHost {
    fn describe(&self) -> String {
        "localhost".to_string()
    }

    fn exec(&self, command: &str) -> DeployResult<String> {
        cmd::run_shell(command)
    }

    fn exec_interactive(&self, command: &str) -> DeployResult<()> {
        cmd::run_shell_interactive(command)
    }

    fn write_file(&self, content: &str, path: &str) -> DeployResult<()> {
        fs::write(path, content)?;
        Ok(())
    }

    fn read_file(&self, path: &str) -> DeployResult<Option<String>> {
        if !Path::new(path).is_file() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn file_exists(&self, path: &str) -> bool {
        Path::new(path).exists()
    }
}
