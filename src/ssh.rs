use std::thread;
use std::time::Duration;

use tracing::info;

use crate::cmd::{self, shell_quote};
use crate::error::{DeployError, DeployResult};
use crate::host::Host;

/// SSH session wrapper for running the deployment steps on a
/// remote server instead of the local machine.
#[derive(Debug, Clone)]
pub struct SshSession {
    host: String,
    user: String,
    key: Option<String>,
}

impl SshSession {
    #[must_use]
    pub fn new(host: &str, user: &str) -> Self {
        Self {
            host: host.to_string(),
            user: user.to_string(),
            key: None,
        }
    }

    /// Parse a `user@host` target. The user defaults to `root`.
    ///
    /// ```
    /// use vcdeploy::ssh::SshSession;
    ///
    /// let s = SshSession::parse("deploy@10.0.0.5").unwrap();
    /// assert_eq!(s.destination(), "deploy@10.0.0.5");
    ///
    /// let s = SshSession::parse("vc.example.com").unwrap();
    /// assert_eq!(s.destination(), "root@vc.example.com");
    /// ```
    pub fn parse(target: &str) -> DeployResult<Self> {
        let (user, host) = match target.split_once('@') {
            Some((user, host)) => (user, host),
            None => ("root", target),
        };
        if user.is_empty() || host.is_empty() || host.contains(char::is_whitespace) {
            return Err(DeployError::InvalidInput(format!(
                "expected USER@HOST, got '{target}'"
            )));
        }
        Ok(Self::new(host, user))
    }

    #[must_use]
    pub fn with_key(mut self, key_path: &str) -> Self {
        self.key = Some(key_path.to_string());
        self
    }

    /// Wait for SSH to become available on the remote host.
    pub fn wait_for_ready(&self, max_attempts: u32, interval: Duration) -> DeployResult<()> {
        for attempt in 1..=max_attempts {
            if self.exec("echo ok").is_ok() {
                info!(host = %self.host, "SSH connected");
                return Ok(());
            }
            info!("Waiting for SSH ({attempt}/{max_attempts})... retrying");
            thread::sleep(interval);
        }

        Err(DeployError::SshFailed(format!(
            "SSH not ready after {max_attempts} attempts \
             on {}",
            self.host
        )))
    }

    #[must_use]
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = self.ssh_base_args();
        args.push(self.destination());
        args.push(command.to_string());
        args
    }

    fn ssh_base_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            "ConnectTimeout=10".to_string(),
        ];
        if let Some(key) = &self.key {
            args.push("-i".to_string());
            args.push(key.clone());
        }
        args
    }
}

impl Host for SshSession {
    fn describe(&self) -> String {
        self.destination()
    }

    /// Execute a command on the remote host and capture output.
    fn exec(&self, command: &str) -> DeployResult<String> {
        let args = self.build_ssh_args(command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run("ssh", &refs)
    }

    /// Execute a command on the remote host interactively. A TTY
    /// is requested so apt and compose progress renders properly.
    fn exec_interactive(&self, command: &str) -> DeployResult<()> {
        let mut args = vec!["-t".to_string()];
        args.extend(self.build_ssh_args(command));
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run_interactive("ssh", &refs)
    }

    /// Write content to a remote file via stdin pipe.
    fn write_file(&self, content: &str, path: &str) -> DeployResult<()> {
        let command = format!("cat > {}", shell_quote(path));
        let args = self.build_ssh_args(&command);
        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        cmd::run_with_stdin("ssh", &refs, content.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssh_args_include_key_and_command() {
        let s = SshSession::new("1.2.3.4", "root").with_key("/keys/id");

        let args = s.build_ssh_args("uptime");

        assert_eq!(args.last().map(String::as_str), Some("uptime"));
        assert!(args.contains(&"root@1.2.3.4".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "-i" && w[1] == "/keys/id"));
    }

    #[test]
    fn parse_rejects_empty_parts() {
        assert!(SshSession::parse("@host").is_err());
        assert!(SshSession::parse("user@").is_err());
        assert!(SshSession::parse("not a host").is_err());
    }
}
