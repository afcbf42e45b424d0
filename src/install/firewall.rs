use crate::cmd::shell_quote;
use crate::error::DeployResult;
use crate::host::Host;

/// UFW rules opened before the firewall is switched on.
#[derive(Debug, Clone)]
pub struct Firewall {
    pub rules: Vec<String>,
}

impl Firewall {
    /// SSH plus HTTP/HTTPS for Nginx.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: vec!["OpenSSH".to_string(), "Nginx Full".to_string()],
        }
    }

    #[must_use]
    pub fn allow(mut self, rule: &str) -> Self {
        self.rules.push(rule.to_string());
        self
    }

    /// Open every rule, then enable UFW. SSH is always allowed
    /// first so enabling cannot lock the session out.
    pub fn apply(&self, host: &dyn Host) -> DeployResult<()> {
        for rule in &self.rules {
            host.exec(&format!("ufw allow {}", shell_quote(rule)))?;
        }
        host.exec("ufw --force enable").map(|_| ())
    }
}

impl Default for Firewall {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_open_ssh_first() {
        let fw = Firewall::new().allow("3478/udp");

        assert_eq!(fw.rules, vec!["OpenSSH", "Nginx Full", "3478/udp"]);
    }
}
