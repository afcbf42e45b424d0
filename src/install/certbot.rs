use tracing::info;

use crate::cmd::shell_quote;
use crate::error::DeployResult;
use crate::host::Host;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertStatus {
    Existing,
    Issued,
}

/// Let's Encrypt certificate for the deployment domain, issued
/// through the Nginx plugin.
#[derive(Debug, Clone)]
pub struct Certbot {
    pub domain: String,
    pub email: Option<String>,
}

impl Certbot {
    #[must_use]
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            email: None,
        }
    }

    #[must_use]
    pub fn email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    #[must_use]
    pub fn live_dir(&self) -> String {
        format!("/etc/letsencrypt/live/{}", self.domain)
    }

    #[must_use]
    pub fn has_certificate(&self, host: &dyn Host) -> bool {
        host.file_exists(&format!("{}/fullchain.pem", self.live_dir()))
    }

    #[must_use]
    pub fn issue_command(&self) -> String {
        let account = self.email.as_ref().map_or_else(
            || "--register-unsafely-without-email".to_string(),
            |e| format!("-m {}", shell_quote(e)),
        );
        format!(
            "certbot certonly --nginx -d {} --non-interactive --agree-tos {account}",
            shell_quote(&self.domain)
        )
    }

    /// Issue a certificate unless one already exists, then make
    /// sure renewal is scheduled and Nginx picks it up.
    pub fn ensure(&self, host: &dyn Host) -> DeployResult<CertStatus> {
        if self.has_certificate(host) {
            info!("✓ certificate for {} already present", self.domain);
            return Ok(CertStatus::Existing);
        }

        info!("Requesting certificate for {}...", self.domain);
        host.exec_interactive(&self.issue_command())?;
        host.exec("systemctl enable --now certbot.timer")?;
        host.exec("systemctl reload nginx")?;
        info!("✓ certificate issued for {}", self.domain);
        Ok(CertStatus::Issued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_without_email() {
        let cmd = Certbot::new("vc.example.com").issue_command();

        assert!(cmd.contains("-d 'vc.example.com'"));
        assert!(cmd.contains("--register-unsafely-without-email"));
    }

    #[test]
    fn issue_with_email() {
        let cmd = Certbot::new("vc.example.com")
            .email("ops@example.com")
            .issue_command();

        assert!(cmd.ends_with("-m 'ops@example.com'"));
        assert!(!cmd.contains("unsafely"));
    }
}
