use std::sync::LazyLock;

use regex::Regex;
use tracing::info;

use crate::cmd::shell_quote;
use crate::compose::{self, ComposeLayout};
use crate::error::{DeployError, DeployResult};
use crate::host::Host;
use crate::stack::Stack;

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$")
        .expect("domain pattern is valid")
});

/// Fields of `/etc/os-release` the checks care about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub id: String,
    pub version_id: String,
    pub pretty_name: String,
}

impl OsRelease {
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut release = Self::default();
        for line in content.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').trim_matches('\'').to_string();
            match key.trim() {
                "ID" => release.id = value.to_ascii_lowercase(),
                "VERSION_ID" => release.version_id = value,
                "PRETTY_NAME" => release.pretty_name = value,
                _ => {}
            }
        }
        release
    }

    #[must_use]
    pub fn is_ubuntu(&self) -> bool {
        self.id == "ubuntu"
    }
}

/// Check that `domain` is a syntactically valid hostname with a
/// top-level domain.
///
/// ```
/// use vcdeploy::preflight::validate_domain;
///
/// assert!(validate_domain("example.com").is_ok());
/// assert!(validate_domain("not a domain").is_err());
/// ```
pub fn validate_domain(domain: &str) -> DeployResult<()> {
    if domain.len() <= 253 && DOMAIN_RE.is_match(domain) {
        Ok(())
    } else {
        Err(DeployError::InvalidDomain(domain.to_string()))
    }
}

pub fn check_os(host: &dyn Host) -> DeployResult<OsRelease> {
    let content = host
        .read_file("/etc/os-release")?
        .ok_or_else(|| DeployError::UnsupportedOs("unknown (no /etc/os-release)".into()))?;
    let release = OsRelease::parse(&content);
    if !release.is_ubuntu() {
        let name = if release.pretty_name.is_empty() {
            release.id
        } else {
            release.pretty_name
        };
        return Err(DeployError::UnsupportedOs(name));
    }
    Ok(release)
}

pub fn check_root(host: &dyn Host) -> DeployResult<()> {
    let uid = host.exec("id -u")?;
    if uid.trim() == "0" {
        Ok(())
    } else {
        Err(DeployError::NotRoot(uid.trim().to_string()))
    }
}

pub fn check_connectivity(host: &dyn Host, url: &str) -> DeployResult<()> {
    host.exec(&format!(
        "curl -fsS --max-time 10 -o /dev/null {}",
        shell_quote(url)
    ))
    .map(|_| ())
    .map_err(|_| DeployError::NoConnectivity(url.to_string()))
}

/// Full preflight for the installer: OS, privilege, domain,
/// connectivity, compose file. Stops at the first failure.
pub fn run(host: &dyn Host, stack: &Stack, domain: &str) -> DeployResult<ComposeLayout> {
    check_machine(host)?;
    check_target(host, stack, domain)
}

/// First half of the preflight: supported OS, running as root.
pub fn check_machine(host: &dyn Host) -> DeployResult<()> {
    info!("Running preflight checks on {}...", host.describe());

    let release = check_os(host)?;
    info!("✓ OS: {} {}", release.pretty_name, release.version_id);

    check_root(host)?;
    info!("✓ running as root");
    Ok(())
}

/// Second half of the preflight: domain, connectivity, compose
/// file. Expects [`check_machine`] to have passed.
pub fn check_target(host: &dyn Host, stack: &Stack, domain: &str) -> DeployResult<ComposeLayout> {
    validate_domain(domain)?;
    info!("✓ domain: {domain}");

    check_connectivity(host, &stack.connectivity_url)?;
    info!("✓ network reachable");

    let layout = compose::load(host, stack)?;
    info!(
        services = %layout.services.join(","),
        "✓ compose file: {}",
        stack.compose_path()
    );

    Ok(layout)
}

/// Reduced preflight for the repair command: privilege and
/// compose file only.
pub fn run_for_repair(host: &dyn Host, stack: &Stack) -> DeployResult<ComposeLayout> {
    check_root(host)?;
    compose::load(host, stack)
}
