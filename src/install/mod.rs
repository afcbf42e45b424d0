pub mod apt;
pub mod certbot;
pub mod docker;
pub mod firewall;

use std::cell::Cell;

use tracing::info;

use crate::cmd::shell_quote;
use crate::error::{DeployError, DeployResult};
use crate::host::Host;

pub use apt::AptPackage;
pub use certbot::{CertStatus, Certbot};
pub use docker::{ComposePlugin, Docker};
pub use firewall::Firewall;

/// A piece of server software the stack depends on.
pub trait Component {
    fn name(&self) -> &str;

    /// Whether the component is already usable on the host.
    fn is_installed(&self, host: &dyn Host) -> bool;

    /// Install the component. Only called when
    /// [`is_installed`](Component::is_installed) returned false.
    fn install(&self, apt: &Apt<'_>) -> DeployResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    AlreadyPresent,
    Installed,
}

/// Package manager front-end. Refreshes the package index at most
/// once per run.
pub struct Apt<'a> {
    host: &'a dyn Host,
    updated: Cell<bool>,
}

impl<'a> Apt<'a> {
    #[must_use]
    pub fn new(host: &'a dyn Host) -> Self {
        Self {
            host,
            updated: Cell::new(false),
        }
    }

    #[must_use]
    pub fn host(&self) -> &'a dyn Host {
        self.host
    }

    pub fn install(&self, packages: &[&str]) -> DeployResult<()> {
        if !self.updated.get() {
            self.host.exec_interactive("apt-get update -y")?;
            self.updated.set(true);
        }
        let list: Vec<String> = packages.iter().map(|p| shell_quote(p)).collect();
        self.host.exec_interactive(&format!(
            "DEBIAN_FRONTEND=noninteractive apt-get install -y {}",
            list.join(" ")
        ))
    }
}

/// Install `component` unless it is already present, then verify
/// it is usable.
pub fn ensure(apt: &Apt<'_>, component: &dyn Component) -> DeployResult<InstallStatus> {
    if component.is_installed(apt.host()) {
        info!("✓ {} already installed", component.name());
        return Ok(InstallStatus::AlreadyPresent);
    }

    info!("Installing {}...", component.name());
    component.install(apt)?;

    if !component.is_installed(apt.host()) {
        return Err(DeployError::PrerequisiteMissing(format!(
            "{} still unavailable after install",
            component.name()
        )));
    }
    info!("✓ {} installed", component.name());
    Ok(InstallStatus::Installed)
}

/// Everything the stack needs on a fresh Ubuntu server.
#[must_use]
pub fn default_components() -> Vec<Box<dyn Component>> {
    vec![
        Box::new(AptPackage::new("curl")),
        Box::new(AptPackage::new("openssl")),
        Box::new(Docker),
        Box::new(ComposePlugin),
        Box::new(AptPackage::new("nginx")),
        Box::new(AptPackage::new("certbot").with_extra("python3-certbot-nginx")),
        Box::new(AptPackage::new("ufw")),
    ]
}

/// Ensure every default component. Any failure is fatal.
pub fn install_all(host: &dyn Host) -> DeployResult<Vec<(String, InstallStatus)>> {
    let apt = Apt::new(host);
    default_components()
        .iter()
        .map(|c| ensure(&apt, c.as_ref()).map(|s| (c.name().to_string(), s)))
        .collect()
}
