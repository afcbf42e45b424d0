use crate::error::DeployResult;
use crate::host::Host;
use crate::install::{Apt, Component};

/// Docker Engine, installed from the upstream convenience script
/// so the Compose plugin repository is configured too.
#[derive(Debug, Clone, Copy, Default)]
pub struct Docker;

impl Component for Docker {
    fn name(&self) -> &str {
        "docker"
    }

    fn is_installed(&self, host: &dyn Host) -> bool {
        host.exec("docker --version").is_ok()
    }

    fn install(&self, apt: &Apt<'_>) -> DeployResult<()> {
        let host = apt.host();
        host.exec_interactive("curl -fsSL https://get.docker.com | sh")?;
        host.exec_interactive("systemctl enable --now docker")
    }
}

/// The `docker compose` v2 plugin.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComposePlugin;

impl Component for ComposePlugin {
    fn name(&self) -> &str {
        "docker compose"
    }

    fn is_installed(&self, host: &dyn Host) -> bool {
        host.exec("docker compose version").is_ok()
    }

    fn install(&self, apt: &Apt<'_>) -> DeployResult<()> {
        apt.install(&["docker-compose-plugin"])
    }
}
