use crate::error::DeployResult;
use crate::host::Host;
use crate::install::{Apt, Component};

/// A distribution package, detected by the binary it provides.
#[derive(Debug, Clone)]
pub struct AptPackage {
    pub package: String,
    pub binary: String,
    pub extra: Vec<String>,
}

impl AptPackage {
    /// Package whose binary has the same name.
    #[must_use]
    pub fn new(package: &str) -> Self {
        Self {
            package: package.to_string(),
            binary: package.to_string(),
            extra: Vec::new(),
        }
    }

    #[must_use]
    pub fn binary(mut self, binary: &str) -> Self {
        self.binary = binary.to_string();
        self
    }

    /// Additional package installed alongside (plugins and the
    /// like).
    #[must_use]
    pub fn with_extra(mut self, package: &str) -> Self {
        self.extra.push(package.to_string());
        self
    }
}

impl Component for AptPackage {
    fn name(&self) -> &str {
        &self.package
    }

    fn is_installed(&self, host: &dyn Host) -> bool {
        host.command_exists(&self.binary)
    }

    fn install(&self, apt: &Apt<'_>) -> DeployResult<()> {
        let mut packages = vec![self.package.as_str()];
        packages.extend(self.extra.iter().map(String::as_str));
        apt.install(&packages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chain() {
        let pkg = AptPackage::new("certbot")
            .binary("certbot")
            .with_extra("python3-certbot-nginx");

        assert_eq!(pkg.name(), "certbot");
        assert_eq!(pkg.binary, "certbot");
        assert_eq!(pkg.extra, vec!["python3-certbot-nginx"]);
    }
}
