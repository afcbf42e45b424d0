use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use tracing::{info, warn};

use crate::cmd::shell_quote;
use crate::error::{DeployError, DeployResult};
use crate::host::Host;
use crate::manage::Manage;
use crate::stack::Stack;

/// Postgres error text seen when the configured password is
/// rejected.
pub const AUTH_FAILURE_MARKER: &str = "password authentication failed";

/// What to do when the database volume was initialised with a
/// password other than the one in the environment file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MismatchPolicy {
    /// Report the mismatch and leave the volume untouched.
    Abort,
    /// Change the database user's password in place; data is kept.
    Rotate,
    /// Archive the volume, delete it and let Postgres re-initialise.
    Recreate,
}

impl fmt::Display for MismatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Abort => "abort",
            Self::Rotate => "rotate",
            Self::Recreate => "recreate",
        };
        f.write_str(s)
    }
}

/// `docker volume inspect` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct VolumeInfo {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Mountpoint", default)]
    pub mountpoint: String,
    #[serde(rename = "CreatedAt", default)]
    pub created_at: String,
}

/// Result of checking the database with the configured password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordCheck {
    Matches,
    Mismatch,
    /// The check failed for another reason (service down, app
    /// error); nothing can be concluded.
    Unknown(String),
}

/// How a reconciliation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    Matched,
    Rotated,
    Recreated { backup: String },
    LeftMismatched,
    Unverified(String),
}

/// Check the database from the backend container, which connects
/// over the network and therefore authenticates with the password
/// from the environment file.
pub fn check_password(manage: &Manage<'_>) -> PasswordCheck {
    match manage.check_database() {
        Ok(_) => PasswordCheck::Matches,
        Err(e) if e.stderr().contains(AUTH_FAILURE_MARKER)
            || e.to_string().contains(AUTH_FAILURE_MARKER) =>
        {
            PasswordCheck::Mismatch
        }
        Err(e) => PasswordCheck::Unknown(e.to_string()),
    }
}

/// The named volume holding the database cluster.
pub struct DbVolume<'a> {
    host: &'a dyn Host,
    stack: &'a Stack,
    name: String,
}

impl<'a> DbVolume<'a> {
    #[must_use]
    pub fn new(host: &'a dyn Host, stack: &'a Stack, name: &str) -> Self {
        Self {
            host,
            stack,
            name: name.to_string(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inspect(&self) -> DeployResult<Option<VolumeInfo>> {
        match self
            .host
            .exec(&format!("docker volume inspect {}", shell_quote(&self.name)))
        {
            Ok(out) if out.trim().is_empty() => Ok(None),
            Ok(out) => {
                let infos: Vec<VolumeInfo> = serde_json::from_str(&out)?;
                Ok(infos.into_iter().next())
            }
            Err(DeployError::CommandFailed { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn exists(&self) -> DeployResult<bool> {
        Ok(self.inspect()?.is_some())
    }

    /// Set the database user's password through the database
    /// container's local socket, which the official image trusts.
    pub fn rotate_password(&self, password: &str) -> DeployResult<()> {
        let sql = format!(
            "ALTER USER \"{}\" WITH PASSWORD '{}';",
            self.stack.db_user.replace('"', "\"\""),
            password.replace('\'', "''"),
        );
        let command = self.stack.compose(&format!(
            "exec -T {} psql -v ON_ERROR_STOP=1 -U {} -d {} -c {}",
            self.stack.db_service,
            shell_quote(&self.stack.db_user),
            shell_quote(&self.stack.db_name),
            shell_quote(&sql),
        ));
        self.host.exec(&command).map(|_| ())
    }

    /// Archive the volume contents to a tarball under the stack's
    /// backup directory and return its path.
    pub fn backup(&self) -> DeployResult<String> {
        let dir = self.stack.backup_dir();
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let file = format!("{}-{stamp}.tar.gz", self.name);

        self.host.exec(&format!("mkdir -p {}", shell_quote(&dir)))?;
        self.host.exec(&format!(
            "docker run --rm -v {}:/volume:ro -v {}:/backup alpine \
             tar czf /backup/{} -C /volume .",
            shell_quote(&self.name),
            shell_quote(&dir),
            shell_quote(&file),
        ))?;

        let path = format!("{dir}/{file}");
        info!("Database volume archived to {path}");
        Ok(path)
    }

    /// Stop the stack, archive the volume, remove it and start the
    /// stack again. Postgres re-initialises it with the current
    /// password. The archive is taken with the cluster shut down; a
    /// failed archive leaves the volume in place and restarts the
    /// stack.
    pub fn recreate(&self) -> DeployResult<String> {
        self.host.exec_interactive(&self.stack.compose("down"))?;

        let backup = match self.backup() {
            Ok(path) => path,
            Err(e) => {
                warn!("⚠ archive of '{}' failed, volume kept: {e}", self.name);
                if let Err(restart) = self
                    .host
                    .exec_interactive(&self.stack.compose("up -d"))
                {
                    warn!("⚠ restarting the stack failed: {restart}");
                }
                return Err(e);
            }
        };

        warn!("Removing database volume '{}'", self.name);
        self.host
            .exec(&format!("docker volume rm {}", shell_quote(&self.name)))?;
        self.host.exec_interactive(&self.stack.compose("up -d"))?;

        info!("Database volume '{}' re-created (backup: {backup})", self.name);
        Ok(backup)
    }

    /// Bring the volume in line with `password` according to
    /// `policy`. A volume whose password already matches is never
    /// touched.
    pub fn reconcile(
        &self,
        manage: &Manage<'_>,
        policy: MismatchPolicy,
        password: &str,
    ) -> DeployResult<Reconciliation> {
        match check_password(manage) {
            PasswordCheck::Matches => {
                info!("✓ database password matches volume '{}'", self.name);
                Ok(Reconciliation::Matched)
            }
            PasswordCheck::Unknown(reason) => {
                warn!("⚠ could not verify database password: {reason}");
                Ok(Reconciliation::Unverified(reason))
            }
            PasswordCheck::Mismatch => {
                warn!(
                    volume = %self.name,
                    %policy,
                    "⚠ database volume password does not match the environment file"
                );
                match policy {
                    MismatchPolicy::Abort => Ok(Reconciliation::LeftMismatched),
                    MismatchPolicy::Rotate => {
                        self.rotate_password(password)?;
                        if check_password(manage) == PasswordCheck::Mismatch {
                            return Err(DeployError::PasswordMismatch(self.name.clone()));
                        }
                        info!("✓ database password rotated, data kept");
                        Ok(Reconciliation::Rotated)
                    }
                    MismatchPolicy::Recreate => {
                        let backup = self.recreate()?;
                        Ok(Reconciliation::Recreated { backup })
                    }
                }
            }
        }
    }
}
