use std::fmt;

use tracing::{info, warn};

use crate::cmd::shell_quote;
use crate::error::{DeployError, DeployResult};
use crate::host::Host;
use crate::stack::Stack;

/// Line prefix `showmigrations --plan` uses for unapplied
/// migrations.
pub const PENDING_MARKER: &str = "[ ]";

/// Access password the application seeds on first start.
pub const DEFAULT_ACCESS_PASSWORD: &str = "admin123";

pub const MIN_ACCESS_PASSWORD_LEN: usize = 6;

/// Forces a login; `check --database` runs without connecting.
const CONNECTION_CHECK: &str =
    "from django.db import connection; connection.ensure_connection()";

/// Whether `showmigrations --plan` output lists unapplied work.
///
/// ```
/// use vcdeploy::manage::has_pending_migrations;
///
/// assert!(has_pending_migrations("[X]  core.0001_initial\n[ ]  core.0002_log"));
/// assert!(!has_pending_migrations("[X]  core.0001_initial"));
/// ```
#[must_use]
pub fn has_pending_migrations(plan: &str) -> bool {
    plan.lines()
        .any(|line| line.trim_start().starts_with(PENDING_MARKER))
}

/// Validate a new system access password and its confirmation.
pub fn validate_access_password(password: &str, confirm: &str) -> DeployResult<()> {
    if password.is_empty() {
        return Err(DeployError::InvalidInput("enter a new password".into()));
    }
    if confirm.is_empty() {
        return Err(DeployError::InvalidInput("confirm the password".into()));
    }
    if password != confirm {
        return Err(DeployError::InvalidInput("passwords do not match".into()));
    }
    if password.chars().count() < MIN_ACCESS_PASSWORD_LEN {
        return Err(DeployError::InvalidInput(format!(
            "password must be at least {MIN_ACCESS_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Outcome of the conditional migration runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    UpToDate,
    Applied,
    Failed,
    PlanUnavailable,
}

impl MigrationOutcome {
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::PlanUnavailable)
    }
}

impl fmt::Display for MigrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UpToDate => "migrations up to date",
            Self::Applied => "pending migrations applied",
            Self::Failed => "migration apply failed",
            Self::PlanUnavailable => "migration plan unavailable",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
enum Invocation {
    /// `docker compose exec` into the backend service.
    Container(Box<Stack>),
    /// Plain `python manage.py` in the current environment.
    Local,
}

/// Runs Django management commands, either inside the running
/// backend container or in the local process environment.
pub struct Manage<'a> {
    host: &'a dyn Host,
    invocation: Invocation,
}

impl<'a> Manage<'a> {
    #[must_use]
    pub fn in_container(host: &'a dyn Host, stack: &Stack) -> Self {
        Self {
            host,
            invocation: Invocation::Container(Box::new(stack.clone())),
        }
    }

    #[must_use]
    pub const fn local(host: &'a dyn Host) -> Self {
        Self {
            host,
            invocation: Invocation::Local,
        }
    }

    /// Shell command for `manage.py <args>` with extra environment.
    #[must_use]
    pub fn command(&self, args: &str, env: &[(&str, &str)]) -> String {
        match &self.invocation {
            Invocation::Container(stack) => {
                let flags: String = env
                    .iter()
                    .map(|(k, v)| format!("-e {} ", shell_quote(&format!("{k}={v}"))))
                    .collect();
                stack.compose(&format!(
                    "exec -T {flags}{} python manage.py {args}",
                    stack.backend_service
                ))
            }
            Invocation::Local => {
                let assigns: String = env
                    .iter()
                    .map(|(k, v)| format!("{k}={} ", shell_quote(v)))
                    .collect();
                format!("{assigns}python manage.py {args}")
            }
        }
    }

    /// `showmigrations --plan` output.
    pub fn plan(&self) -> DeployResult<String> {
        self.host.exec(&self.command("showmigrations --plan", &[]))
    }

    pub fn migrate(&self) -> DeployResult<()> {
        self.host
            .exec_interactive(&self.command("migrate --noinput", &[]))
    }

    /// Apply migrations only when the plan lists pending ones.
    /// Failures are logged and reported, never raised.
    pub fn run_pending_migrations(&self) -> MigrationOutcome {
        let plan = match self.plan() {
            Ok(plan) => plan,
            Err(e) => {
                warn!("⚠ could not read migration plan: {e}");
                return MigrationOutcome::PlanUnavailable;
            }
        };

        if !has_pending_migrations(&plan) {
            info!("✓ no pending migrations");
            return MigrationOutcome::UpToDate;
        }

        info!("Applying pending migrations...");
        match self.migrate() {
            Ok(()) => {
                info!("✓ migrations applied");
                MigrationOutcome::Applied
            }
            Err(e) => {
                warn!("⚠ migrations failed: {e}");
                MigrationOutcome::Failed
            }
        }
    }

    pub fn collectstatic(&self, clear: bool) -> DeployResult<()> {
        let args = if clear {
            "collectstatic --noinput --clear"
        } else {
            "collectstatic --noinput"
        };
        self.host.exec(&self.command(args, &[])).map(|_| ())
    }

    /// Open and authenticate a connection to the default database
    /// with the credentials Django is configured with.
    pub fn check_database(&self) -> DeployResult<String> {
        let args = format!("shell -c {}", shell_quote(CONNECTION_CHECK));
        self.host.exec(&self.command(&args, &[]))
    }

    pub fn create_superuser(&self, username: &str, email: &str, password: &str) -> DeployResult<()> {
        let env = [
            ("DJANGO_SUPERUSER_USERNAME", username),
            ("DJANGO_SUPERUSER_EMAIL", email),
            ("DJANGO_SUPERUSER_PASSWORD", password),
        ];
        self.host
            .exec(&self.command("createsuperuser --noinput", &env))
            .map(|_| ())
    }

    /// Set the application's system access password. The value
    /// travels as an environment variable, never inside the
    /// Python source.
    pub fn set_access_password(&self, password: &str) -> DeployResult<()> {
        let code = "import os; \
                    from apps.core.models import SystemSettings; \
                    s = SystemSettings.get_settings(); \
                    s.set_password(os.environ['ACCESS_PASSWORD']); \
                    s.save()";
        let args = format!("shell -c {}", shell_quote(code));
        self.host
            .exec(&self.command(&args, &[("ACCESS_PASSWORD", password)]))
            .map(|_| ())
    }

    /// Whether the access password is still the seeded default.
    pub fn access_password_is_default(&self) -> DeployResult<bool> {
        let code = format!(
            "from apps.core.models import SystemSettings; \
             print(SystemSettings.get_settings().check_password('{DEFAULT_ACCESS_PASSWORD}'))"
        );
        let args = format!("shell -c {}", shell_quote(&code));
        let out = self.host.exec(&self.command(&args, &[]))?;
        Ok(out.lines().any(|l| l.trim() == "True"))
    }
}
