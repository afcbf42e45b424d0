use tracing::info;

use crate::cmd::shell_quote;
use crate::compose::ComposeLayout;
use crate::env_file::EnvFile;
use crate::error::{DeployError, DeployResult};
use crate::host::Host;
use crate::manage::Manage;
use crate::poll::Poller;
use crate::report::Report;
use crate::secrets::{self, ADMIN_PASSWORD_LEN};
use crate::stack::Stack;
use crate::volume::{DbVolume, MismatchPolicy, Reconciliation};

/// Django superuser seeded after the first launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl AdminAccount {
    /// Account with a freshly generated password.
    #[must_use]
    pub fn generate(username: &str, email: &str) -> Self {
        Self {
            username: username.to_string(),
            email: email.to_string(),
            password: secrets::generate(ADMIN_PASSWORD_LEN),
        }
    }
}

/// Whether Postgres accepts connections inside the database
/// container.
#[must_use]
pub fn database_ready(host: &dyn Host, stack: &Stack) -> bool {
    host.exec(&stack.compose(&format!(
        "exec -T {} pg_isready -U {} -d {}",
        stack.db_service,
        shell_quote(&stack.db_user),
        shell_quote(&stack.db_name),
    )))
    .is_ok()
}

/// Brings the stack up and runs the post-start steps.
pub struct Launcher<'a> {
    host: &'a dyn Host,
    stack: &'a Stack,
    layout: &'a ComposeLayout,
    policy: MismatchPolicy,
}

impl<'a> Launcher<'a> {
    #[must_use]
    pub const fn new(host: &'a dyn Host, stack: &'a Stack, layout: &'a ComposeLayout) -> Self {
        Self {
            host,
            stack,
            layout,
            policy: MismatchPolicy::Rotate,
        }
    }

    #[must_use]
    pub const fn policy(mut self, policy: MismatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Write the environment file readable by root only.
    pub fn write_env(&self, env: &EnvFile) -> DeployResult<()> {
        let path = self.stack.env_path();
        self.host
            .exec(&format!("mkdir -p {}", shell_quote(&self.stack.project_dir)))?;
        self.host.write_file(&env.render(), &path)?;
        self.host.exec(&format!("chmod 600 {}", shell_quote(&path)))?;
        info!("✓ environment written to {path}");
        Ok(())
    }

    /// Write config, start containers and run the post-start steps.
    ///
    /// Starting the stack is fatal on failure, as is a database
    /// password mismatch left unresolved by the policy. Migrations,
    /// static files and admin seeding are best-effort and end up as
    /// warnings in the returned report.
    pub fn launch(&self, env: &EnvFile, admin: Option<&AdminAccount>) -> DeployResult<Report> {
        let mut report = Report::new();
        let poller = Poller::for_stack(self.stack);
        let manage = Manage::in_container(self.host, self.stack);

        let volume = self
            .layout
            .db_volume
            .as_deref()
            .map(|name| DbVolume::new(self.host, self.stack, name));
        let volume_preexisted = match &volume {
            Some(v) => v.exists()?,
            None => false,
        };

        self.write_env(env)?;

        info!("Starting containers...");
        self.host
            .exec_interactive(&self.stack.compose("up -d --build"))?;

        if !poller
            .wait("database", || database_ready(self.host, self.stack))
            .is_ready()
        {
            report.warn("database did not report ready");
        }

        if let (Some(volume), true) = (&volume, volume_preexisted) {
            let password = env
                .configured(&["DB_PASSWORD", "POSTGRES_PASSWORD"])
                .ok_or_else(|| DeployError::EnvMissing("DB_PASSWORD".into()))?;
            match volume.reconcile(&manage, self.policy, password)? {
                Reconciliation::Matched => {}
                Reconciliation::Rotated => {
                    report.note(format!("database password rotated on '{}'", volume.name()));
                }
                Reconciliation::Recreated { backup } => {
                    report.note(format!(
                        "database volume '{}' re-created, backup at {backup}",
                        volume.name()
                    ));
                    poller.wait("database", || database_ready(self.host, self.stack));
                }
                Reconciliation::LeftMismatched => {
                    return Err(DeployError::PasswordMismatch(volume.name().to_string()));
                }
                Reconciliation::Unverified(reason) => {
                    report.warn(format!("database password not verified: {reason}"));
                }
            }
        }

        if !poller
            .wait("backend", || manage.plan().is_ok())
            .is_ready()
        {
            report.warn("backend did not report ready");
        }

        let outcome = manage.run_pending_migrations();
        if outcome.is_failure() {
            report.warn(outcome.to_string());
        } else {
            report.note(outcome.to_string());
        }

        if report
            .best_effort("collectstatic", manage.collectstatic(false))
            .is_some()
        {
            report.note("static files collected");
        }

        if let Some(admin) = admin {
            let created = report.best_effort(
                "admin creation",
                manage.create_superuser(&admin.username, &admin.email, &admin.password),
            );
            if created.is_some() {
                report.note(format!(
                    "admin '{}' created with password: {}",
                    admin.username, admin.password
                ));
            }
        }

        if let Some(true) =
            report.best_effort("access password check", manage.access_password_is_default())
        {
            report.warn(
                "system access password is still the default; \
                 change it with `vcdeploy access-password`",
            );
        }

        Ok(report)
    }
}
