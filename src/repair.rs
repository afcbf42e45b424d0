use tracing::info;

use crate::env_file::{EnvFile, is_placeholder};
use crate::error::DeployResult;
use crate::host::Host;
use crate::launch::database_ready;
use crate::manage::Manage;
use crate::poll::Poller;
use crate::preflight;
use crate::report::Report;
use crate::stack::Stack;
use crate::volume::{DbVolume, MismatchPolicy, Reconciliation};

/// Service names from `docker compose ps --services`.
#[must_use]
pub fn running_services(ps_output: &str) -> Vec<String> {
    ps_output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Diagnose and repair a deployed stack without prompting.
///
/// Only the preflight (root, compose file) is fatal; everything
/// after it is best-effort and ends up in the report.
pub fn run(host: &dyn Host, stack: &Stack, policy: MismatchPolicy) -> DeployResult<Report> {
    let layout = preflight::run_for_repair(host, stack)?;
    let mut report = Report::new();

    info!("Checking environment file...");
    let env = check_env(host, stack, &mut report);
    let stack = &match &env {
        Some(env) => stack.clone().db_identity_from(env),
        None => stack.clone(),
    };
    let manage = Manage::in_container(host, stack);

    info!("Checking containers...");
    let ps = report.best_effort(
        "container status",
        host.exec(&stack.compose("ps --services --filter status=running")),
    );
    if let Some(ps) = ps {
        let running = running_services(&ps);
        let stopped: Vec<&String> = [&stack.db_service, &stack.backend_service]
            .into_iter()
            .filter(|s| !running.contains(s))
            .collect();
        if stopped.is_empty() {
            report.note("database and backend running");
        } else {
            let names: Vec<&str> = stopped.iter().map(|s| s.as_str()).collect();
            report.note(format!("started stopped services: {}", names.join(", ")));
            report.best_effort("compose up", host.exec_interactive(&stack.compose("up -d")));
        }
    }

    let poller = Poller::for_stack(stack);
    if !poller.wait("database", || database_ready(host, stack)).is_ready() {
        report.warn("database is not accepting connections");
    }

    let password = env
        .as_ref()
        .and_then(|e| e.configured(&["DB_PASSWORD", "POSTGRES_PASSWORD"]));
    if let (Some(name), Some(password)) = (layout.db_volume.as_deref(), password) {
        let volume = DbVolume::new(host, stack, name);
        let outcome = report.best_effort(
            "database password check",
            volume.reconcile(&manage, policy, password),
        );
        match outcome {
            Some(Reconciliation::Matched) => report.note("database password matches volume"),
            Some(Reconciliation::Rotated) => report.note("database password rotated"),
            Some(Reconciliation::Recreated { backup }) => {
                report.note(format!("database volume re-created, backup at {backup}"));
            }
            Some(Reconciliation::LeftMismatched) => report.warn(format!(
                "volume '{name}' does not accept the configured password; \
                 re-run with --on-db-mismatch rotate (keeps data) \
                 or --on-db-mismatch recreate (deletes data after a backup)"
            )),
            Some(Reconciliation::Unverified(reason)) => {
                report.warn(format!("database password not verified: {reason}"));
            }
            None => {}
        }
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

    if report
        .best_effort(
            "backend restart",
            host.exec(&stack.compose(&format!("restart {}", stack.backend_service))),
        )
        .is_some()
    {
        report.note(format!("{} restarted", stack.backend_service));
    }

    Ok(report)
}

fn check_env(host: &dyn Host, stack: &Stack, report: &mut Report) -> Option<EnvFile> {
    let path = stack.env_path();
    let content = report.best_effort("reading environment file", host.read_file(&path))?;
    let Some(content) = content else {
        report.warn(format!("environment file missing: {path}; run `vcdeploy deploy`"));
        return None;
    };
    let env = report.best_effort("parsing environment file", EnvFile::parse(&content))?;

    for key in ["SECRET_KEY", "DB_PASSWORD"] {
        if env.get(key).is_none_or(is_placeholder) {
            report.warn(format!(
                "{key} is missing or a placeholder; run `vcdeploy deploy` to generate it"
            ));
        }
    }
    Some(env)
}
