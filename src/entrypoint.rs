use std::process::Command;

use tracing::info;

use crate::error::{DeployError, DeployResult};
use crate::host::Host;
use crate::manage::Manage;
use crate::report::Report;

/// Env var overriding the server command.
pub const SERVER_COMMAND_ENV: &str = "SERVER_COMMAND";

/// Container start-up steps before the server takes over:
/// migrations, then static files. Static files are collected
/// whatever happened to the migrations.
pub fn prepare(host: &dyn Host) -> Report {
    let mut report = Report::new();
    let manage = Manage::local(host);

    info!("Applying database migrations...");
    if report.best_effort("migrate", manage.migrate()).is_some() {
        report.note("migrations applied");
    }

    info!("Collecting static files...");
    if report
        .best_effort("collectstatic", manage.collectstatic(true))
        .is_some()
    {
        report.note("static files collected");
    }

    report
}

/// Build the process running the server command line through
/// `sh`, so quoting, variable references and redirections behave as
/// they would in the compose file. `exec` makes the server replace
/// the shell.
pub fn server_command(command: &str) -> DeployResult<Command> {
    let line = command.trim();
    if line.is_empty() {
        return Err(DeployError::InvalidInput("empty server command".into()));
    }
    let mut process = Command::new("sh");
    process.arg("-c").arg(format!("exec {line}"));
    Ok(process)
}

/// Replace the current process with the application server. Only
/// returns on failure.
#[cfg(unix)]
pub fn exec_server(command: &str) -> DeployResult<()> {
    use std::os::unix::process::CommandExt;

    let mut process = server_command(command)?;
    info!("Starting server: {command}");
    let err = process.exec();
    if err.kind() == std::io::ErrorKind::NotFound {
        return Err(DeployError::CommandNotFound("sh".into()));
    }
    Err(DeployError::Io(err))
}

/// Run the application server as a child and mirror its exit.
#[cfg(not(unix))]
pub fn exec_server(command: &str) -> DeployResult<()> {
    let mut process = server_command(command)?;
    info!("Starting server: {command}");
    let status = process.status()?;
    if status.success() {
        Ok(())
    } else {
        Err(DeployError::CommandFailed {
            command: command.to_string(),
            code: status.code(),
            stderr: String::new(),
        })
    }
}
