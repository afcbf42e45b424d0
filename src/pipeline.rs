use std::io::{self, BufRead, Write};
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{info, warn};

use crate::entrypoint::{self, SERVER_COMMAND_ENV};
use crate::env_file::{EnvFile, SECRET_KEYS};
use crate::error::DeployResult;
use crate::host::{Host, LocalHost};
use crate::install::{self, Certbot, Firewall};
use crate::launch::{AdminAccount, Launcher};
use crate::manage::{self, Manage};
use crate::preflight;
use crate::prompt;
use crate::repair;
use crate::report::Report;
use crate::secrets::{self, Secret};
use crate::ssh::SshSession;
use crate::stack::Stack;
use crate::volume::MismatchPolicy;

/// Command-line front end: parses arguments and dispatches to the
/// deploy, fix, start, status and access-password flows.
pub struct Pipeline {
    stack: Stack,
}

impl Pipeline {
    #[must_use]
    pub const fn new(stack: Stack) -> Self {
        Self { stack }
    }

    /// Parse CLI arguments and dispatch the appropriate
    /// command.
    ///
    /// # Errors
    ///
    /// Returns an error if the dispatched command fails.
    pub fn run(&self) -> DeployResult<()> {
        self.execute(&Cli::parse())
    }

    /// Dispatch already-parsed arguments.
    pub fn execute(&self, cli: &Cli) -> DeployResult<()> {
        let mut stack = self.stack.clone();
        if let Some(dir) = &cli.project_dir {
            stack = stack.project_dir(dir);
        }
        if let Some(name) = &cli.project_name {
            stack.name.clone_from(name);
        }

        match &cli.command {
            Command::Deploy(args) => cmd_deploy(&stack, args),
            Command::Fix {
                target,
                on_db_mismatch,
                yes,
            } => cmd_fix(&stack, target, *on_db_mismatch, *yes),
            Command::Start { server_cmd } => cmd_start(&stack, server_cmd.as_deref()),
            Command::Status { target } => cmd_status(&stack, target),
            Command::AccessPassword { target } => cmd_access_password(&stack, target),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "vcdeploy")]
#[command(about = "Provision a server and launch the video-calling stack")]
pub struct Cli {
    /// Directory holding docker-compose.yml and .env on the server
    #[arg(long, global = true)]
    pub project_dir: Option<String>,

    /// Compose project name
    #[arg(long, global = true)]
    pub project_name: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Where commands run: this machine by default, or a server over
/// SSH.
#[derive(Args, Debug, Clone, Default)]
pub struct Target {
    /// Run on a remote server (USER@HOST) instead of locally
    #[arg(long = "host")]
    pub host: Option<String>,

    /// SSH private key for --host
    #[arg(long)]
    pub ssh_key: Option<String>,
}

#[derive(Args, Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct DeployArgs {
    /// Public domain of the deployment (prompted when omitted)
    #[arg(long)]
    pub domain: Option<String>,

    /// Contact email for Let's Encrypt and the admin account
    #[arg(long)]
    pub email: Option<String>,

    /// Create a Django admin account without asking
    #[arg(long, conflicts_with = "no_admin")]
    pub admin: bool,

    /// Skip admin account creation without asking
    #[arg(long)]
    pub no_admin: bool,

    /// What to do if the database volume rejects the configured
    /// password
    #[arg(long, value_enum, default_value_t = MismatchPolicy::Rotate)]
    pub on_db_mismatch: MismatchPolicy,

    /// Assume "yes" for destructive confirmations
    #[arg(long)]
    pub yes: bool,

    /// Do not install Docker, Nginx, Certbot and UFW
    #[arg(long)]
    pub skip_install: bool,

    /// Do not request a TLS certificate
    #[arg(long)]
    pub skip_certbot: bool,

    /// Preview the environment file and actions without executing
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub target: Target,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install dependencies, write configuration and launch the
    /// stack
    Deploy(DeployArgs),

    /// Diagnose and repair a deployed stack (non-interactive)
    Fix {
        #[command(flatten)]
        target: Target,

        /// What to do if the database volume rejects the
        /// configured password
        #[arg(long, value_enum, default_value_t = MismatchPolicy::Abort)]
        on_db_mismatch: MismatchPolicy,

        /// Assume "yes" for destructive confirmations
        #[arg(long)]
        yes: bool,
    },

    /// Container entrypoint: migrate, collect static files, exec
    /// the server
    Start {
        /// Server command line (default: $SERVER_COMMAND or daphne)
        #[arg(long)]
        server_cmd: Option<String>,
    },

    /// Show container status
    Status {
        #[command(flatten)]
        target: Target,
    },

    /// Change the application's system access password
    AccessPassword {
        #[command(flatten)]
        target: Target,
    },
}

/// Open the host commands run against.
fn connect(target: &Target) -> DeployResult<Box<dyn Host>> {
    let Some(destination) = &target.host else {
        return Ok(Box::new(LocalHost::new()));
    };
    let mut session = SshSession::parse(destination)?;
    if let Some(key) = &target.ssh_key {
        session = session.with_key(key);
    }
    session.wait_for_ready(3, Duration::from_secs(5))?;
    Ok(Box::new(session))
}

/// Downgrade `Recreate` to `Abort` unless the operator confirms.
fn confirm_policy<R: BufRead, W: Write>(
    policy: MismatchPolicy,
    yes: bool,
    input: &mut R,
    output: &mut W,
    stack: &Stack,
) -> DeployResult<MismatchPolicy> {
    if policy != MismatchPolicy::Recreate || yes {
        return Ok(policy);
    }
    let confirmed = prompt::confirm_destructive(
        input,
        output,
        &format!(
            "on a password mismatch the database volume will be deleted \
             (an archive is written to {} first)",
            stack.backup_dir()
        ),
    )?;
    if confirmed {
        Ok(policy)
    } else {
        warn!("Recreate not confirmed, mismatches will only be reported");
        Ok(MismatchPolicy::Abort)
    }
}

fn describe_secret(name: &str, secret: &Secret) {
    if secret.is_reused() {
        info!("✓ {name} reused from existing environment file");
    } else {
        info!("✓ {name} generated");
    }
}

fn cmd_deploy(stack: &Stack, args: &DeployArgs) -> DeployResult<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stderr();

    let host = connect(&args.target)?;
    if !args.dry_run {
        preflight::check_machine(host.as_ref())?;
    }

    let domain = match &args.domain {
        Some(d) => d.trim().to_string(),
        None => prompt::ask(&mut input, &mut output, "Domain (e.g. call.example.com): ")?,
    };
    preflight::validate_domain(&domain)?;

    let create_admin = if args.admin {
        true
    } else if args.no_admin {
        false
    } else {
        prompt::confirm(&mut input, &mut output, "Create a Django admin account?", false)?
    };

    let policy = confirm_policy(args.on_db_mismatch, args.yes, &mut input, &mut output, stack)?;

    let existing = host
        .read_file(&stack.env_path())?
        .map(|content| EnvFile::parse(&content))
        .transpose()?;
    let secrets = secrets::resolve(existing.as_ref());
    let mut env = existing.unwrap_or_default();
    env.apply_managed(stack, &domain, &secrets);
    let stack = &stack.clone().db_identity_from(&env);

    if args.dry_run {
        print_dry_run(stack, &domain, &env, create_admin, args);
        return Ok(());
    }

    let layout = preflight::check_target(host.as_ref(), stack, &domain)?;
    let mut report = Report::new();

    if args.skip_install {
        info!("Skipping dependency installation");
    } else {
        install::install_all(host.as_ref())?;
        report.best_effort("firewall setup", Firewall::new().apply(host.as_ref()));
    }

    if !args.skip_certbot {
        let mut certbot = Certbot::new(&domain);
        if let Some(email) = &args.email {
            certbot = certbot.email(email);
        }
        report.best_effort("certificate issuance", certbot.ensure(host.as_ref()));
    }

    describe_secret("SECRET_KEY", &secrets.secret_key);
    describe_secret("DB_PASSWORD", &secrets.db_password);

    let admin = create_admin.then(|| {
        let email = args
            .email
            .clone()
            .unwrap_or_else(|| format!("admin@{domain}"));
        AdminAccount::generate(&stack.admin_username, &email)
    });

    let launched = Launcher::new(host.as_ref(), stack, &layout)
        .policy(policy)
        .launch(&env, admin.as_ref())?;
    report.merge(launched);

    report.summarize("Deployment complete");
    info!("Application available at: https://{domain}");
    Ok(())
}

fn print_dry_run(stack: &Stack, domain: &str, env: &EnvFile, create_admin: bool, args: &DeployArgs) {
    eprintln!("=== Dry run: no changes will be made ===");
    eprintln!();

    eprintln!("--- {} ---", stack.env_path());
    println!("{}", env.render_masked(SECRET_KEYS));

    eprintln!("--- Actions that would be performed ---");
    let mut steps = vec![format!(
        "Preflight: Ubuntu, root, domain {domain}, connectivity, {}",
        stack.compose_path()
    )];
    if !args.skip_install {
        steps.push("Install docker, compose plugin, nginx, certbot, ufw (if missing)".into());
        steps.push("Open OpenSSH and Nginx Full in UFW, enable firewall".into());
    }
    if !args.skip_certbot {
        steps.push(format!("Request Let's Encrypt certificate for {domain} (if missing)"));
    }
    steps.push(format!("Write {} (mode 600)", stack.env_path()));
    steps.push("docker compose up -d --build".into());
    steps.push(format!(
        "Wait for database, check volume password (on mismatch: {})",
        args.on_db_mismatch
    ));
    steps.push("Apply pending migrations, collect static files".into());
    if create_admin {
        steps.push(format!("Create admin user '{}'", stack.admin_username));
    }
    for (i, step) in steps.iter().enumerate() {
        eprintln!("{}. {step}", i + 1);
    }
}

fn cmd_fix(stack: &Stack, target: &Target, policy: MismatchPolicy, yes: bool) -> DeployResult<()> {
    let stdin = io::stdin();
    let policy = confirm_policy(policy, yes, &mut stdin.lock(), &mut io::stderr(), stack)?;

    let host = connect(target)?;
    let report = repair::run(host.as_ref(), stack, policy)?;
    report.summarize("Repair summary");
    Ok(())
}

fn cmd_start(stack: &Stack, server_cmd: Option<&str>) -> DeployResult<()> {
    let report = entrypoint::prepare(&LocalHost::new());
    report.summarize("Container start-up");

    let command = server_cmd
        .map(str::to_string)
        .or_else(|| std::env::var(SERVER_COMMAND_ENV).ok())
        .unwrap_or_else(|| stack.server_command.clone());
    entrypoint::exec_server(&command)
}

fn cmd_status(stack: &Stack, target: &Target) -> DeployResult<()> {
    let host = connect(target)?;
    host.exec_interactive(&stack.compose("ps"))
}

fn cmd_access_password(stack: &Stack, target: &Target) -> DeployResult<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stderr();

    let password = prompt::ask(&mut input, &mut output, "New access password: ")?;
    let confirm = prompt::ask(&mut input, &mut output, "Confirm access password: ")?;
    manage::validate_access_password(&password, &confirm)?;

    let host = connect(target)?;
    Manage::in_container(host.as_ref(), stack).set_access_password(&password)?;
    info!("✓ access password updated");
    Ok(())
}
