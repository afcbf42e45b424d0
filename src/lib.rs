//! Provision an Ubuntu server and launch the video-calling stack.
//!
//! `vcdeploy` replaces a set of installer, repair and entrypoint
//! shell scripts with one typed CLI. It installs Docker, the
//! Compose plugin, Nginx and Certbot; writes the application's
//! environment file, keeping secrets that were already configured;
//! brings the containers up with `docker compose`; and runs the
//! Django management steps that follow.
//!
//! # Overview
//!
//! A deployment is described by a [`Stack`] and driven by a
//! [`Pipeline`], which parses the command line and runs one of:
//!
//! - `deploy`: [`preflight`] checks, [`install`] of missing
//!   components, secret resolution ([`secrets`], [`env_file`]) and
//!   the [`launch`] sequence
//! - `fix`: the non-interactive [`repair`] pass
//! - `start`: the container [`entrypoint`]
//! - `status` and `access-password`
//!
//! Every step runs against a [`Host`](host::Host): the local
//! machine by default, or a server reached over [`ssh`].
//!
//! # Failure model
//!
//! Preflight and installation failures are fatal and surface as a
//! non-zero exit. Post-start steps (migrations, static files, admin
//! seeding) are best-effort: a failure is logged as a warning,
//! recorded in a [`Report`](report::Report), and the run
//! continues.
//!
//! A database volume that rejects the configured password is never
//! deleted silently. The [`MismatchPolicy`](volume::MismatchPolicy)
//! chooses between reporting it, rotating the password in place,
//! or an archived, confirmed re-creation.
//!
//! # Example
//!
//! ```rust,no_run
//! use vcdeploy::{Pipeline, Stack};
//!
//! fn main() -> anyhow::Result<()> {
//!     let stack = Stack::new("videocall")
//!         .project_dir("/opt/videocall")
//!         .backend_service("backend")
//!         .db_service("db");
//!
//!     Pipeline::new(stack).run()?;
//!     Ok(())
//! }
//! ```

// Allow noisy pedantic lints that don't add value for a
// deployment tool crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod cmd;
pub mod compose;
pub mod entrypoint;
pub mod env_file;
pub mod error;
pub mod host;
pub mod install;
pub mod launch;
pub mod manage;
pub mod pipeline;
pub mod poll;
pub mod preflight;
pub mod prompt;
pub mod repair;
pub mod report;
pub mod secrets;
pub mod ssh;
pub mod stack;
pub mod volume;

pub use env_file::EnvFile;
pub use error::{DeployError, DeployResult};
pub use host::{Host, LocalHost};
pub use pipeline::{Cli, Pipeline};
pub use ssh::SshSession;
pub use stack::Stack;
pub use volume::MismatchPolicy;
