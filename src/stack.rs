use std::time::Duration;

use crate::cmd::shell_quote;
use crate::env_file::EnvFile;

/// Describes the deployed compose stack: where it lives on the
/// server, what its services are called, and the database
/// credentials it is configured with.
///
/// # Example
///
/// ```
/// use vcdeploy::Stack;
///
/// let stack = Stack::new("videocall")
///     .project_dir("/srv/videocall")
///     .backend_service("web")
///     .db_user("vc");
///
/// assert_eq!(stack.env_path(), "/srv/videocall/.env");
/// assert_eq!(stack.backend_service, "web");
/// ```
#[derive(Debug, Clone)]
pub struct Stack {
    /// Compose project name (`docker compose -p`).
    pub name: String,
    pub project_dir: String,
    pub compose_file: String,
    pub env_file: String,
    pub db_service: String,
    pub backend_service: String,
    pub db_name: String,
    pub db_user: String,
    pub db_port: u16,
    pub redis_url: String,
    pub app_port: u16,
    pub server_command: String,
    pub ready_attempts: u32,
    pub ready_interval: Duration,
    pub admin_username: String,
    pub connectivity_url: String,
}

impl Stack {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            project_dir: format!("/opt/{name}"),
            compose_file: "docker-compose.yml".to_string(),
            env_file: ".env".to_string(),
            db_service: "db".to_string(),
            backend_service: "backend".to_string(),
            db_name: name.to_string(),
            db_user: name.to_string(),
            db_port: 5432,
            redis_url: "redis://redis:6379/0".to_string(),
            app_port: 8000,
            server_command: "daphne -b 0.0.0.0 -p 8000 config.asgi:application".to_string(),
            ready_attempts: 30,
            ready_interval: Duration::from_secs(5),
            admin_username: "admin".to_string(),
            connectivity_url: "https://download.docker.com".to_string(),
        }
    }

    #[must_use]
    pub fn project_dir(mut self, dir: &str) -> Self {
        self.project_dir = dir.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn compose_file(mut self, file: &str) -> Self {
        self.compose_file = file.to_string();
        self
    }

    #[must_use]
    pub fn env_file(mut self, file: &str) -> Self {
        self.env_file = file.to_string();
        self
    }

    #[must_use]
    pub fn db_service(mut self, service: &str) -> Self {
        self.db_service = service.to_string();
        self
    }

    #[must_use]
    pub fn backend_service(mut self, service: &str) -> Self {
        self.backend_service = service.to_string();
        self
    }

    #[must_use]
    pub fn db_name(mut self, name: &str) -> Self {
        self.db_name = name.to_string();
        self
    }

    #[must_use]
    pub fn db_user(mut self, user: &str) -> Self {
        self.db_user = user.to_string();
        self
    }

    /// Take the database name and user from an existing environment
    /// file. The cluster was initialised with them, so they win over
    /// the configured defaults. `DB_*` is read before `POSTGRES_*`.
    #[must_use]
    pub fn db_identity_from(mut self, env: &EnvFile) -> Self {
        let pick = |keys: [&str; 2]| {
            keys.into_iter()
                .filter_map(|k| env.get(k))
                .map(str::trim)
                .find(|v| !v.is_empty())
                .map(str::to_string)
        };
        if let Some(name) = pick(["DB_NAME", "POSTGRES_DB"]) {
            self.db_name = name;
        }
        if let Some(user) = pick(["DB_USER", "POSTGRES_USER"]) {
            self.db_user = user;
        }
        self
    }

    #[must_use]
    pub const fn db_port(mut self, port: u16) -> Self {
        self.db_port = port;
        self
    }

    #[must_use]
    pub fn redis_url(mut self, url: &str) -> Self {
        self.redis_url = url.to_string();
        self
    }

    #[must_use]
    pub const fn app_port(mut self, port: u16) -> Self {
        self.app_port = port;
        self
    }

    #[must_use]
    pub fn server_command(mut self, command: &str) -> Self {
        self.server_command = command.to_string();
        self
    }

    #[must_use]
    pub const fn readiness(mut self, attempts: u32, interval: Duration) -> Self {
        self.ready_attempts = attempts;
        self.ready_interval = interval;
        self
    }

    #[must_use]
    pub fn admin_username(mut self, username: &str) -> Self {
        self.admin_username = username.to_string();
        self
    }

    #[must_use]
    pub fn connectivity_url(mut self, url: &str) -> Self {
        self.connectivity_url = url.to_string();
        self
    }

    #[must_use]
    pub fn compose_path(&self) -> String {
        format!("{}/{}", self.project_dir, self.compose_file)
    }

    #[must_use]
    pub fn env_path(&self) -> String {
        format!("{}/{}", self.project_dir, self.env_file)
    }

    #[must_use]
    pub fn backup_dir(&self) -> String {
        format!("{}/backups", self.project_dir)
    }

    /// Shell command running `docker compose <args>` for this
    /// project from inside its directory.
    #[must_use]
    pub fn compose(&self, args: &str) -> String {
        format!(
            "cd {} && docker compose -p {} -f {} {args}",
            shell_quote(&self.project_dir),
            shell_quote(&self.name),
            shell_quote(&self.compose_file),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let stack = Stack::new("videocall");

        assert_eq!(stack.project_dir, "/opt/videocall");
        assert_eq!(stack.compose_file, "docker-compose.yml");
        assert_eq!(stack.env_file, ".env");
        assert_eq!(stack.db_service, "db");
        assert_eq!(stack.backend_service, "backend");
        assert_eq!(stack.db_port, 5432);
        assert_eq!(stack.app_port, 8000);
        assert_eq!(stack.ready_attempts, 30);
        assert_eq!(stack.ready_interval, Duration::from_secs(5));
    }

    #[test]
    fn project_dir_drops_trailing_slash() {
        let stack = Stack::new("vc").project_dir("/srv/vc/");

        assert_eq!(stack.compose_path(), "/srv/vc/docker-compose.yml");
        assert_eq!(stack.backup_dir(), "/srv/vc/backups");
    }

    #[test]
    fn db_identity_comes_from_existing_env() {
        let env = EnvFile::parse("DB_NAME=vc_db\nPOSTGRES_USER=vc_user\nDB_USER=\n")
            .expect("parse");

        let stack = Stack::new("videocall").db_identity_from(&env);

        assert_eq!(stack.db_name, "vc_db");
        assert_eq!(stack.db_user, "vc_user");
    }

    #[test]
    fn db_identity_falls_back_to_defaults() {
        let stack = Stack::new("videocall").db_identity_from(&EnvFile::new());

        assert_eq!(stack.db_name, "videocall");
        assert_eq!(stack.db_user, "videocall");
    }

    #[test]
    fn compose_command_is_scoped_to_project() {
        let stack = Stack::new("vc").project_dir("/srv/vc");

        assert_eq!(
            stack.compose("ps"),
            "cd '/srv/vc' && docker compose -p 'vc' -f 'docker-compose.yml' ps"
        );
    }
}
