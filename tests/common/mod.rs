//! Scripted [`Host`] for exercising deployment flows without a
//! server. Commands are matched by substring; the most recently
//! added matching rule answers, so a test can override a fixture's
//! default. Unmatched commands succeed with empty output.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use vcdeploy::{DeployError, DeployResult, Host, Stack};

pub const COMPOSE: &str = "\
services:
  db:
    image: postgres:16
    volumes:
      - postgres_data:/var/lib/postgresql/data
  redis:
    image: redis:7
  backend:
    image: videocall-backend:latest
    env_file: .env
volumes:
  postgres_data:
";

pub const VOLUME_NAME: &str = "videocall_postgres_data";

pub const VOLUME_JSON: &str = r#"[
    {
        "CreatedAt": "2024-05-01T10:00:00Z",
        "Driver": "local",
        "Labels": null,
        "Mountpoint": "/var/lib/docker/volumes/videocall_postgres_data/_data",
        "Name": "videocall_postgres_data",
        "Options": null,
        "Scope": "local"
    }
]"#;

pub const AUTH_FAILURE: &str =
    "django.db.utils.OperationalError: FATAL:  password authentication failed for user \"videocall\"";

/// Stack rooted at `/srv/vc` that polls without sleeping.
pub fn stack() -> Stack {
    Stack::new("videocall")
        .project_dir("/srv/vc")
        .readiness(2, Duration::ZERO)
}

#[derive(Debug, Clone)]
pub enum Reply {
    Ok(String),
    Fail(String),
}

#[derive(Default)]
pub struct FakeHost {
    rules: RefCell<Vec<(String, Vec<Reply>)>>,
    files: RefCell<HashMap<String, String>>,
    log: RefCell<Vec<String>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands containing `pattern` with `stdout`.
    pub fn on(self, pattern: &str, stdout: &str) -> Self {
        self.on_seq(pattern, vec![Reply::Ok(stdout.to_string())])
    }

    /// Fail commands containing `pattern` with `stderr`.
    pub fn fail(self, pattern: &str, stderr: &str) -> Self {
        self.on_seq(pattern, vec![Reply::Fail(stderr.to_string())])
    }

    /// Answer successive matches with successive replies; the last
    /// one repeats.
    pub fn on_seq(self, pattern: &str, replies: Vec<Reply>) -> Self {
        assert!(!replies.is_empty());
        self.rules.borrow_mut().push((pattern.to_string(), replies));
        self
    }

    pub fn file(self, path: &str, content: &str) -> Self {
        self.files
            .borrow_mut()
            .insert(path.to_string(), content.to_string());
        self
    }

    /// Every command executed so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn ran(&self, pattern: &str) -> bool {
        self.count(pattern) > 0
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|c| c.contains(pattern))
            .count()
    }

    pub fn position(&self, pattern: &str) -> Option<usize> {
        self.log.borrow().iter().position(|c| c.contains(pattern))
    }

    pub fn written(&self, path: &str) -> Option<String> {
        self.files.borrow().get(path).cloned()
    }

    fn answer(&self, command: &str) -> DeployResult<String> {
        self.log.borrow_mut().push(command.to_string());

        let mut rules = self.rules.borrow_mut();
        let Some((_, replies)) = rules
            .iter_mut()
            .rev()
            .find(|(p, _)| command.contains(p.as_str()))
        else {
            return Ok(String::new());
        };
        let reply = if replies.len() > 1 {
            replies.remove(0)
        } else {
            replies[0].clone()
        };

        match reply {
            Reply::Ok(out) => Ok(out),
            Reply::Fail(stderr) => Err(DeployError::CommandFailed {
                command: command.to_string(),
                code: Some(1),
                stderr,
            }),
        }
    }
}

impl Host for FakeHost {
    fn describe(&self) -> String {
        "fake".to_string()
    }

    fn exec(&self, command: &str) -> DeployResult<String> {
        self.answer(command)
    }

    fn exec_interactive(&self, command: &str) -> DeployResult<()> {
        self.answer(command).map(|_| ())
    }

    fn write_file(&self, content: &str, path: &str) -> DeployResult<()> {
        self.log.borrow_mut().push(format!("write {path}"));
        self.files
            .borrow_mut()
            .insert(path.to_string(), content.to_string());
        Ok(())
    }

    fn read_file(&self, path: &str) -> DeployResult<Option<String>> {
        Ok(self.files.borrow().get(path).cloned())
    }

    fn file_exists(&self, path: &str) -> bool {
        self.files.borrow().contains_key(path)
    }
}
