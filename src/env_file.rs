use std::fmt::Write as _;

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::DeployResult;
use crate::secrets::Secrets;
use crate::stack::Stack;

/// Values shipped in example env files that mean "never
/// configured".
pub const PLACEHOLDERS: &[&str] = &[
    "your-secret-key-here",
    "your-secret-key",
    "change-me",
    "changeme",
    "secret",
    "password",
    "your-db-password",
];

/// Whether a secret value is missing in all but name.
///
/// ```
/// use vcdeploy::env_file::is_placeholder;
///
/// assert!(is_placeholder(""));
/// assert!(is_placeholder("Change-Me"));
/// assert!(is_placeholder("django-insecure-abc123"));
/// assert!(!is_placeholder("k3Jq9x0PzT"));
/// ```
#[must_use]
pub fn is_placeholder(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    lowered.is_empty()
        || lowered.starts_with("django-insecure-")
        || PLACEHOLDERS.contains(&lowered.as_str())
}

/// A flat, ordered `KEY=VALUE` environment file.
///
/// Values are held expanded, as the application will see them.
/// Lines read from an existing file also keep their right-hand side
/// verbatim, so keys the deployment never touches are written back
/// exactly as the operator left them (`$VAR` references included).
#[derive(Debug, Clone, Default)]
pub struct EnvFile {
    entries: IndexMap<String, String>,
    raw: HashMap<String, String>,
}

impl PartialEq for EnvFile {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for EnvFile {}

impl EnvFile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse env file content. Comments, blank lines, `export`
    /// prefixes and quoting follow dotenv conventions.
    pub fn parse(content: &str) -> DeployResult<Self> {
        let mut entries = IndexMap::new();
        for item in dotenvy::from_read_iter(content.as_bytes()) {
            let (key, value) = item?;
            entries.insert(key, value);
        }
        let mut raw = raw_values(content);
        raw.retain(|key, _| entries.contains_key(key));
        Ok(Self { entries, raw })
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Set a key. Existing keys keep their position; a changed value
    /// drops the original text of the line.
    pub fn set(&mut self, key: &str, value: &str) {
        if self.get(key) != Some(value) {
            self.raw.remove(key);
        }
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First non-placeholder value among `keys`.
    #[must_use]
    pub fn configured(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.get(k))
            .find(|v| !is_placeholder(v))
    }

    /// Write every key the deployment manages. Keys added by the
    /// operator are left alone, and a database name or user already
    /// in the file is kept.
    pub fn apply_managed(&mut self, stack: &Stack, domain: &str, secrets: &Secrets) {
        let stack = stack.clone().db_identity_from(self);
        for (key, value) in managed_entries(&stack, domain, secrets) {
            self.set(key, &value);
        }
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::from("# Generated by vcdeploy. Secrets are reused on re-run.\n");
        for (key, value) in &self.entries {
            match self.raw.get(key) {
                Some(text) => {
                    let _ = writeln!(out, "{key}={text}");
                }
                None => {
                    let _ = writeln!(out, "{key}={}", quote_value(value));
                }
            }
        }
        out
    }

    /// Render with secret values replaced by a marker, for dry runs
    /// and logs.
    #[must_use]
    pub fn render_masked(&self, secret_keys: &[&str]) -> String {
        let mut masked = self.clone();
        for key in secret_keys {
            if masked.entries.contains_key(*key) {
                masked.set(key, "********");
            }
        }
        masked.render()
    }
}

/// Keys whose values must never be printed.
pub const SECRET_KEYS: &[&str] = &["SECRET_KEY", "DB_PASSWORD", "POSTGRES_PASSWORD"];

fn managed_entries(stack: &Stack, domain: &str, secrets: &Secrets) -> Vec<(&'static str, String)> {
    let origin = format!("https://{domain}");
    let cert_dir = format!("/etc/letsencrypt/live/{domain}");
    let db_password = secrets.db_password.value.clone();

    vec![
        ("SECRET_KEY", secrets.secret_key.value.clone()),
        ("DEBUG", "False".to_string()),
        (
            "ALLOWED_HOSTS",
            format!("{domain},localhost,127.0.0.1,{}", stack.backend_service),
        ),
        ("DB_NAME", stack.db_name.clone()),
        ("DB_USER", stack.db_user.clone()),
        ("DB_PASSWORD", db_password.clone()),
        ("DB_HOST", stack.db_service.clone()),
        ("DB_PORT", stack.db_port.to_string()),
        ("POSTGRES_DB", stack.db_name.clone()),
        ("POSTGRES_USER", stack.db_user.clone()),
        ("POSTGRES_PASSWORD", db_password),
        ("REDIS_URL", stack.redis_url.clone()),
        ("CORS_ALLOWED_ORIGINS", origin.clone()),
        ("CSRF_TRUSTED_ORIGINS", origin),
        ("SSL_CERTIFICATE", format!("{cert_dir}/fullchain.pem")),
        ("SSL_CERTIFICATE_KEY", format!("{cert_dir}/privkey.pem")),
        ("VITE_API_BASE_URL", format!("https://{domain}/api")),
        ("VITE_WS_BASE_URL", format!("wss://{domain}/ws")),
    ]
}

/// Right-hand side of every single-line assignment, as written.
/// Quoted values spanning several lines are skipped and get
/// re-quoted on render.
fn raw_values(content: &str) -> HashMap<String, String> {
    let mut raw = HashMap::new();
    let mut open: Option<char> = None;

    for line in content.lines() {
        if let Some(quote) = open {
            if line.contains(quote) {
                open = None;
            }
            continue;
        }
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").map_or(line, str::trim_start);
        let Some((key, rhs)) = line.split_once('=') else {
            continue;
        };
        let rhs = rhs.trim();
        let unclosed = rhs
            .chars()
            .next()
            .filter(|c| matches!(c, '"' | '\''))
            .filter(|quote| !rhs[1..].contains(*quote));
        if unclosed.is_some() {
            open = unclosed;
            continue;
        }
        raw.insert(key.trim().to_string(), rhs.to_string());
    }
    raw
}

fn quote_value(value: &str) -> String {
    let safe = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "_-./:,@+=".contains(c));
    if safe {
        value.to_string()
    } else if !value.contains('\'') {
        format!("'{value}'")
    } else {
        let escaped = value
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('$', "\\$");
        format!("\"{escaped}\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoting() {
        assert_eq!(quote_value("abc123"), "abc123");
        assert_eq!(quote_value("redis://redis:6379/0"), "redis://redis:6379/0");
        assert_eq!(quote_value("two words"), "'two words'");
        assert_eq!(quote_value("it's"), "\"it's\"");
    }

    #[test]
    fn raw_text_skips_multiline_values() {
        let raw = raw_values("A=\"first\nB=inside\"\nC=$HOME/x\n# D=no\n");

        assert_eq!(raw.get("C").map(String::as_str), Some("$HOME/x"));
        assert!(!raw.contains_key("A"));
        assert!(!raw.contains_key("B"));
        assert!(!raw.contains_key("# D"));
    }

    #[test]
    fn set_keeps_position() {
        let mut env = EnvFile::new();
        env.set("A", "1");
        env.set("B", "2");
        env.set("A", "3");

        assert_eq!(env.keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(env.get("A"), Some("3"));
    }
}
