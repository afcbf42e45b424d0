use rand::Rng;
use rand::distr::Alphanumeric;

use crate::env_file::EnvFile;

pub const SECRET_KEY_LEN: usize = 50;
pub const DB_PASSWORD_LEN: usize = 32;
pub const ADMIN_PASSWORD_LEN: usize = 16;

/// Where a resolved secret came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Taken from the existing environment file.
    Reused,
    /// Freshly generated because none was configured.
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secret {
    pub value: String,
    pub origin: Origin,
}

impl Secret {
    #[must_use]
    pub const fn is_reused(&self) -> bool {
        matches!(self.origin, Origin::Reused)
    }
}

/// The secrets a deployment writes into its environment file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secrets {
    pub secret_key: Secret,
    pub db_password: Secret,
}

/// Generate `len` random ASCII alphanumeric characters.
#[must_use]
pub fn generate(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Reuse configured secrets from `existing`, generating whatever
/// is missing or still a placeholder.
#[must_use]
pub fn resolve(existing: Option<&EnvFile>) -> Secrets {
    Secrets {
        secret_key: reuse_or_generate(existing, &["SECRET_KEY"], SECRET_KEY_LEN),
        db_password: reuse_or_generate(
            existing,
            &["DB_PASSWORD", "POSTGRES_PASSWORD"],
            DB_PASSWORD_LEN,
        ),
    }
}

fn reuse_or_generate(existing: Option<&EnvFile>, keys: &[&str], len: usize) -> Secret {
    match existing.and_then(|env| env.configured(keys)) {
        Some(value) => Secret {
            value: value.to_string(),
            origin: Origin::Reused,
        },
        None => Secret {
            value: generate(len),
            origin: Origin::Generated,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_values_differ() {
        assert_ne!(generate(32), generate(32));
    }

    #[test]
    fn generate_zero_is_empty() {
        assert_eq!(generate(0), "");
    }
}
