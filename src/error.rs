pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("command failed: {command}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("SSH connection failed: {0}")]
    SshFailed(String),

    #[error("prerequisite missing: {0}")]
    PrerequisiteMissing(String),

    #[error("unsupported operating system: {0} (Ubuntu is required)")]
    UnsupportedOs(String),

    #[error("must run as root (current uid: {0})")]
    NotRoot(String),

    #[error("invalid domain: '{0}'")]
    InvalidDomain(String),

    #[error("no network connectivity: {0} is unreachable")]
    NoConnectivity(String),

    #[error("compose file not found: {0}")]
    ComposeFileMissing(String),

    #[error("invalid compose file: {0}")]
    ComposeInvalid(String),

    #[error(
        "database volume '{0}' was initialised with a different password \
         than the one in the environment file"
    )]
    PasswordMismatch(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("environment variable missing: {0}")]
    EnvMissing(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Dotenv(#[from] dotenvy::Error),
}

impl DeployError {
    /// Whether this error belongs to the preflight class: an unmet
    /// prerequisite detected before anything was changed.
    #[must_use]
    pub const fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedOs(_)
                | Self::NotRoot(_)
                | Self::InvalidDomain(_)
                | Self::NoConnectivity(_)
                | Self::ComposeFileMissing(_)
                | Self::ComposeInvalid(_)
        )
    }

    /// Captured stderr of a failed command, empty for every other
    /// variant.
    #[must_use]
    pub fn stderr(&self) -> &str {
        match self {
            Self::CommandFailed { stderr, .. } => stderr,
            _ => "",
        }
    }
}
