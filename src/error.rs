use thiserror::Error;

/// Every failure surfaced to the operator. Each variant maps to one line of
/// output and one exit code.
#[derive(Debug, Error)]
pub enum AppError {
    /// Wrong positional count or missing required configuration.
    #[error("{0}")]
    Usage(String),

    /// The configuration file could not be read, decoded or written.
    #[error("{0:#}")]
    Config(anyhow::Error),

    /// The `@file` named by `-d` could not be opened.
    #[error("Invalid data: data='{specifier}', {cause:#}")]
    Body {
        specifier: String,
        cause: anyhow::Error,
    },

    /// Malformed URL or method.
    #[error("{0:#}")]
    Request(anyhow::Error),

    /// DNS, connect, TLS, timeout or truncated body.
    #[error("{0:#}")]
    Transport(anyhow::Error),

    #[error("'{cause}' Result not a JSON => {raw}")]
    NotJson {
        cause: serde_json::Error,
        raw: String,
    },

    /// Writing the rendered response failed.
    #[error("{0:#}")]
    Output(anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    pub fn request(error: impl Into<anyhow::Error>) -> Self {
        Self::Request(error.into())
    }

    pub fn transport(error: impl Into<anyhow::Error>) -> Self {
        Self::Transport(error.into())
    }

    /// Errors the operator fixes by changing the invocation; these are
    /// reported together with the usage text.
    pub const fn shows_usage(&self) -> bool {
        matches!(self, Self::Usage(_) | Self::Config(_) | Self::Body { .. })
    }

    pub const fn exit_code(&self) -> i32 {
        if self.shows_usage() { 2 } else { 1 }
    }
}
