/// Shared error type used across all recon crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tool unavailable: {0}")]
    ToolUnavailable(String),

    #[error("tool timeout after {0}s")]
    ToolTimeout(u64),

    #[error("parse failure in {tool}: {message}")]
    ParseFailure { tool: String, message: String },

    #[error("tool {tool} exited with status {code:?}: {stderr}")]
    ToolExit {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("registry: no tool named {0}")]
    RegistryMiss(String),

    #[error("persistence: {0}")]
    Persistence(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
