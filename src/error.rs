use std::process::ExitStatus;

use thiserror::Error;

/// Failures raised while pulling messages from the agent service.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("failed to start `{bin}`: {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read agent output: {0}")]
    Io(#[from] std::io::Error),
    #[error("agent exited with {status}: {stderr}")]
    Exited { status: ExitStatus, stderr: String },
    #[error("agent output ended before a result message")]
    Incomplete,
    #[error("{0}")]
    Service(String),
}
