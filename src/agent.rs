use crate::error::AgentError;
use crate::sdk::{AgentMessage, parse_line};
use clap::ValueEnum;
use futures::stream::{self, BoxStream, StreamExt};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, info, warn};

/// How the agent treats tool permission prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PermissionMode {
    #[value(name = "default")]
    Default,
    #[default]
    #[value(name = "acceptEdits")]
    AcceptEdits,
    #[value(name = "bypassPermissions")]
    BypassPermissions,
    #[value(name = "plan")]
    Plan,
}

impl PermissionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            PermissionMode::Default => "default",
            PermissionMode::AcceptEdits => "acceptEdits",
            PermissionMode::BypassPermissions => "bypassPermissions",
            PermissionMode::Plan => "plan",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub allowed_tools: Vec<String>,
    pub permission_mode: PermissionMode,
    pub resume: Option<String>,
}

pub type MessageStream = BoxStream<'static, Result<AgentMessage, AgentError>>;

/// An agent-execution service that turns a prompt into a lazy message stream.
///
/// Dropping the returned stream must stop the underlying work.
pub trait AgentService: Send + Sync {
    fn query(&self, prompt: String, options: QueryOptions) -> MessageStream;
}

/// Runs the `claude` CLI in headless `stream-json` mode.
pub struct Agent {
    claude_bin: PathBuf,
    working_directory: Option<PathBuf>,
}

impl Agent {
    pub fn new(claude_bin: PathBuf, working_directory: Option<PathBuf>) -> Self {
        Self {
            claude_bin,
            working_directory,
        }
    }

    fn command(&self, prompt: &str, options: &QueryOptions) -> Command {
        let mut cmd = Command::new(&self.claude_bin);
        cmd.arg("-p")
            .arg(prompt)
            .arg("--output-format")
            .arg("stream-json")
            .arg("--verbose")
            .arg("--permission-mode")
            .arg(options.permission_mode.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if !options.allowed_tools.is_empty() {
            cmd.arg("--allowedTools").arg(options.allowed_tools.join(","));
        }
        if let Some(session_id) = &options.resume {
            cmd.arg("--resume").arg(session_id);
        }
        if let Some(dir) = &self.working_directory {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn spawn(&self, prompt: &str, options: &QueryOptions) -> Result<Process, AgentError> {
        let mut child = self
            .command(prompt, options)
            .spawn()
            .map_err(|source| AgentError::Spawn {
                bin: self.claude_bin.display().to_string(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::Service("agent stdout was not captured".to_string()))?;

        let stderr = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut buf = String::new();
                if let Err(err) = stderr.read_to_string(&mut buf).await {
                    debug!(error = %err, "failed to read agent stderr");
                }
                buf
            })
        });

        info!(
            pid = child.id(),
            resume = options.resume.as_deref(),
            "spawned agent process"
        );

        Ok(Process {
            lines: LinesStream::new(BufReader::new(stdout).lines()),
            child,
            stderr,
            saw_result: false,
            finished: false,
        })
    }
}

impl AgentService for Agent {
    fn query(&self, prompt: String, options: QueryOptions) -> MessageStream {
        match self.spawn(&prompt, &options) {
            Ok(process) => stream::unfold(process, Process::next_message).boxed(),
            Err(err) => stream::once(async move { Err(err) }).boxed(),
        }
    }
}

struct Process {
    lines: LinesStream<BufReader<ChildStdout>>,
    child: Child,
    stderr: Option<JoinHandle<String>>,
    saw_result: bool,
    finished: bool,
}

impl Process {
    async fn next_message(mut self) -> Option<(Result<AgentMessage, AgentError>, Self)> {
        if self.finished {
            return None;
        }

        while let Some(line) = self.lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    self.finished = true;
                    return Some((Err(err.into()), self));
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(&line) {
                Ok(message) => {
                    if matches!(message, AgentMessage::Result(_)) {
                        self.saw_result = true;
                    }
                    return Some((Ok(message), self));
                }
                Err(err) => warn!(error = %err, "skipping undecodable agent output line"),
            }
        }

        self.finished = true;
        let outcome = self.exit_status().await;
        outcome.map(|err| (Err(err), self))
    }

    async fn exit_status(&mut self) -> Option<AgentError> {
        let status = match self.child.wait().await {
            Ok(status) => status,
            Err(err) => return Some(err.into()),
        };
        let stderr = match self.stderr.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => String::new(),
        };
        debug!(%status, "agent process exited");

        if !status.success() {
            return Some(AgentError::Exited {
                status,
                stderr: stderr_tail(&stderr),
            });
        }
        if !self.saw_result {
            return Some(AgentError::Incomplete);
        }
        None
    }
}

// After a result the process is left to exit on its own; tokio reaps it.
impl Drop for Process {
    fn drop(&mut self) {
        if !self.finished && !self.saw_result {
            debug!(pid = self.child.id(), "agent stream dropped early, stopping process");
            let _ = self.child.start_kill();
        }
    }
}

fn stderr_tail(stderr: &str) -> String {
    const MAX_CHARS: usize = 500;
    let trimmed = stderr.trim();
    let count = trimmed.chars().count();
    if count <= MAX_CHARS {
        return trimmed.to_string();
    }
    trimmed.chars().skip(count - MAX_CHARS).collect()
}
