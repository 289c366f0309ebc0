mod agent;
mod console;
mod error;
mod image;
mod logging;
mod protocol;
mod sdk;
mod server;
mod session;
mod tools;
mod translator;
mod transport;

use agent::{Agent, PermissionMode};
use clap::{Args, Parser, Subcommand};
use session::SessionStore;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use translator::RelayContext;

#[derive(Debug, Parser)]
#[command(name = "agentstream", about = "Relay agent progress to a console or a browser")]
struct Cli {
    #[command(flatten)]
    agent: AgentArgs,

    /// Emit logs as JSON lines.
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct AgentArgs {
    /// Path to the `claude` executable.
    #[arg(long, env = "CLAUDE_BIN", default_value = "claude", global = true)]
    claude_bin: PathBuf,

    /// Tools the agent may use without asking.
    #[arg(
        long,
        env = "ALLOWED_TOOLS",
        value_delimiter = ',',
        default_value = "Read,Edit,Glob,Grep,Bash",
        global = true
    )]
    allowed_tools: Vec<String>,

    #[arg(
        long,
        env = "PERMISSION_MODE",
        value_enum,
        default_value_t = PermissionMode::AcceptEdits,
        global = true
    )]
    permission_mode: PermissionMode,

    /// Working directory for the agent.
    #[arg(long, env = "AGENT_CWD", global = true)]
    cwd: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the browser page and the SSE endpoint.
    Serve {
        #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
        host: IpAddr,

        #[arg(short, long, env = "PORT", default_value_t = 3000)]
        port: u16,
    },
    /// Run one prompt and print events as JSON lines.
    Run {
        #[arg(default_value = console::DEFAULT_PROMPT)]
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init(cli.log_json);

    let ctx = RelayContext {
        agent: Arc::new(Agent::new(cli.agent.claude_bin, cli.agent.cwd)),
        sessions: Arc::new(SessionStore::new()),
        allowed_tools: cli.agent.allowed_tools,
        permission_mode: cli.agent.permission_mode,
    };

    match cli.command {
        Command::Serve { host, port } => {
            let config = server::ServerConfig {
                listen: SocketAddr::new(host, port),
            };
            server::run(config, ctx).await
        }
        Command::Run { prompt } => {
            console::run(ctx, prompt, std::io::stdout().lock()).await?;
            Ok(())
        }
    }
}
