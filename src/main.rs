//! nestkv binary
//!
//! Runs an interactive console session on stdin/stdout, or a TCP server when
//! a listen address is given.

use clap::{Parser, ValueEnum};
use nestkv::{run_session, CommitPolicy, Config, NestKvServer, OutputMode, Result, Session};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::{io::BufReader, signal, sync::broadcast};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// In-memory key-value store with nested transactions
#[derive(Parser, Debug)]
#[command(name = "nestkv", version)]
struct Args {
    /// Serve over TCP on this address instead of the console
    #[arg(short, long, env = "NESTKV_LISTEN")]
    listen: Option<String>,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE", env = "NESTKV_CONFIG")]
    config: Option<PathBuf>,

    /// How COMMIT folds nested transactions
    #[arg(long, value_enum)]
    commit_policy: Option<CommitPolicyArg>,

    /// Maximum concurrent TCP clients
    #[arg(long)]
    max_connections: Option<usize>,

    /// Suppress the console prompt (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CommitPolicyArg {
    Collapse,
    Cascade,
}

impl From<CommitPolicyArg> for CommitPolicy {
    fn from(arg: CommitPolicyArg) -> Self {
        match arg {
            CommitPolicyArg::Collapse => CommitPolicy::CollapseToRoot,
            CommitPolicyArg::Cascade => CommitPolicy::Cascade,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(&args)?;

    match config.listen_addr.clone() {
        Some(_) => {
            let server = Arc::new(NestKvServer::new(config)?);

            let server_clone = Arc::clone(&server);
            tokio::spawn(async move {
                if let Err(e) = signal::ctrl_c().await {
                    error!(error = %e, "failed to listen for Ctrl+C");
                    return;
                }
                info!("received Ctrl+C, initiating graceful shutdown");
                if let Err(e) = server_clone.shutdown() {
                    error!(error = %e, "failed to initiate shutdown");
                }
            });

            server.run().await?;
        }
        None => {
            // No Ctrl+C handler here: stdin reads block a runtime thread, so
            // SIGINT must keep its default action to end the process.
            let (shutdown_tx, _) = broadcast::channel(1);
            let prompt = (!args.quiet).then_some(config.prompt.as_str());
            let mut session = Session::with_policy(config.commit_policy);
            run_session(
                &mut session,
                BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
                OutputMode::Console,
                prompt,
                shutdown_tx.subscribe(),
            )
            .await?;
        }
    }

    Ok(())
}

/// Configuration file first, then command-line overrides
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(addr) = &args.listen {
        config.listen_addr = Some(addr.clone());
    }
    if let Some(policy) = args.commit_policy {
        config.commit_policy = policy.into();
    }
    if let Some(max) = args.max_connections {
        config.max_connections = max;
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "nestkv=debug" } else { "nestkv=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
