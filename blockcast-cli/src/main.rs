mod app;
mod commands;
mod config;

use app::App;
use blockcast_core::BlockcastError;
use blockcast_protocol::PredictionError;
use clap::{Parser, Subcommand};
use config::{CliConfig, Overrides};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "blockcast")]
#[command(about = "Blockcast - predict EVM block hashes with commit and reveal")]
#[command(version)]
struct Cli {
    /// Data directory for the config file and prediction journal
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Network config file (defaults to <data-dir>/network.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// RPC endpoint, overrides the config file
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    /// Predictor contract address, overrides the config file
    #[arg(long, global = true)]
    contract: Option<String>,

    /// Hex private key used to sign transactions
    #[arg(long, global = true, env = "BLOCKCAST_PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Block commands
    #[command(subcommand)]
    Block(commands::BlockCommands),

    /// Network configuration commands
    #[command(subcommand)]
    Network(commands::NetworkCommands),

    /// Show the candidate hashes for the next block
    Candidates {
        /// Derive from this block instead of the latest one
        #[arg(short, long)]
        block: Option<u64>,
    },

    /// Commit a prediction for the next block
    Submit {
        /// Predicted hash as 0x-prefixed hex
        #[arg(conflicts_with = "candidate")]
        hash: Option<String>,

        /// Use candidate N from the current block
        #[arg(long)]
        candidate: Option<usize>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Return once the transaction is sent
        #[arg(long)]
        no_wait: bool,
    },

    /// Reveal a prediction once its target block is mined
    Reveal {
        /// Target block of the prediction
        target_block: u64,
    },

    /// Show the on-chain state of a prediction
    Status {
        /// Target block of the prediction
        target_block: u64,

        /// Predictor address (defaults to your account)
        #[arg(long)]
        predictor: Option<String>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List predictions from the local journal
    List {
        /// Only predictions that still need a reveal
        #[arg(long)]
        pending: bool,
    },

    /// Stream prediction events from the contract
    Events {
        /// First block to scan (defaults to the next block)
        #[arg(long)]
        from_block: Option<u64>,

        /// Only events for your account
        #[arg(long)]
        mine: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "blockcast={lvl},blockcast_core={lvl},blockcast_protocol={lvl}",
            lvl = log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(cli).await {
        report(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let data_dir = cli.data_dir.unwrap_or_else(CliConfig::default_data_dir);
    let config = CliConfig::load(
        data_dir,
        cli.config.as_deref(),
        Overrides {
            rpc_url: cli.rpc_url,
            contract: cli.contract,
        },
    )?;
    tracing::debug!(
        "Using {} (chain {}) at {}",
        config.network.name,
        config.network.chain_id,
        config.network.rpc_url
    );

    let app = App::new(config, cli.private_key.as_deref()).await?;

    match cli.command {
        Commands::Block(cmd) => commands::handle_block_command(cmd, &app).await,
        Commands::Network(cmd) => commands::handle_network_command(cmd, &app).await,
        Commands::Candidates { block } => commands::show_candidates(&app, block).await,
        Commands::Submit {
            hash,
            candidate,
            yes,
            no_wait,
        } => commands::submit_prediction(&app, hash, candidate, yes, no_wait).await,
        Commands::Reveal { target_block } => {
            commands::reveal_prediction(&app, target_block).await
        }
        Commands::Status {
            target_block,
            predictor,
            json,
        } => commands::show_status(&app, target_block, predictor, json).await,
        Commands::List { pending } => commands::list_predictions(&app, pending).await,
        Commands::Events { from_block, mine } => {
            commands::watch_events(&app, from_block, mine).await
        }
    }
}

fn report(e: &anyhow::Error) {
    if let Some(err) = e.downcast_ref::<PredictionError>() {
        match err {
            PredictionError::NoSigner => {
                eprintln!("Error: {}", err);
                eprintln!("Pass --private-key or set BLOCKCAST_PRIVATE_KEY");
            }
            PredictionError::WrongChain { expected, actual } => {
                eprintln!("Error: {}", err);
                eprintln!(
                    "The RPC endpoint serves chain {}; fix --rpc-url or the config for chain {}",
                    actual, expected
                );
            }
            PredictionError::TargetNotMined {
                target_block,
                current,
            } => {
                eprintln!("Error: {}", err);
                eprintln!(
                    "Wait {} more block(s), then run 'blockcast reveal {}'",
                    target_block - current,
                    target_block
                );
            }
            PredictionError::RevealWindowExpired { .. } => {
                eprintln!("Error: {}", err);
                eprintln!("Block hashes older than the reveal window can no longer be checked");
            }
            PredictionError::ConfirmationTimeout(tx_hash) => {
                eprintln!("Error: {}", err);
                eprintln!(
                    "The transaction may still confirm; check it with 'blockcast status' ({:?})",
                    tx_hash
                );
            }
            _ => eprintln!("Error: {}", err),
        }
        return;
    }

    match e.downcast_ref::<BlockcastError>() {
        Some(BlockcastError::UnavailableChain(msg)) => {
            eprintln!("Error: Chain unavailable: {}", msg);
            eprintln!("Check the RPC endpoint with 'blockcast network info'");
        }
        Some(BlockcastError::Config(msg)) => {
            eprintln!("Error: Invalid configuration: {}", msg);
            eprintln!("Run 'blockcast network init' to write a config file to edit");
        }
        _ => eprintln!("Error: {:#}", e),
    }
}
