use crate::app::App;
use crate::commands::print_snapshot;
use anyhow::Result;
use blockcast_core::types::format_address;
use blockcast_core::{BlockPoller, ChainReader};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum BlockCommands {
    /// Show the latest block
    Show {
        /// Block number (defaults to the latest block)
        number: Option<u64>,
    },
    /// Print each new block until interrupted
    Watch,
}

#[derive(Subcommand)]
pub enum NetworkCommands {
    /// Show configured and connected network
    Info,
    /// Write the current network settings to the data directory
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

pub async fn handle_block_command(cmd: BlockCommands, app: &App) -> Result<()> {
    match cmd {
        BlockCommands::Show { number } => {
            let snapshot = match number {
                Some(n) => app.reader.block_by_number(n).await?,
                None => app.reader.current_block().await?,
            };

            println!("Block on {}:", app.network().name);
            print_snapshot(&snapshot);
            if number.is_none() {
                println!("  Next target: {}", snapshot.next_target());
            }
        }

        BlockCommands::Watch => {
            let mut poller =
                BlockPoller::new(app.reader.clone(), app.network().poll_interval()).spawn();
            println!(
                "Watching {} every {}s (Ctrl+C to stop)",
                app.network().name,
                app.network().poll_interval_secs
            );

            loop {
                tokio::select! {
                    snapshot = poller.next() => match snapshot {
                        Some(snapshot) => {
                            println!();
                            print_snapshot(&snapshot);
                        }
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => break,
                }
            }

            poller.shutdown().await;
        }
    }

    Ok(())
}

pub async fn handle_network_command(cmd: NetworkCommands, app: &App) -> Result<()> {
    match cmd {
        NetworkCommands::Info => {
            let network = app.network();
            println!("Network: {}", network.name);
            println!("  Chain ID: {}", network.chain_id);
            println!("  RPC: {}", network.rpc_url);
            if let Some(explorer) = &network.explorer_url {
                println!("  Explorer: {}", explorer);
            }
            match network.contract_address {
                Some(address) => println!("  Contract: {}", format_address(&address)),
                None => println!("  Contract: not configured"),
            }
            println!("  Reveal window: {} blocks", network.reveal_window);

            match app.reader.chain_id().await {
                Ok(connected) if connected == network.chain_id => {
                    println!("  Connected: yes");
                }
                Ok(connected) => {
                    println!(
                        "  Connected: WRONG CHAIN (node reports chain id {})",
                        connected
                    );
                }
                Err(e) => println!("  Connected: no ({})", e),
            }

            match app.account() {
                Some(account) => println!("  Account: {}", format_address(&account)),
                None => println!("  Account: none (read-only)"),
            }
        }

        NetworkCommands::Init { force } => {
            let path = app.config.network_path();
            if path.exists() && !force {
                println!("{} already exists (use --force to overwrite)", path.display());
                return Ok(());
            }
            app.network().save(&path)?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}
