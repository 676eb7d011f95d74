use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::Parser;
use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use triad::{
    chord::types::NodeId,
    config::NodeConfig,
    error::TriadError,
    logging,
    network::node::ChordPeer,
    shell::{self, ShellCommand},
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "triad")]
#[command(about = "A Chord ring node whose identifier is its IPv4 address")]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Address to listen on; the node's ring identifier is derived from it
    #[arg(short = 'a', long = "address")]
    address: Option<Ipv4Addr>,

    /// RPC port shared by every node in the ring
    #[arg(short = 'p', long = "port")]
    port: Option<u16>,

    /// Join the ring this node belongs to before reading commands
    #[arg(short = 'j', long = "join")]
    join: Option<NodeId>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(short = 'l', long = "log-level")]
    log_level: Option<String>,
}

impl Cli {
    fn node_config(&self) -> Result<NodeConfig, TriadError> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::read_fs(path)?,
            None => NodeConfig::default(),
        };
        if let Some(address) = self.address {
            config.address = address;
        }
        if let Some(port) = self.port {
            config.rpc_port = port;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();
    run(cli).await.map_err(|e| {
        error!("{}", e);
        e.to_string()
    })
}

async fn run(cli: Cli) -> Result<(), TriadError> {
    let config = cli.node_config()?;
    logging::init(&config.log_level, config.log_file.as_deref())?;

    let mut peer = ChordPeer::new(&config).await;
    peer.start_rpc_server().await?;
    info!(
        "Node {} ({}) is listening on {}",
        peer.node_id(),
        peer.address(),
        peer.bind_addr()
    );

    if let Some(contact) = cli.join {
        run_command(&peer, ShellCommand::Join { address: contact }).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        info!("Input closed");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read command: {}", e);
                        break;
                    }
                };
                match shell::parse(&line) {
                    Ok(None) => {}
                    Ok(Some(ShellCommand::Quit)) => break,
                    Ok(Some(command)) => run_command(&peer, command).await,
                    Err(e) => println!("{}", e.render()),
                }
                if peer.is_stopped() {
                    warn!("RPC server stopped, exiting");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    peer.quit().await?;
    info!("Node shut down gracefully");
    Ok(())
}

async fn run_command(peer: &ChordPeer, command: ShellCommand) {
    match shell::execute(peer.service(), &command).await {
        Ok(reply) => println!("{}", reply),
        Err(e) => println!("error: {}", e),
    }
}
