// Path: crates/node/src/bin/strata-node.rs
#![forbid(unsafe_code)]

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use strata_node::home::{Home, InitOptions};
use strata_node::replay::{build_app, BlockFile, Replayer};
use strata_telemetry::http::Readiness;
use strata_telemetry::init::LogFormat;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[clap(name = "strata-node", version, about = "Strata application node")]
struct Opts {
    /// Node home directory holding config, genesis, key and data.
    #[clap(long, env = "STRATA_HOME", default_value = ".strata")]
    home: PathBuf,
    #[clap(long, value_enum, default_value = "text")]
    log_format: Format,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a config, a genesis file naming this node as sole validator, and a key.
    Init {
        #[clap(long)]
        chain_id: String,
        #[clap(long)]
        gas: bool,
        #[clap(long, default_value_t = 10)]
        power: u64,
        /// Genesis balance as <hex identity>=<amount>; repeatable.
        #[clap(long = "alloc")]
        allocations: Vec<String>,
        #[clap(long)]
        snapshots: bool,
    },
    /// Print the last committed height and app hash.
    Info,
    /// Drive a local single-validator chain from a JSON file of blocks.
    Replay {
        #[clap(long)]
        blocks: PathBuf,
        /// Serve /metrics, /healthz and /readyz on the configured telemetry address.
        #[clap(long)]
        metrics: bool,
    },
}

fn parse_allocation(s: &str) -> Result<(String, String)> {
    let (identity, amount) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("allocation '{}' is not <hex identity>=<amount>", s))?;
    Ok((identity.trim().to_string(), amount.trim().to_string()))
}

fn install_metrics() -> Result<()> {
    let sink = strata_telemetry::prometheus::install()?;
    strata_telemetry::sinks::SINK
        .set(sink)
        .map_err(|_| anyhow!("metrics sink already installed"))
}

async fn replay(home: Home, blocks: PathBuf, metrics: bool) -> Result<()> {
    let loaded = home.load()?;
    let file = BlockFile::load(&blocks)?;
    let app = Arc::new(build_app(&loaded, home.open_store(&loaded.config)?)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ready = Readiness::default();
    let server = if metrics {
        install_metrics()?;
        let addr: SocketAddr = loaded
            .config
            .telemetry_addr
            .parse()
            .with_context(|| format!("telemetry address '{}'", loaded.config.telemetry_addr))?;
        Some(tokio::spawn(strata_telemetry::http::run_server(
            addr,
            ready.clone(),
            shutdown_rx,
        )))
    } else {
        None
    };

    let interrupt = {
        let app = Arc::clone(&app);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!(target: "node", event = "shutdown", reason = "ctrl-c");
                app.request_shutdown();
            }
        })
    };

    ready.set(true);
    let result = Replayer::new(&app, &loaded).run(&loaded, &file).await;
    ready.set(false);
    interrupt.abort();
    let _ = shutdown_tx.send(true);
    if let Some(server) = server {
        server.await??;
    }

    let reports = result?;
    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Opts::parse();
    let format = match opts.log_format {
        Format::Json => LogFormat::Json,
        Format::Text => LogFormat::Text,
    };
    strata_telemetry::init::init_tracing(format, "info")?;
    let home = Home::new(opts.home);

    match opts.command {
        Command::Init {
            chain_id,
            gas,
            power,
            allocations,
            snapshots,
        } => {
            let allocations = allocations
                .iter()
                .map(|s| parse_allocation(s))
                .collect::<Result<Vec<_>>>()?;
            let key = home.init(&InitOptions {
                chain_id,
                gas_enabled: gas,
                power,
                allocations,
                snapshots,
            })?;
            println!("{}", hex::encode(key.public_key()));
        }
        Command::Info => {
            let info = home.info()?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Replay { blocks, metrics } => replay(home, blocks, metrics).await?,
    }
    Ok(())
}
