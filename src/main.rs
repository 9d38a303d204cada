use std::{collections::HashMap, path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use claimer::{ClaimOutcome, ClaimPolicy, ClaimRequest, Claimer, Deployment};
use config::Config;
use contract::{ClaimContract, FvhContract};
use logger::init_default_logger;
use network::{Network, Token};
use wallet::{init_random_provider, HttpProvider, HttpTransport, WalletConnector};

mod claimer;
mod config;
mod constants;
mod contract;
mod display;
mod error;
mod logger;
mod network;
mod session;
mod utils;
mod wallet;

type Contract = FvhContract<HttpProvider, HttpTransport>;

#[derive(Parser, Debug)]
#[command(version, about = "Claim FVH distributions on Botanix and Plume")]
struct Cli {
    /// Config file, defaults to data/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pre-checks and send one claim transaction
    Claim {
        #[arg(long, value_enum)]
        network: Network,
        #[arg(long, value_enum, default_value = "pusd")]
        token: Token,
    },
    /// Show the session and contract state without sending anything
    Status {
        #[arg(long, value_enum)]
        network: Network,
    },
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let _guard = init_default_logger();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::read_from_file(path).await?,
        None => Config::read_default().await?,
    };

    match cli.command {
        Command::Claim { network, token } => claim(&config, ClaimRequest { network, token }).await,
        Command::Status { network } => status(&config, network).await,
    }
}

fn build_deployments(
    config: &Config,
    connector: &WalletConnector<HttpProvider, HttpTransport>,
) -> eyre::Result<HashMap<Network, Deployment<Contract>>> {
    config
        .networks
        .iter()
        .map(|(network, network_config)| {
            let provider = init_random_provider(&network_config.rpc_urls)?;
            let contract = FvhContract::new(
                provider,
                connector.wallet(),
                network_config.claim_contract,
                network.chain_id(),
            );

            Ok((
                *network,
                Deployment::new(Arc::new(contract), network_config.tokens.clone()),
            ))
        })
        .collect()
}

async fn connect(
    config: &Config,
    network: Network,
) -> eyre::Result<WalletConnector<HttpProvider, HttpTransport>> {
    let wallet = utils::read_private_key(&config.private_key_path).await?;
    let provider = init_random_provider(&config.network(network)?.rpc_urls)?;

    let connector = WalletConnector::new(provider, wallet);
    if let Err(e) = connector.connect().await {
        tracing::error!("Failed to connect to {network}: {e}");
    }

    Ok(connector)
}

async fn claim(config: &Config, request: ClaimRequest) -> eyre::Result<()> {
    let connector = Arc::new(connect(config, request.network).await?);
    let claimer = Claimer::new(build_deployments(config, &connector)?, ClaimPolicy::from(config));
    let cancel = CancellationToken::new();

    let watcher = {
        let connector = connector.clone();
        let cancel = cancel.clone();
        let interval = config.chain_poll_interval();
        tokio::spawn(async move { connector.watch_chain(interval, cancel).await })
    };

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Cancel requested");
                cancel.cancel();
            }
        });
    }

    let status_line = display::spawn_status_line(claimer.subscribe());

    let session_rx = connector.subscribe();
    let session = *session_rx.borrow();
    tracing::info!("{}", display::session_summary(&session));
    if let Some(hint) = display::submit_hint(&session, claimer.is_claiming()) {
        tracing::warn!("{hint}");
    }

    let outcome = claimer.attempt_claim(&session_rx, &request, &cancel).await;

    drop(claimer);
    status_line.await?;
    cancel.cancel();
    watcher.await?;
    connector.disconnect();

    tracing::debug!("Claim finished, success: {}", outcome.is_success());
    let outcome_tx_hash = outcome.tx_hash();
    match outcome {
        ClaimOutcome::Success {
            tx_hash,
            block_number,
        } => {
            tracing::info!(
                "Claimed {} in block {}: {}",
                request.token,
                block_number.map_or_else(|| "?".to_string(), |n| n.to_string()),
                request.network.tx_url(tx_hash)
            );
            Ok(())
        }
        ClaimOutcome::Failure(err) => {
            if let Some(tx_hash) = outcome_tx_hash {
                tracing::error!("Transaction: {}", request.network.tx_url(tx_hash));
            }
            eyre::bail!("Claim failed: {err}")
        }
    }
}

async fn status(config: &Config, network: Network) -> eyre::Result<()> {
    let connector = connect(config, network).await?;
    let session = connector.session();
    tracing::info!("{}", display::session_summary(&session));

    let network_config = config.network(network)?;
    let contract: Contract = FvhContract::new(
        init_random_provider(&network_config.rpc_urls)?,
        connector.wallet(),
        network_config.claim_contract,
        network.chain_id(),
    );

    tracing::info!(
        "{network} ({}, native {}) claim contract: {}",
        if network.is_testnet() { "testnet" } else { "mainnet" },
        network.native_symbol(),
        contract.address()
    );

    match contract.is_paused().await {
        Ok(paused) => tracing::info!("Paused: {paused}"),
        Err(e) => tracing::error!("Failed to read pause flag: {e}"),
    }

    for token in Token::ALL {
        let Some(token_address) = network_config.tokens.get(&token) else {
            tracing::info!("{token}: no address on {network}");
            continue;
        };

        match contract.is_token_allowed(*token_address).await {
            Ok(allowed) => tracing::info!("{token} ({token_address}) allowed: {allowed}"),
            Err(e) => tracing::error!("Failed to check {token}: {e}"),
        }
    }

    if let Some(hint) = display::submit_hint(&session, false) {
        tracing::warn!("{hint}");
    }

    Ok(())
}
