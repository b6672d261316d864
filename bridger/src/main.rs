use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
    time::Duration,
};

use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::{Bytes, U256},
    providers::{Provider, ProviderBuilder},
    transports::Transport,
};
use chain::{ChainProfile, Config, RouteProfile};
use clap::Parser;
use indexer::Indexer;
use order::FungibleAssetOrder;
use prompt::Amount;
use reqwest::Url;
use submitter::{SendParams, Submission, Submitter};
use tracing_subscriber::EnvFilter;
use wallet::WalletCredential;

mod bindings;
mod chain;
mod console;
mod error;
mod funds;
mod indexer;
mod order;
mod prompt;
#[cfg(test)]
mod rpc_mock;
mod submitter;
mod wallet;

const RPC_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Repeats UCS03 bridge transfers for every wallet in `PRIVATE_KEY_<n>`.
///
/// Options left out are asked for interactively.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Chain table to use instead of the built-in one.
    #[arg(long, env = "BRIDGER_CONFIG")]
    config: Option<PathBuf>,
    /// Route key, e.g. `sepolia-holesky`.
    #[arg(long, env = "BRIDGER_ROUTE")]
    route: Option<String>,
    /// Transactions per wallet.
    #[arg(long, env = "BRIDGER_COUNT")]
    count: Option<u32>,
    /// Amount per transaction, in whole tokens.
    #[arg(long, env = "BRIDGER_AMOUNT")]
    amount: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Tally {
    confirmed: u32,
    failed: u32,
    unconfirmed: u32,
    skipped: u32,
}

impl Tally {
    /// A wallet that failed before its first transfer skips all of them.
    fn aborted(count: u32) -> Self {
        Tally {
            skipped: count,
            ..Default::default()
        }
    }
}

enum Outcome {
    Confirmed,
    Failed,
    Unconfirmed,
    /// Balance too low; the remaining transfers for this wallet are skipped.
    OutOfFunds,
}

/// Everything fixed for the whole run.
struct Run<'a> {
    config: &'a Config,
    route: &'a RouteProfile,
    source: &'a ChainProfile,
    destination: &'a ChainProfile,
    count: u32,
    amount: Amount,
    priority_fee: u128,
    indexer: Indexer,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let args = Args::parse();
    console::banner();

    let config = Config::load(args.config.as_deref())?;
    let wallets = wallet::load_wallets(|key| std::env::var(key).ok());
    if wallets.is_empty() {
        eyre::bail!("no valid PRIVATE_KEY_<n> found in the environment");
    }
    console::info(&format!("Loaded {} wallet(s)", wallets.len()));

    let (route, count, amount) = {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();
        read_run_options(&args, &config, &mut input, &mut output)?
    };
    let (source, destination) = config.endpoints(route)?;

    let run = Run {
        config: &config,
        route,
        source,
        destination,
        count,
        amount,
        priority_fee: config.bridge.priority_fee()?,
        indexer: Indexer::new(
            config.bridge.graphql_endpoint.clone(),
            config.bridge.indexer_attempts,
            Duration::from_secs(config.bridge.indexer_interval_secs),
            Duration::from_secs(config.bridge.indexer_request_timeout_secs),
        )?,
    };
    console::info(&format!(
        "{}: {} x {} {} per wallet",
        route.label, count, run.amount.display, route.asset.symbol
    ));

    let mut results = Vec::with_capacity(wallets.len());
    for wallet in &wallets {
        console::section(&format!("Wallet {}: {}", wallet.index, wallet.address()));
        let tally = match run_wallet(&run, wallet).await {
            Ok(tally) => tally,
            Err(e) => {
                console::error(&format!("Wallet {} aborted: {e:#}", wallet.index));
                Tally::aborted(count)
            }
        };
        results.push((wallet, tally));
    }

    console::section("Summary");
    for (wallet, tally) in results {
        console::info(&format!(
            "Wallet {} ({}): {} confirmed, {} failed, {} unconfirmed, {} skipped",
            wallet.index,
            wallet.address(),
            tally.confirmed,
            tally.failed,
            tally.unconfirmed,
            tally.skipped
        ));
    }
    console::success("All wallets processed");

    Ok(())
}

/// Route, count and amount from the command line, prompting for what is missing.
fn read_run_options<'a, R, W>(
    args: &Args,
    config: &'a Config,
    input: &mut R,
    output: &mut W,
) -> eyre::Result<(&'a RouteProfile, u32, Amount)>
where
    R: BufRead,
    W: Write,
{
    let route = match &args.route {
        Some(key) => prompt::route_by_key(config, key)?,
        None => prompt::select_route(input, output, &config.routes)?,
    };
    let count = match args.count {
        Some(0) => eyre::bail!("--count must be greater than zero"),
        Some(n) => n,
        None => prompt::read_count(input, output)?,
    };
    let amount = match &args.amount {
        Some(raw) => prompt::parse_amount(raw, route.asset.decimals)?,
        None => prompt::read_amount(input, output, route)?,
    };
    Ok((route, count, amount))
}

/// First endpoint in `urls` that answers with the expected chain id.
async fn select_rpc(urls: &[String], chain_id: u64) -> eyre::Result<Url> {
    for raw in urls {
        let url: Url = match raw.parse() {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(url = %raw, error = %e, "skipping malformed rpc url");
                continue;
            }
        };
        let provider = ProviderBuilder::new().on_http(url.clone());
        match tokio::time::timeout(RPC_PROBE_TIMEOUT, provider.get_chain_id()).await {
            Ok(Ok(id)) if id == chain_id => {
                tracing::info!(url = %raw, chain_id, "using rpc endpoint");
                return Ok(url);
            }
            Ok(Ok(id)) => {
                tracing::warn!(url = %raw, expected = chain_id, got = id, "rpc on wrong chain")
            }
            Ok(Err(e)) => tracing::warn!(url = %raw, error = %e, "rpc unreachable"),
            Err(_) => tracing::warn!(url = %raw, "rpc probe timed out"),
        }
    }
    eyre::bail!("no reachable rpc endpoint for chain {chain_id}")
}

async fn run_wallet(run: &Run<'_>, wallet: &WalletCredential) -> eyre::Result<Tally> {
    let receiver = wallet::receiver_for(run.destination, wallet, |key| std::env::var(key).ok())?;
    let chain_id = run
        .source
        .chain_id
        .ok_or_else(|| eyre::eyre!("{} has no chain id", run.source.name))?;

    console::loading(&format!("Connecting to {}...", run.source.name));
    let url = select_rpc(&run.source.rpc_urls, chain_id).await?;
    let provider = ProviderBuilder::new()
        .with_recommended_fillers()
        .wallet(EthereumWallet::from(wallet.signer.clone()))
        .on_http(url);

    Ok(run_transfers(&provider, run, wallet, &receiver).await)
}

async fn run_transfers<P, T>(
    provider: &P,
    run: &Run<'_>,
    wallet: &WalletCredential,
    receiver: &Bytes,
) -> Tally
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    let mut tally = Tally::default();
    for i in 1..=run.count {
        console::step(&format!(
            "Transaction {i}/{}: {} {} via {}",
            run.count, run.amount.display, run.route.asset.symbol, run.route.label
        ));
        match transfer_once(provider, run, wallet, receiver).await {
            Ok(Outcome::Confirmed) => tally.confirmed += 1,
            Ok(Outcome::Unconfirmed) => tally.unconfirmed += 1,
            Ok(Outcome::Failed) => tally.failed += 1,
            Ok(Outcome::OutOfFunds) => {
                tally.skipped += run.count - i + 1;
                break;
            }
            Err(e) => {
                console::error(&format!("Transaction {i} failed: {e:#}"));
                tally.failed += 1;
            }
        }
        if i < run.count {
            console::countdown(run.config.bridge.tx_delay_secs).await;
        }
    }
    tally
}

async fn transfer_once<P, T>(
    provider: &P,
    run: &Run<'_>,
    wallet: &WalletCredential,
    receiver: &Bytes,
) -> eyre::Result<Outcome>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    let bridge = &run.config.bridge;
    let sender = wallet.address();
    let amount: U256 = run.amount.raw;

    if !funds::ensure_funds(provider, sender, run.route, bridge.contract, amount).await? {
        return Ok(Outcome::OutOfFunds);
    }

    let order = FungibleAssetOrder::for_route(
        run.route,
        run.destination,
        sender,
        receiver.clone(),
        amount,
    )?;
    let now = chrono::Utc::now();
    let now_ns = now
        .timestamp_nanos_opt()
        .ok_or_else(|| eyre::eyre!("system clock out of range"))?;
    let params = SendParams::for_route(
        run.route,
        amount,
        order::timeout_timestamp(now_ns as u64, bridge.timeout_window_secs),
        order::salt(sender, now.timestamp_millis() as u64),
    );

    let submitter = Submitter::new(
        provider,
        &bridge.contract,
        sender,
        run.priority_fee,
        Duration::from_secs(bridge.confirmation_timeout_secs),
    );
    console::loading("Submitting bridge transaction...");
    let submission = submitter.submit((&order).into(), params).await?;
    let link = console::tx_link(run.source, &submission.hash());

    match submission {
        Submission::Confirmed { block, .. } => {
            let block = block.map(|b| format!(" in block {b}")).unwrap_or_default();
            console::success(&format!("Confirmed{block}: {link}"));
        }
        Submission::Reverted { .. } => {
            console::error(&format!("Reverted: {link}"));
            return Ok(Outcome::Failed);
        }
        Submission::TimedOut { hash } => {
            console::warn(
                &error::BridgeError::ConfirmationTimeout(hash, bridge.confirmation_timeout_secs)
                    .to_string(),
            );
            console::warn(&format!("Still pending, not resubmitting: {link}"));
            return Ok(Outcome::Unconfirmed);
        }
    }

    console::loading("Waiting for the indexer to pick up the packet...");
    match run.indexer.packet_hash(submission.hash()).await? {
        Some(packet) => console::success(&format!(
            "Packet {packet}: {}",
            console::packet_link(bridge, &packet)
        )),
        None => console::warn(&format!(
            "Packet hash not indexed after {} attempts",
            bridge.indexer_attempts
        )),
    }
    Ok(Outcome::Confirmed)
}
