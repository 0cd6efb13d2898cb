//! `chain-client` command line.
//!
//! Keys live in memory only, so every command that signs first recovers
//! `--key-name` from `--mnemonic`.

use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use chain_client::config::{load_config, ClientConfig};
use chain_client::observability::{logging, metrics};
use chain_client::{BaseTx, BroadcastMode, ChainClient, Coin, SdkError, TxMsg};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "chain-client")]
#[command(about = "Send and track transactions on an EVM chain", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "mykey")]
    key_name: String,

    #[arg(long, env = "CHAIN_CLIENT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[arg(long, env = "CHAIN_CLIENT_MNEMONIC", hide_env_values = true)]
    mnemonic: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the address of the recovered key
    Address,
    /// Show balance and nonce
    Account {
        /// Defaults to the recovered key's address
        #[arg(long)]
        address: Option<Address>,
    },
    /// Send native tokens
    Transfer {
        to: Address,
        amount: U256,
        #[arg(long, default_value = "")]
        memo: String,
        #[command(flatten)]
        tx: TxArgs,
    },
    /// Call a contract with hex-encoded input
    Call {
        to: Address,
        input: Bytes,
        #[arg(long, default_value = "0")]
        value: U256,
        #[command(flatten)]
        tx: TxArgs,
    },
    /// Deploy hex-encoded contract bytecode
    Deploy {
        code: Bytes,
        #[arg(long, default_value = "0")]
        value: U256,
        #[command(flatten)]
        tx: TxArgs,
    },
    /// Look up a transaction result
    QueryTx { hash: TxHash },
    /// Print new blocks
    Watch {
        #[arg(long, default_value_t = 30)]
        secs: u64,
    },
    /// Recover, query, send, track and watch in one run
    Demo {
        /// Recipient of the demo transfers; defaults to the sender
        #[arg(long)]
        to: Option<Address>,
        #[arg(long, default_value_t = 3)]
        count: u32,
        #[arg(long, default_value = "1")]
        amount: U256,
        #[arg(long, default_value_t = 15)]
        watch_secs: u64,
    },
}

#[derive(Args, Clone)]
struct TxArgs {
    #[arg(long)]
    gas: Option<u64>,
    /// Total fee, e.g. `420000wei`
    #[arg(long)]
    fee: Option<Coin>,
    /// async, sync or commit
    #[arg(long)]
    mode: Option<BroadcastMode>,
}

impl TxArgs {
    fn apply(self, mut base: BaseTx) -> BaseTx {
        base.gas = self.gas;
        base.fee = self.fee;
        base.mode = self.mode;
        base
    }
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "chain-client starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let client = ChainClient::new(config).await?;
    let result = run(&cli, &client).await;
    client.shutdown().await;
    result
}

async fn run(cli: &Cli, client: &ChainClient) -> CliResult<()> {
    match &cli.command {
        Commands::Address => {
            println!("{}", recover(cli, client)?);
        }
        Commands::Account { address } => {
            let address = match address {
                Some(address) => *address,
                None => recover(cli, client)?,
            };
            print_json(&client.query_account(address).await?)?;
        }
        Commands::Transfer { to, amount, memo, tx } => {
            let msg = TxMsg::Transfer { to: *to, amount: *amount };
            submit(cli, client, msg, |base| tx.clone().apply(base.with_memo(memo.as_str()))).await?;
        }
        Commands::Call { to, input, value, tx } => {
            let msg = TxMsg::Call { to: *to, value: *value, input: input.clone() };
            submit(cli, client, msg, |base| tx.clone().apply(base)).await?;
        }
        Commands::Deploy { code, value, tx } => {
            let msg = TxMsg::Deploy { value: *value, code: code.clone() };
            submit(cli, client, msg, |base| tx.clone().apply(base)).await?;
        }
        Commands::QueryTx { hash } => {
            print_json(&client.query_tx(*hash).await?)?;
        }
        Commands::Watch { secs } => {
            watch(client, Duration::from_secs(*secs)).await?;
        }
        Commands::Demo { to, count, amount, watch_secs } => {
            demo(cli, client, *to, *count, *amount, Duration::from_secs(*watch_secs)).await?;
        }
    }
    Ok(())
}

fn recover(cli: &Cli, client: &ChainClient) -> Result<Address, SdkError> {
    let mnemonic = cli
        .mnemonic
        .as_deref()
        .ok_or_else(|| SdkError::InvalidRequest("--mnemonic (or CHAIN_CLIENT_MNEMONIC) is required".to_string()))?;
    let address = client.keys().recover(&cli.key_name, password(cli)?, mnemonic)?;
    tracing::info!(name = %cli.key_name, address = %address, "Key recovered");
    Ok(address)
}

fn password(cli: &Cli) -> Result<&str, SdkError> {
    cli.password
        .as_deref()
        .ok_or_else(|| SdkError::InvalidRequest("--password (or CHAIN_CLIENT_PASSWORD) is required".to_string()))
}

async fn submit(
    cli: &Cli,
    client: &ChainClient,
    msg: TxMsg,
    customize: impl FnOnce(BaseTx) -> BaseTx,
) -> CliResult<()> {
    recover(cli, client)?;
    let base = customize(BaseTx::new(&cli.key_name, password(cli)?));
    print_json(&client.send_tx(msg, &base).await?)
}

async fn watch(client: &ChainClient, duration: Duration) -> CliResult<()> {
    let id = client
        .subscribe_new_block(|event| println!("{}", event))
        .await?;

    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
    }

    client.unsubscribe(id).await?;
    Ok(())
}

/// Full walkthrough. Only key recovery aborts; every later step logs its
/// failure and moves on.
async fn demo(
    cli: &Cli,
    client: &ChainClient,
    to: Option<Address>,
    count: u32,
    amount: U256,
    watch_for: Duration,
) -> CliResult<()> {
    let address = recover(cli, client)?;
    println!("address: {}", address);

    match client.query_account(address).await {
        Ok(account) => print_json(&account)?,
        Err(e) => tracing::error!(error = %e, "Account query failed"),
    }

    let recipient = to.unwrap_or(address);
    let mut tracker = client.tracker();
    for i in 0..count {
        let msg = TxMsg::Transfer { to: recipient, amount };
        let base = BaseTx::new(&cli.key_name, password(cli)?).with_memo(format!("demo transfer {}", i + 1));
        match client.send_tx(msg, &base).await {
            Ok(result) => {
                println!("submitted {}", result.hash);
                tracker.track(result.hash);
            }
            Err(e) => tracing::error!(
                codespace = e.codespace(),
                code = e.code(),
                error = %e,
                index = i + 1,
                "Transfer failed"
            ),
        }
    }

    for report in tracker.settle().await {
        println!("{}", report);
    }

    match client.subscribe_new_block(|event| println!("{}", event)).await {
        Ok(id) => {
            tokio::time::sleep(watch_for).await;
            if let Err(e) = client.unsubscribe(id).await {
                tracing::error!(error = %e, "Unsubscribe failed");
            }
        }
        Err(e) => tracing::error!(error = %e, "Block subscription failed"),
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
