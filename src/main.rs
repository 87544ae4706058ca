use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use alloy::transports::Transport;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::pin::pin;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

mod abi;
mod constants;
mod factory;
mod filter;
mod logging;
mod params;
mod verify;

use constants::{FACTORY_ADDRESS_ENV, PRIVATE_KEY_ENV, RECEIPT_TIMEOUT_SECS, RPC_URL_ENV};
use factory::{Factory, Mode, Submission, TxOverrides, View};
use filter::RollupCreatedFilter;
use logging::LoggingArgs;
use params::RollupParams;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON-RPC endpoint of the node
    #[arg(long, value_name = "URL", env = RPC_URL_ENV)]
    rpc_url: Url,

    /// Address of the ArbFactory deployment
    #[arg(long, value_name = "ADDRESS", env = FACTORY_ADDRESS_ENV)]
    factory: Address,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    logging: LoggingArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read the challenge factory, global inbox and rollup template addresses
    Addresses,

    /// Call one getter, by method name or canonical signature
    Call {
        view: View,

        /// Estimate gas instead of calling
        #[arg(long)]
        estimate: bool,

        #[command(flatten)]
        overrides: OverrideArgs,
    },

    /// Create a new rollup chain
    CreateRollup(CreateRollupArgs),

    /// List RollupCreated events
    Logs {
        /// Only this rollup (default: any)
        #[arg(long, value_name = "ADDRESS")]
        rollup: Option<Address>,

        /// First block to scan (default: genesis)
        #[arg(long, value_name = "BLOCK")]
        from_block: Option<u64>,
    },

    /// Show the rollups created by an earlier createRollup transaction
    Receipt {
        #[arg(value_name = "TX_HASH")]
        tx_hash: TxHash,
    },

    /// Stream RollupCreated events as they are mined
    Watch {
        /// Only this rollup (default: any)
        #[arg(long, value_name = "ADDRESS")]
        rollup: Option<Address>,
    },

    /// Compare the factory getters with a markdown deployment table
    Verify {
        /// Path to the file to parse
        #[arg(short, long, value_name = "FILE")]
        file: PathBuf,

        /// Network heading to check against
        #[arg(long)]
        network: String,
    },
}

#[derive(Debug, Args)]
struct CreateRollupArgs {
    /// Hash of the initial machine state
    #[arg(long, value_name = "BYTES32")]
    vm_state: B256,

    #[arg(long, value_name = "TICKS")]
    grace_period_ticks: u128,

    #[arg(long, value_name = "GAS")]
    arb_gas_speed_limit_per_tick: u128,

    #[arg(long, value_name = "STEPS")]
    max_execution_steps: u64,

    #[arg(long, value_name = "AMOUNT")]
    stake_requirement: u128,

    /// ERC-20 used for staking; the zero address stakes in ETH
    #[arg(
        long,
        value_name = "ADDRESS",
        default_value = "0x0000000000000000000000000000000000000000"
    )]
    stake_token: Address,

    #[arg(long, value_name = "ADDRESS")]
    owner: Address,

    #[arg(long, value_name = "HEX", default_value = "0x", value_parser = Bytes::from_str)]
    extra_config: Bytes,

    /// Estimate gas instead of sending
    #[arg(long)]
    estimate: bool,

    /// Wait for the receipt and print the new rollup address
    #[arg(long, conflicts_with = "estimate")]
    wait: bool,

    /// Seconds to wait for the receipt with --wait
    #[arg(long, value_name = "SECS", default_value_t = RECEIPT_TIMEOUT_SECS)]
    timeout: u64,

    /// Key used to sign the transaction
    #[arg(long, env = PRIVATE_KEY_ENV, hide_env_values = true)]
    private_key: Option<PrivateKeySigner>,

    #[command(flatten)]
    overrides: OverrideArgs,
}

impl CreateRollupArgs {
    fn params(&self) -> RollupParams {
        RollupParams {
            vm_state: self.vm_state,
            grace_period_ticks: self.grace_period_ticks,
            arb_gas_speed_limit_per_tick: self.arb_gas_speed_limit_per_tick,
            max_execution_steps: self.max_execution_steps,
            stake_requirement: self.stake_requirement,
            stake_token: self.stake_token,
            owner: self.owner,
            extra_config: self.extra_config.clone(),
        }
    }

    fn mode(&self) -> Mode {
        if self.estimate { Mode::Estimate } else { Mode::Send }
    }
}

#[derive(Debug, Clone, Default, Args)]
struct OverrideArgs {
    /// Sender address (estimation only; signing derives it from the key)
    #[arg(long, value_name = "ADDRESS")]
    from: Option<Address>,

    #[arg(long, value_name = "GAS")]
    gas_limit: Option<u64>,

    #[arg(long, value_name = "WEI")]
    gas_price: Option<u128>,

    #[arg(long)]
    nonce: Option<u64>,
}

impl From<&OverrideArgs> for TxOverrides {
    fn from(args: &OverrideArgs) -> Self {
        TxOverrides {
            from: args.from,
            gas_limit: args.gas_limit,
            gas_price: args.gas_price,
            nonce: args.nonce,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GasEstimate<'a> {
    method: &'a str,
    gas: u128,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Submitted {
    transaction_hash: TxHash,
    #[serde(skip_serializing_if = "Option::is_none")]
    rollups: Option<Vec<Address>>,
}

impl Submitted {
    fn describe(&self) -> String {
        let tx_hash = self.transaction_hash;
        match &self.rollups {
            None => format!("Submitted createRollup: {}", tx_hash),
            Some(rollups) if rollups.is_empty() => {
                format!("Mined {} but no RollupCreated event was emitted", tx_hash)
            }
            Some(rollups) => rollups
                .iter()
                .map(|rollup| format!("✅ Rollup created at {} (tx {})", rollup, tx_hash))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.logging.init();

    match cli.command {
        Command::CreateRollup(args) if !args.estimate => {
            let signer = args.private_key.clone().with_context(|| {
                format!(
                    "Sending createRollup needs --private-key or {}",
                    PRIVATE_KEY_ENV
                )
            })?;
            info!(sender = %signer.address(), "signing with local key");
            let provider = ProviderBuilder::new()
                .with_recommended_fillers()
                .wallet(EthereumWallet::from(signer))
                .on_http(cli.rpc_url);
            create_rollup(&Factory::new(cli.factory, provider), &args, cli.json).await
        }
        command => {
            let provider = ProviderBuilder::new().on_http(cli.rpc_url);
            run(&Factory::new(cli.factory, provider), command, cli.json).await
        }
    }
}

async fn run<T, P>(factory: &Factory<T, P>, command: Command, json: bool) -> Result<()>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    match command {
        Command::Addresses => {
            let addresses = factory.addresses().await?;
            emit(json, &addresses, || {
                format!(
                    "challengeFactoryAddress: {}\nglobalInboxAddress:      {}\nrollupTemplate:          {}",
                    addresses.challenge_factory, addresses.global_inbox, addresses.rollup_template
                )
            })
        }
        Command::Call {
            view,
            estimate,
            overrides,
        } => {
            if estimate {
                let gas = factory
                    .estimate_view(view, &TxOverrides::from(&overrides))
                    .await?;
                let estimate = GasEstimate {
                    method: view.signature(),
                    gas,
                };
                emit(json, &estimate, || format!("{}: {} gas", view.signature(), gas))
            } else {
                let address = factory
                    .view(view, &TxOverrides::from(&overrides))
                    .await?;
                emit(json, &address, || format!("{}: {}", view, address))
            }
        }
        Command::CreateRollup(args) => create_rollup(factory, &args, json).await,
        Command::Logs { rollup, from_block } => {
            let filter = RollupCreatedFilter::new(factory.address(), rollup);
            let logs = factory.rollup_created_logs(&filter, from_block).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&logs)?);
            } else if logs.is_empty() {
                println!("No RollupCreated events found");
            } else {
                for log in &logs {
                    println!("{}", describe(log));
                }
            }
            Ok(())
        }
        Command::Receipt { tx_hash } => match factory.rollups_in_receipt(tx_hash).await? {
            None => {
                println!("{} is still pending", tx_hash);
                Ok(())
            }
            Some(rollups) => {
                let submitted = Submitted {
                    transaction_hash: tx_hash,
                    rollups: Some(rollups),
                };
                emit(json, &submitted, || submitted.describe())
            }
        },
        Command::Watch { rollup } => {
            let filter = RollupCreatedFilter::new(factory.address(), rollup);
            let mut events = pin!(factory.watch_rollup_created(filter).await?);
            info!(factory = %factory.address(), "watching for RollupCreated");
            loop {
                tokio::select! {
                    next = events.next() => match next {
                        Some(log) => {
                            if json {
                                println!("{}", serde_json::to_string(&log)?);
                            } else {
                                println!("{}", describe(&log));
                            }
                        }
                        None => break,
                    },
                    _ = tokio::signal::ctrl_c() => {
                        debug!("interrupted, stopping watch");
                        break;
                    }
                }
            }
            Ok(())
        }
        Command::Verify { file, network } => {
            let content = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read input file: {:?}", file))?;
            let networks = verify::parse_networks(&content)?;

            println!("Verifying factory {} against {}...", factory.address(), network);
            let addresses = factory.addresses().await?;
            let checks = verify::check_addresses(&networks, &network, &addresses)?;

            if !verify::report(&network, &checks) {
                eprintln!("\n❌ Verification failed for {}.", network);
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

async fn create_rollup<T, P>(
    factory: &Factory<T, P>,
    args: &CreateRollupArgs,
    json: bool,
) -> Result<()>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let params = args.params();
    let overrides = TxOverrides::from(&args.overrides);
    debug!(chain_params = ?params.chain_params(), owner = %params.owner, "createRollup");

    match factory.create_rollup(&params, args.mode(), &overrides).await? {
        Submission::Estimated(gas) => {
            let estimate = GasEstimate {
                method: abi::ArbFactory::createRollupCall::SIGNATURE,
                gas,
            };
            emit(json, &estimate, || format!("createRollup: {} gas", gas))
        }
        Submission::Pending(pending) => {
            let transaction_hash = *pending.tx_hash();
            let rollups = if args.wait {
                let timeout = Duration::from_secs(args.timeout);
                Some(factory.confirm_rollup(pending, timeout).await?)
            } else {
                None
            };
            let submitted = Submitted {
                transaction_hash,
                rollups,
            };
            emit(json, &submitted, || submitted.describe())
        }
    }
}

fn describe(log: &factory::RollupCreatedLog) -> String {
    let block = log
        .block_number
        .map(|n| n.to_string())
        .unwrap_or_else(|| "pending".to_string());
    match log.transaction_hash {
        Some(tx) => format!("{}  block {}  tx {}", log.rollup_address, block, tx),
        None => format!("{}  block {}", log.rollup_address, block),
    }
}

fn emit<S: Serialize>(json: bool, value: &S, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}
