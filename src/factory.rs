use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use alloy::contract::{CallBuilder, CallDecoder, SolCallBuilder};
use alloy::network::{Ethereum, Network};
use alloy::primitives::{Address, Bytes, Log, TxHash};
use alloy::providers::{PendingTransactionBuilder, Provider};
use alloy::rpc::types::{Filter, Log as RpcLog, TransactionReceipt};
use alloy::sol_types::{SolCall, SolValue};
use alloy::transports::Transport;
use anyhow::{Context, Result, anyhow, bail};
use futures::{Stream, StreamExt, future, stream};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::abi::{ArbFactory, Multicall3};
use crate::constants::MULTICALL3_ADDRESS;
use crate::filter::RollupCreatedFilter;
use crate::params::RollupParams;

/// Whether a state-changing call is submitted or only priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Send,
    Estimate,
}

pub enum Submission<T> {
    /// Accepted by the node, not yet mined.
    Pending(PendingTransactionBuilder<T, Ethereum>),
    Estimated(u128),
}

/// Per-call transaction overrides. Unset fields are left to the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOverrides {
    pub from: Option<Address>,
    pub gas_limit: Option<u64>,
    pub gas_price: Option<u128>,
    pub nonce: Option<u64>,
}

impl TxOverrides {
    pub fn apply<T, P, D, N>(&self, mut call: CallBuilder<T, P, D, N>) -> CallBuilder<T, P, D, N>
    where
        T: Transport + Clone,
        P: Provider<T, N>,
        D: CallDecoder,
        N: Network,
    {
        if let Some(from) = self.from {
            call = call.from(from);
        }
        if let Some(gas_limit) = self.gas_limit {
            call = call.gas(gas_limit.into());
        }
        if let Some(gas_price) = self.gas_price {
            call = call.gas_price(gas_price);
        }
        if let Some(nonce) = self.nonce {
            call = call.nonce(nonce);
        }
        call
    }
}

/// The three read-only getters of the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    ChallengeFactoryAddress,
    GlobalInboxAddress,
    RollupTemplate,
}

impl View {
    pub const ALL: [View; 3] = [
        View::ChallengeFactoryAddress,
        View::GlobalInboxAddress,
        View::RollupTemplate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            View::ChallengeFactoryAddress => "challengeFactoryAddress",
            View::GlobalInboxAddress => "globalInboxAddress",
            View::RollupTemplate => "rollupTemplate",
        }
    }

    pub fn signature(self) -> &'static str {
        match self {
            View::ChallengeFactoryAddress => ArbFactory::challengeFactoryAddressCall::SIGNATURE,
            View::GlobalInboxAddress => ArbFactory::globalInboxAddressCall::SIGNATURE,
            View::RollupTemplate => ArbFactory::rollupTemplateCall::SIGNATURE,
        }
    }

    pub fn calldata(self) -> Vec<u8> {
        match self {
            View::ChallengeFactoryAddress => {
                ArbFactory::challengeFactoryAddressCall {}.abi_encode()
            }
            View::GlobalInboxAddress => ArbFactory::globalInboxAddressCall {}.abi_encode(),
            View::RollupTemplate => ArbFactory::rollupTemplateCall {}.abi_encode(),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts either the short method name or the full canonical signature.
impl FromStr for View {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        View::ALL
            .into_iter()
            .find(|view| view.name() == s || view.signature() == s)
            .ok_or_else(|| anyhow!("Unknown ArbFactory view: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryAddresses {
    pub challenge_factory: Address,
    pub global_inbox: Address,
    pub rollup_template: Address,
}

impl FactoryAddresses {
    pub fn get(&self, view: View) -> Address {
        match view {
            View::ChallengeFactoryAddress => self.challenge_factory,
            View::GlobalInboxAddress => self.global_inbox,
            View::RollupTemplate => self.rollup_template,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupCreatedLog {
    pub rollup_address: Address,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<TxHash>,
}

impl RollupCreatedLog {
    fn from_rpc(filter: &RollupCreatedFilter, log: &RpcLog) -> Option<Self> {
        let event = filter.decode(&log.inner)?;
        Some(Self {
            rollup_address: event.rollupAddress,
            block_number: log.block_number,
            transaction_hash: log.transaction_hash,
        })
    }
}

/// Typed client for one deployed ArbFactory.
pub struct Factory<T, P> {
    instance: ArbFactory::ArbFactoryInstance<T, P>,
}

impl<T, P> Factory<T, P>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    pub fn new(address: Address, provider: P) -> Self {
        Self {
            instance: ArbFactory::new(address, provider),
        }
    }

    /// Same provider, different deployment.
    pub fn attach(&self, address: Address) -> Self
    where
        P: Clone,
    {
        Self::new(address, self.instance.provider().clone())
    }

    pub fn address(&self) -> Address {
        *self.instance.address()
    }

    pub async fn challenge_factory_address(&self, overrides: &TxOverrides) -> Result<Address> {
        let ArbFactory::challengeFactoryAddressReturn { _0 } = overrides
            .apply(self.instance.challengeFactoryAddress())
            .call()
            .await
            .context("challengeFactoryAddress() call failed")?;
        Ok(_0)
    }

    pub async fn global_inbox_address(&self, overrides: &TxOverrides) -> Result<Address> {
        let ArbFactory::globalInboxAddressReturn { _0 } = overrides
            .apply(self.instance.globalInboxAddress())
            .call()
            .await
            .context("globalInboxAddress() call failed")?;
        Ok(_0)
    }

    pub async fn rollup_template(&self, overrides: &TxOverrides) -> Result<Address> {
        let ArbFactory::rollupTemplateReturn { _0 } = overrides
            .apply(self.instance.rollupTemplate())
            .call()
            .await
            .context("rollupTemplate() call failed")?;
        Ok(_0)
    }

    pub async fn view(&self, view: View, overrides: &TxOverrides) -> Result<Address> {
        match view {
            View::ChallengeFactoryAddress => self.challenge_factory_address(overrides).await,
            View::GlobalInboxAddress => self.global_inbox_address(overrides).await,
            View::RollupTemplate => self.rollup_template(overrides).await,
        }
    }

    /// Reads all three getters in one Multicall3 round trip, falling back
    /// to individual calls when the aggregate call itself fails.
    pub async fn addresses(&self) -> Result<FactoryAddresses> {
        match self.addresses_multicall().await {
            Ok(addresses) => Ok(addresses),
            Err(e) => {
                warn!(error = %e, "multicall read failed, querying getters one by one");
                let overrides = TxOverrides::default();
                let (challenge_factory, global_inbox, rollup_template) = tokio::try_join!(
                    self.challenge_factory_address(&overrides),
                    self.global_inbox_address(&overrides),
                    self.rollup_template(&overrides),
                )?;
                Ok(FactoryAddresses {
                    challenge_factory,
                    global_inbox,
                    rollup_template,
                })
            }
        }
    }

    async fn addresses_multicall(&self) -> Result<FactoryAddresses> {
        let multicall = Multicall3::new(
            Address::from_str(MULTICALL3_ADDRESS).context("Invalid Multicall3 constant")?,
            self.instance.provider(),
        );

        let calls = View::ALL
            .iter()
            .map(|view| Multicall3::Call3 {
                target: self.address(),
                allowFailure: true,
                callData: view.calldata().into(),
            })
            .collect();

        let result = multicall
            .aggregate3(calls)
            .call()
            .await
            .context("Multicall execution failed")?;

        let addresses = addresses_from_results(&result.returnData)?;
        debug!(factory = %self.address(), "read factory getters via multicall");
        Ok(addresses)
    }

    fn create_rollup_call(
        &self,
        params: &RollupParams,
    ) -> SolCallBuilder<T, &P, ArbFactory::createRollupCall> {
        self.instance.createRollup(
            params.vm_state,
            params.grace_period_ticks,
            params.arb_gas_speed_limit_per_tick,
            params.max_execution_steps,
            params.stake_requirement,
            params.stake_token,
            params.owner,
            params.extra_config.clone(),
        )
    }

    pub fn create_rollup_calldata(&self, params: &RollupParams) -> Bytes {
        self.create_rollup_call(params).calldata().clone()
    }

    pub async fn create_rollup(
        &self,
        params: &RollupParams,
        mode: Mode,
        overrides: &TxOverrides,
    ) -> Result<Submission<T>> {
        let call = overrides.apply(self.create_rollup_call(params));
        match mode {
            Mode::Estimate => {
                let gas = call
                    .estimate_gas()
                    .await
                    .context("createRollup gas estimation failed")?;
                Ok(Submission::Estimated(u128::from(gas)))
            }
            Mode::Send => {
                let pending = call
                    .send()
                    .await
                    .context("createRollup submission failed")?;
                info!(tx_hash = %pending.tx_hash(), factory = %self.address(), "createRollup submitted");
                Ok(Submission::Pending(pending))
            }
        }
    }

    pub async fn estimate_view(&self, view: View, overrides: &TxOverrides) -> Result<u128> {
        let gas = match view {
            View::ChallengeFactoryAddress => {
                overrides
                    .apply(self.instance.challengeFactoryAddress())
                    .estimate_gas()
                    .await
            }
            View::GlobalInboxAddress => {
                overrides
                    .apply(self.instance.globalInboxAddress())
                    .estimate_gas()
                    .await
            }
            View::RollupTemplate => {
                overrides
                    .apply(self.instance.rollupTemplate())
                    .estimate_gas()
                    .await
            }
        }
        .with_context(|| format!("{} gas estimation failed", view.signature()))?;
        Ok(u128::from(gas))
    }

    /// Waits up to `timeout` for a submitted `createRollup` to be mined and
    /// returns the rollups it announced.
    pub async fn confirm_rollup(
        &self,
        pending: PendingTransactionBuilder<T, Ethereum>,
        timeout: Duration,
    ) -> Result<Vec<Address>> {
        let tx_hash = *pending.tx_hash();
        let receipt = pending
            .with_timeout(Some(timeout))
            .get_receipt()
            .await
            .with_context(|| format!("No receipt for {} within {:?}", tx_hash, timeout))?;
        rollups_from_receipt(self.address(), &receipt)
    }

    /// Rollups announced by this factory in an already submitted transaction.
    /// `None` while the transaction is still pending.
    pub async fn rollups_in_receipt(&self, tx_hash: TxHash) -> Result<Option<Vec<Address>>> {
        let receipt = self
            .instance
            .provider()
            .get_transaction_receipt(tx_hash)
            .await
            .with_context(|| format!("Failed to fetch receipt for {}", tx_hash))?;
        receipt
            .map(|receipt| rollups_from_receipt(self.address(), &receipt))
            .transpose()
    }

    pub async fn rollup_created_logs(
        &self,
        filter: &RollupCreatedFilter,
        from_block: Option<u64>,
    ) -> Result<Vec<RollupCreatedLog>> {
        let rpc_filter = history_filter(filter, from_block);
        let logs = self
            .instance
            .provider()
            .get_logs(&rpc_filter)
            .await
            .context("Failed to query RollupCreated logs")?;
        debug!(count = logs.len(), "fetched RollupCreated logs");

        Ok(logs
            .iter()
            .filter_map(|log| RollupCreatedLog::from_rpc(filter, log))
            .collect())
    }

    pub async fn watch_rollup_created(
        &self,
        filter: RollupCreatedFilter,
    ) -> Result<impl Stream<Item = RollupCreatedLog>> {
        let poller = self
            .instance
            .provider()
            .watch_logs(&filter.to_filter())
            .await
            .context("Failed to install RollupCreated log filter")?;

        Ok(poller
            .into_stream()
            .flat_map(stream::iter)
            .filter_map(move |log| future::ready(RollupCreatedLog::from_rpc(&filter, &log))))
    }
}

/// Historical queries start at genesis unless told otherwise; an RPC filter
/// without a range only covers the latest block.
fn history_filter(filter: &RollupCreatedFilter, from_block: Option<u64>) -> Filter {
    filter.to_filter().from_block(from_block.unwrap_or(0))
}

pub fn rollups_from_receipt(factory: Address, receipt: &TransactionReceipt) -> Result<Vec<Address>> {
    rollups_from_logs(
        factory,
        receipt.transaction_hash,
        receipt.status(),
        receipt.inner.logs().iter().map(|log| &log.inner),
    )
}

fn rollups_from_logs<'a>(
    factory: Address,
    tx_hash: TxHash,
    succeeded: bool,
    logs: impl IntoIterator<Item = &'a Log>,
) -> Result<Vec<Address>> {
    if !succeeded {
        bail!("createRollup transaction {} reverted", tx_hash);
    }
    let filter = RollupCreatedFilter::any(factory);
    Ok(logs
        .into_iter()
        .filter_map(|log| filter.decode(log))
        .map(|event| event.rollupAddress)
        .collect())
}

fn addresses_from_results(results: &[Multicall3::Result]) -> Result<FactoryAddresses> {
    let [challenge_factory, global_inbox, rollup_template] = results else {
        bail!(
            "Multicall returned {} results for {} calls",
            results.len(),
            View::ALL.len()
        );
    };
    Ok(FactoryAddresses {
        challenge_factory: decode_address(View::ChallengeFactoryAddress, challenge_factory)?,
        global_inbox: decode_address(View::GlobalInboxAddress, global_inbox)?,
        rollup_template: decode_address(View::RollupTemplate, rollup_template)?,
    })
}

fn decode_address(view: View, res: &Multicall3::Result) -> Result<Address> {
    if !res.success {
        bail!("{} reverted inside multicall", view.signature());
    }
    <Address>::abi_decode(&res.returnData, true)
        .with_context(|| format!("Error decoding {} return data", view.signature()))
}
