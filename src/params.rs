use alloy::primitives::{Address, B256, Bytes};
use serde::Serialize;

use crate::abi::ArbFactory;

/// Arguments of `createRollup`, in ABI order.
///
/// Values are forwarded untouched; the factory contract is the only place
/// they get validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupParams {
    pub vm_state: B256,
    pub grace_period_ticks: u128,
    pub arb_gas_speed_limit_per_tick: u128,
    pub max_execution_steps: u64,
    pub stake_requirement: u128,
    pub stake_token: Address,
    pub owner: Address,
    pub extra_config: Bytes,
}

/// The chain parameters a rollup is configured with at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainParams {
    pub grace_period_ticks: u128,
    pub arb_gas_speed_limit_per_tick: u128,
    pub max_execution_steps: u64,
    pub stake_requirement: u128,
}

impl RollupParams {
    pub fn to_call(&self) -> ArbFactory::createRollupCall {
        ArbFactory::createRollupCall {
            _vmState: self.vm_state,
            _gracePeriodTicks: self.grace_period_ticks,
            _arbGasSpeedLimitPerTick: self.arb_gas_speed_limit_per_tick,
            _maxExecutionSteps: self.max_execution_steps,
            _stakeRequirement: self.stake_requirement,
            _stakeToken: self.stake_token,
            _owner: self.owner,
            _extraConfig: self.extra_config.clone(),
        }
    }

    pub fn from_call(call: ArbFactory::createRollupCall) -> Self {
        Self {
            vm_state: call._vmState,
            grace_period_ticks: call._gracePeriodTicks,
            arb_gas_speed_limit_per_tick: call._arbGasSpeedLimitPerTick,
            max_execution_steps: call._maxExecutionSteps,
            stake_requirement: call._stakeRequirement,
            stake_token: call._stakeToken,
            owner: call._owner,
            extra_config: call._extraConfig,
        }
    }

    pub fn chain_params(&self) -> ChainParams {
        ChainParams {
            grace_period_ticks: self.grace_period_ticks,
            arb_gas_speed_limit_per_tick: self.arb_gas_speed_limit_per_tick,
            max_execution_steps: self.max_execution_steps,
            stake_requirement: self.stake_requirement,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy::primitives::{U256, bytes};
    use alloy::sol_types::SolCall;

    pub(crate) fn sample() -> RollupParams {
        RollupParams {
            vm_state: B256::repeat_byte(0x5a),
            grace_period_ticks: 13_000 * 1_000,
            arb_gas_speed_limit_per_tick: 200_000,
            max_execution_steps: 250_000_000,
            stake_requirement: u128::MAX,
            stake_token: Address::ZERO,
            owner: Address::repeat_byte(0xab),
            extra_config: bytes!("0102030405"),
        }
    }

    #[test]
    fn calldata_round_trip_is_lossless() {
        let params = sample();
        let encoded = params.to_call().abi_encode();
        assert_eq!(&encoded[..4], &ArbFactory::createRollupCall::SELECTOR);

        let decoded = ArbFactory::createRollupCall::abi_decode(&encoded, true).unwrap();
        assert_eq!(RollupParams::from_call(decoded), params);
    }

    #[test]
    fn arguments_are_laid_out_in_abi_order() {
        let params = sample();
        let encoded = params.to_call().abi_encode();
        let word = |i: usize| &encoded[4 + 32 * i..4 + 32 * (i + 1)];

        assert_eq!(word(0), params.vm_state.as_slice());
        assert_eq!(
            U256::from_be_slice(word(1)),
            U256::from(params.grace_period_ticks)
        );
        assert_eq!(
            U256::from_be_slice(word(3)),
            U256::from(params.max_execution_steps)
        );
        assert_eq!(
            U256::from_be_slice(word(4)),
            U256::from(params.stake_requirement)
        );
        assert_eq!(&word(6)[12..], params.owner.as_slice());
        // dynamic `bytes` goes through an offset to the tail
        assert_eq!(U256::from_be_slice(word(7)), U256::from(8u64 * 32));
    }

    #[test]
    fn chain_params_subset() {
        let params = sample();
        let chain = params.chain_params();
        assert_eq!(chain.grace_period_ticks, params.grace_period_ticks);
        assert_eq!(chain.max_execution_steps, 250_000_000);
        assert_eq!(chain.stake_requirement, u128::MAX);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(json.contains(r#""maxExecutionSteps":250000000"#));
        assert!(json.contains(r#""extraConfig":"0x0102030405""#));
        assert!(json.contains(&format!(r#""stakeRequirement":{}"#, u128::MAX)));
    }
}
