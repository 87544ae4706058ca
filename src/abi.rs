use alloy::sol;

sol! {
    #[sol(rpc)]
    #[derive(Debug, PartialEq, Eq)]
    interface ArbFactory {
        event RollupCreated(address indexed rollupAddress);

        function challengeFactoryAddress() external view returns (address);
        function globalInboxAddress() external view returns (address);
        function rollupTemplate() external view returns (address);

        function createRollup(
            bytes32 _vmState,
            uint128 _gracePeriodTicks,
            uint128 _arbGasSpeedLimitPerTick,
            uint64 _maxExecutionSteps,
            uint128 _stakeRequirement,
            address _stakeToken,
            address _owner,
            bytes _extraConfig
        ) external;
    }

    #[sol(rpc)]
    interface Multicall3 {
        struct Call3 {
            address target;
            bool allowFailure;
            bytes callData;
        }

        struct Result {
            bool success;
            bytes returnData;
        }

        function aggregate3(Call3[] calldata calls) external view returns (Result[] memory returnData);
    }
}
