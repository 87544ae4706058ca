pub const MULTICALL3_ADDRESS: &str = "0xcA11bde05977b3631167028862bE2a173976CA11";

// Environment fallbacks for CLI flags
pub const RPC_URL_ENV: &str = "RPC_URL";
pub const FACTORY_ADDRESS_ENV: &str = "ARB_FACTORY_ADDRESS";
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";

// Row names in a deployment table
pub const CHALLENGE_FACTORY: &str = "ChallengeFactory";
pub const GLOBAL_INBOX: &str = "GlobalInbox";
pub const ROLLUP_TEMPLATE: &str = "RollupTemplate";

/// Default upper bound on waiting for a `createRollup` receipt.
pub const RECEIPT_TIMEOUT_SECS: u64 = 120;
