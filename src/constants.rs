pub const BOTANIX_CHAIN_ID: u64 = 3637;
pub const PLUME_CHAIN_ID: u64 = 98866;

pub const BOTANIX_EXPLORER_URL: &str = "https://botanixscan.io";
pub const PLUME_EXPLORER_URL: &str = "https://explorer.plume.org";

// Used when the node refuses to estimate the claim call
pub const DEFAULT_FALLBACK_GAS_LIMIT: u64 = 200_000;
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_CHAIN_POLL_INTERVAL_MS: u64 = 5_000;

// FILES
pub const CONFIG_FILE_PATH: &str = "data/config.toml";
pub const PRIVATE_KEY_FILE_PATH: &str = "data/private_key.txt";
pub const LOG_DIR: &str = "logs";
