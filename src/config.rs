use std::{
    collections::{HashMap, HashSet},
    path::Path,
    time::Duration,
};

use alloy::primitives::Address;
use serde::Deserialize;

use crate::{
    constants::{
        CONFIG_FILE_PATH, DEFAULT_CHAIN_POLL_INTERVAL_MS, DEFAULT_CONFIRMATION_TIMEOUT_SECS,
        DEFAULT_FALLBACK_GAS_LIMIT, PRIVATE_KEY_FILE_PATH,
    },
    network::{Network, Token},
};

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    #[serde(default = "default_fallback_gas_limit")]
    pub fallback_gas_limit: u64,
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    #[serde(default = "default_chain_poll_interval_ms")]
    pub chain_poll_interval_ms: u64,
    #[serde(default = "default_private_key_path")]
    pub private_key_path: String,
    pub networks: HashMap<Network, NetworkConfig>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct NetworkConfig {
    pub rpc_urls: Vec<String>,
    pub claim_contract: Address,
    #[serde(default)]
    pub tokens: HashMap<Token, Address>,
}

impl NetworkConfig {
    fn validate(&self, network: Network) -> eyre::Result<()> {
        if self.rpc_urls.is_empty() {
            eyre::bail!("Network {network} has no RPC_URLS");
        }
        if self.claim_contract.is_zero() {
            eyre::bail!("Network {network} has a zero CLAIM_CONTRACT");
        }

        let mut seen = HashSet::new();
        for token in Token::ALL {
            let Some(token_address) = self.tokens.get(&token) else {
                continue;
            };
            if token_address.is_zero() {
                eyre::bail!("Network {network} has a zero address for {token}");
            }
            // Each token must resolve to its own contract
            if !seen.insert(*token_address) {
                eyre::bail!("Network {network} uses {token_address} for more than one token");
            }
        }

        Ok(())
    }
}

fn default_fallback_gas_limit() -> u64 {
    DEFAULT_FALLBACK_GAS_LIMIT
}

fn default_confirmation_timeout_secs() -> u64 {
    DEFAULT_CONFIRMATION_TIMEOUT_SECS
}

fn default_chain_poll_interval_ms() -> u64 {
    DEFAULT_CHAIN_POLL_INTERVAL_MS
}

fn default_private_key_path() -> String {
    PRIVATE_KEY_FILE_PATH.to_string()
}

impl Config {
    pub async fn read_from_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let cfg_str = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre::eyre!("Failed to read config {}: {e}", path.display()))?;
        Self::from_toml_str(&cfg_str)
    }

    pub async fn read_default() -> eyre::Result<Self> {
        Self::read_from_file(CONFIG_FILE_PATH).await
    }

    pub fn from_toml_str(cfg_str: &str) -> eyre::Result<Self> {
        let config: Self = toml::from_str(cfg_str)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> eyre::Result<()> {
        if self.fallback_gas_limit == 0 {
            eyre::bail!("FALLBACK_GAS_LIMIT must be greater than zero");
        }
        if self.confirmation_timeout_secs == 0 {
            eyre::bail!("CONFIRMATION_TIMEOUT_SECS must be greater than zero");
        }
        if self.chain_poll_interval_ms == 0 {
            eyre::bail!("CHAIN_POLL_INTERVAL_MS must be greater than zero");
        }
        if self.networks.is_empty() {
            eyre::bail!("At least one network must be configured");
        }
        for (network, network_config) in &self.networks {
            network_config.validate(*network)?;
        }

        Ok(())
    }

    pub fn network(&self, network: Network) -> eyre::Result<&NetworkConfig> {
        self.networks
            .get(&network)
            .ok_or_else(|| eyre::eyre!("Network {network} is not configured"))
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn chain_poll_interval(&self) -> Duration {
        Duration::from_millis(self.chain_poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use alloy::primitives::address;

    use super::*;

    const FULL_CONFIG: &str = r#"
FALLBACK_GAS_LIMIT = 250000
CONFIRMATION_TIMEOUT_SECS = 60

[NETWORKS.botanix]
RPC_URLS = ["https://rpc.ankr.com/botanix_mainnet"]
CLAIM_CONTRACT = "0x1111111111111111111111111111111111111111"

[NETWORKS.botanix.TOKENS]
pusd = "0x2222222222222222222222222222222222222222"
usdc = "0x3333333333333333333333333333333333333333"

[NETWORKS.plume]
RPC_URLS = ["https://rpc.plume.org/"]
CLAIM_CONTRACT = "0x4444444444444444444444444444444444444444"

[NETWORKS.plume.TOKENS]
pusd = "0x5555555555555555555555555555555555555555"
"#;

    #[test]
    fn parses_full_config() {
        let config = Config::from_toml_str(FULL_CONFIG).unwrap();

        assert_eq!(config.fallback_gas_limit, 250_000);
        assert_eq!(config.confirmation_timeout(), Duration::from_secs(60));
        assert_eq!(config.chain_poll_interval_ms, DEFAULT_CHAIN_POLL_INTERVAL_MS);
        assert_eq!(config.private_key_path, PRIVATE_KEY_FILE_PATH);

        let botanix = config.network(Network::Botanix).unwrap();
        assert_eq!(
            botanix.claim_contract,
            address!("1111111111111111111111111111111111111111")
        );
        assert_eq!(
            botanix.tokens.get(&Token::Usdc),
            Some(&address!("3333333333333333333333333333333333333333"))
        );

        let plume = config.network(Network::Plume).unwrap();
        assert!(!plume.tokens.contains_key(&Token::Usdc));
    }

    #[test]
    fn rejects_network_without_rpc() {
        let cfg = r#"
[NETWORKS.plume]
RPC_URLS = []
CLAIM_CONTRACT = "0x4444444444444444444444444444444444444444"
"#;
        let err = Config::from_toml_str(cfg).unwrap_err();
        assert!(err.to_string().contains("RPC_URLS"));
    }

    #[test]
    fn rejects_zero_fallback_gas() {
        let cfg = FULL_CONFIG.replace("FALLBACK_GAS_LIMIT = 250000", "FALLBACK_GAS_LIMIT = 0");
        assert!(Config::from_toml_str(&cfg).is_err());
    }

    #[test]
    fn rejects_zero_chain_poll_interval() {
        let cfg = format!("CHAIN_POLL_INTERVAL_MS = 0\n{FULL_CONFIG}");
        let err = Config::from_toml_str(&cfg).unwrap_err();
        assert!(err.to_string().contains("CHAIN_POLL_INTERVAL_MS"));
    }

    #[test]
    fn rejects_zero_claim_contract() {
        let cfg = FULL_CONFIG.replace(
            "0x4444444444444444444444444444444444444444",
            "0x0000000000000000000000000000000000000000",
        );
        let err = Config::from_toml_str(&cfg).unwrap_err();
        assert!(err.to_string().contains("CLAIM_CONTRACT"));
    }

    #[test]
    fn rejects_zero_token_address() {
        let cfg = FULL_CONFIG.replace(
            "0x5555555555555555555555555555555555555555",
            "0x0000000000000000000000000000000000000000",
        );
        let err = Config::from_toml_str(&cfg).unwrap_err();
        assert!(err.to_string().contains("zero address for pUSD"));
    }

    #[test]
    fn rejects_token_sharing_an_address() {
        // USDC pointed at the pUSD contract
        let cfg = FULL_CONFIG.replace(
            "usdc = \"0x3333333333333333333333333333333333333333\"",
            "usdc = \"0x2222222222222222222222222222222222222222\"",
        );
        let err = Config::from_toml_str(&cfg).unwrap_err();
        assert!(err.to_string().contains("more than one token"));
    }

    #[test]
    fn missing_network_is_an_error() {
        let cfg = r#"
[NETWORKS.plume]
RPC_URLS = ["https://rpc.plume.org/"]
CLAIM_CONTRACT = "0x4444444444444444444444444444444444444444"
"#;
        let config = Config::from_toml_str(cfg).unwrap();
        assert!(config.network(Network::Botanix).is_err());
    }

    #[tokio::test]
    async fn reads_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL_CONFIG.as_bytes()).unwrap();

        let config = Config::read_from_file(file.path()).await.unwrap();
        assert_eq!(config.networks.len(), 2);
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = Config::read_from_file("does/not/exist.toml")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does/not/exist.toml"));
    }
}
