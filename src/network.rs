use std::fmt;

use alloy::primitives::TxHash;
use clap::ValueEnum;
use serde::Deserialize;

use crate::constants::{BOTANIX_CHAIN_ID, BOTANIX_EXPLORER_URL, PLUME_CHAIN_ID, PLUME_EXPLORER_URL};

#[derive(Deserialize, ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Botanix,
    Plume,
}

impl Network {
    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        match chain_id {
            BOTANIX_CHAIN_ID => Some(Network::Botanix),
            PLUME_CHAIN_ID => Some(Network::Plume),
            _ => None,
        }
    }

    pub fn chain_id(self) -> u64 {
        match self {
            Network::Botanix => BOTANIX_CHAIN_ID,
            Network::Plume => PLUME_CHAIN_ID,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Network::Botanix => "Botanix",
            Network::Plume => "Plume",
        }
    }

    pub fn native_symbol(self) -> &'static str {
        match self {
            Network::Botanix => "BTC",
            Network::Plume => "PLUME",
        }
    }

    pub fn is_testnet(self) -> bool {
        matches!(self, Network::Plume)
    }

    pub fn explorer_url(self) -> &'static str {
        match self {
            Network::Botanix => BOTANIX_EXPLORER_URL,
            Network::Plume => PLUME_EXPLORER_URL,
        }
    }

    pub fn tx_url(self, tx_hash: TxHash) -> String {
        format!("{}/tx/{tx_hash}", self.explorer_url())
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a chain id lands. Derived on every chain change, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkSelection {
    Supported(Network),
    Unsupported(u64),
}

impl NetworkSelection {
    pub fn resolve(chain_id: u64) -> Self {
        Network::from_chain_id(chain_id)
            .map_or(NetworkSelection::Unsupported(chain_id), NetworkSelection::Supported)
    }

    pub fn network(self) -> Option<Network> {
        match self {
            NetworkSelection::Supported(network) => Some(network),
            NetworkSelection::Unsupported(_) => None,
        }
    }

    pub fn label(self) -> &'static str {
        self.network().map_or("Unknown", Network::name)
    }
}

#[derive(Deserialize, ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Token {
    #[value(name = "pusd")]
    PUsd,
    Usdc,
}

impl Token {
    pub const ALL: [Token; 2] = [Token::PUsd, Token::Usdc];

    pub fn symbol(self) -> &'static str {
        match self {
            Token::PUsd => "pUSD",
            Token::Usdc => "USDC",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
