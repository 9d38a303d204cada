use alloy::primitives::Address;

use crate::network::NetworkSelection;

/// Wallet connection as last reported by the connector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub address: Option<Address>,
    pub connected: bool,
    pub chain_id: u64,
}

impl Session {
    pub fn connected(address: Address, chain_id: u64) -> Self {
        Self {
            address: Some(address),
            connected: true,
            chain_id,
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Connected with a known signer address.
    pub fn is_ready(&self) -> bool {
        self.connected && self.address.is_some()
    }

    pub fn network(&self) -> NetworkSelection {
        NetworkSelection::resolve(self.chain_id)
    }
}
