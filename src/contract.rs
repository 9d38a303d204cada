use std::{marker::PhantomData, sync::Arc};

use alloy::{
    network::{Ethereum, EthereumWallet, NetworkWallet, TransactionBuilder},
    primitives::{Address, Bytes, TxHash},
    providers::{PendingTransactionBuilder, PendingTransactionError, Provider},
    rpc::types::TransactionRequest,
    sol,
    sol_types::SolCall,
    transports::Transport,
};
use async_trait::async_trait;

use FvhClaim::claimCall;

use crate::error::ChainError;

sol! {
    #[sol(rpc)]
    contract FvhClaim {
        function isPause() external view returns (bool);
        function depositTokens(address token) external view returns (bool);
        function claim(address token) external;
    }
}

/// Mined claim transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub success: bool,
}

/// Calls the claim flow needs from a deployed claim contract.
#[async_trait]
pub trait ClaimContract: Send + Sync {
    async fn is_paused(&self) -> Result<bool, ChainError>;

    async fn is_token_allowed(&self, token: Address) -> Result<bool, ChainError>;

    async fn estimate_claim_gas(&self, token: Address) -> Result<u64, ChainError>;

    async fn send_claim(&self, token: Address, gas_limit: u64) -> Result<TxHash, ChainError>;

    /// Resolves once the transaction is included in a block. Never times out on its own.
    async fn await_confirmation(&self, tx_hash: TxHash) -> Result<ClaimReceipt, ChainError>;
}

pub struct FvhContract<P, T> {
    provider: Arc<P>,
    wallet: Arc<EthereumWallet>,
    address: Address,
    chain_id: u64,
    _transport: PhantomData<fn() -> T>,
}

impl<P, T> FvhContract<P, T>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    pub fn new(
        provider: Arc<P>,
        wallet: Arc<EthereumWallet>,
        address: Address,
        chain_id: u64,
    ) -> Self {
        Self {
            provider,
            wallet,
            address,
            chain_id,
            _transport: PhantomData,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn signer_address(&self) -> Address {
        <EthereumWallet as NetworkWallet<Ethereum>>::default_signer_address(&self.wallet)
    }

    fn claim_request(&self, token: Address) -> TransactionRequest {
        let input: Bytes = claimCall { token }.abi_encode().into();

        TransactionRequest::default()
            .with_to(self.address)
            .with_from(self.signer_address())
            .with_chain_id(self.chain_id)
            .with_input(input)
    }
}

#[async_trait]
impl<P, T> ClaimContract for FvhContract<P, T>
where
    P: Provider<T, Ethereum> + 'static,
    T: Transport + Clone,
{
    async fn is_paused(&self) -> Result<bool, ChainError> {
        let instance = FvhClaim::new(self.address, self.provider.clone());
        Ok(instance.isPause().call().await?._0)
    }

    async fn is_token_allowed(&self, token: Address) -> Result<bool, ChainError> {
        let instance = FvhClaim::new(self.address, self.provider.clone());
        Ok(instance.depositTokens(token).call().await?._0)
    }

    async fn estimate_claim_gas(&self, token: Address) -> Result<u64, ChainError> {
        let tx_request = self.claim_request(token);
        let gas_limit = self.provider.estimate_gas(&tx_request).await?;

        Ok(u64::try_from(gas_limit).unwrap_or(u64::MAX))
    }

    async fn send_claim(&self, token: Address, gas_limit: u64) -> Result<TxHash, ChainError> {
        let eip1559_fees = self.provider.estimate_eip1559_fees(None).await?;
        let nonce = self.provider.get_transaction_count(self.signer_address()).await?;

        let tx_request = self
            .claim_request(token)
            .with_max_fee_per_gas(eip1559_fees.max_fee_per_gas)
            .with_max_priority_fee_per_gas(eip1559_fees.max_priority_fee_per_gas)
            .with_nonce(nonce)
            .with_gas_limit(gas_limit.into());

        let signed_transaction = tx_request
            .build(&self.wallet)
            .await
            .map_err(|e| ChainError::Encoding(e.to_string()))?;
        let pending_tx = self.provider.send_tx_envelope(signed_transaction).await?;

        Ok(*pending_tx.tx_hash())
    }

    async fn await_confirmation(&self, tx_hash: TxHash) -> Result<ClaimReceipt, ChainError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root(), tx_hash)
            .get_receipt()
            .await
            .map_err(|e| match e {
                PendingTransactionError::TransportError(e) => e.into(),
                other => ChainError::Transport(other.to_string()),
            })?;

        Ok(ClaimReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            success: receipt.status(),
        })
    }
}
