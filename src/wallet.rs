use std::{marker::PhantomData, sync::Arc, time::Duration};

use alloy::{
    network::{Ethereum, EthereumWallet, NetworkWallet},
    primitives::Address,
    providers::{Provider, RootProvider},
    rpc::client::ClientBuilder,
    transports::{
        http::{Client, Http},
        layers::{RetryBackoffLayer, RetryBackoffService},
        Transport,
    },
};
use rand::{seq::SliceRandom, thread_rng};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::session::Session;

pub type HttpTransport = RetryBackoffService<Http<Client>>;
pub type HttpProvider = RootProvider<HttpTransport>;

pub fn init_provider(rpc_url: &str) -> eyre::Result<Arc<HttpProvider>> {
    let retry_layer = RetryBackoffLayer::new(10, 2, 500);
    let url = rpc_url
        .parse()
        .map_err(|e| eyre::eyre!("Invalid RPC url {rpc_url}: {e}"))?;

    let client = ClientBuilder::default()
        .layer(retry_layer)
        .transport(Http::new(url), false);

    Ok(Arc::new(RootProvider::new(client)))
}

/// Builds a provider for a random RPC from the list.
pub fn init_random_provider(rpc_urls: &[String]) -> eyre::Result<Arc<HttpProvider>> {
    let rpc_url = rpc_urls
        .choose(&mut thread_rng())
        .ok_or_else(|| eyre::eyre!("No RPC urls to choose from"))?;
    tracing::debug!("Using RPC {rpc_url}");

    init_provider(rpc_url)
}

/// Local signer bound to an RPC node. Publishes the session on a watch channel
/// so consumers always read the latest chain and connection state.
pub struct WalletConnector<P, T> {
    provider: Arc<P>,
    wallet: Arc<EthereumWallet>,
    session: watch::Sender<Session>,
    _transport: PhantomData<fn() -> T>,
}

impl<P, T> WalletConnector<P, T>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    pub fn new(provider: Arc<P>, wallet: Arc<EthereumWallet>) -> Self {
        let (session, _) = watch::channel(Session::disconnected());

        Self {
            provider,
            wallet,
            session,
            _transport: PhantomData,
        }
    }

    pub fn address(&self) -> Address {
        <EthereumWallet as NetworkWallet<Ethereum>>::default_signer_address(&self.wallet)
    }

    pub fn wallet(&self) -> Arc<EthereumWallet> {
        self.wallet.clone()
    }

    pub fn session(&self) -> Session {
        *self.session.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    pub async fn connect(&self) -> eyre::Result<Session> {
        let chain_id = self.provider.get_chain_id().await?;
        let session = Session::connected(self.address(), chain_id);
        self.publish(session);

        tracing::info!("Connected {} on chain {chain_id}", self.address());
        Ok(session)
    }

    pub fn disconnect(&self) {
        self.publish(Session::disconnected());
    }

    /// Re-reads the chain id. An unreachable node counts as disconnected.
    pub async fn refresh(&self) -> Session {
        let session = match self.provider.get_chain_id().await {
            Ok(chain_id) => Session::connected(self.address(), chain_id),
            Err(e) => {
                tracing::warn!("Failed to read chain id: {e}");
                Session::disconnected()
            }
        };
        self.publish(session);

        session
    }

    /// Returns whether subscribers saw a change.
    fn publish(&self, session: Session) -> bool {
        self.session.send_if_modified(|current| {
            if *current == session {
                return false;
            }
            if current.chain_id != session.chain_id && session.connected {
                tracing::info!("Chain changed: {} -> {}", current.chain_id, session.chain_id);
            }
            *current = session;
            true
        })
    }

    /// Polls the node until cancelled.
    pub async fn watch_chain(&self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.refresh().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use alloy::signers::local::PrivateKeySigner;

    use super::*;

    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    // Nothing listens here
    const DEAD_RPC: &str = "http://127.0.0.1:9";

    fn connector() -> WalletConnector<HttpProvider, HttpTransport> {
        let signer = PrivateKeySigner::from_str(DEV_KEY).unwrap();
        let wallet = Arc::new(EthereumWallet::new(signer));
        WalletConnector::new(init_provider(DEAD_RPC).unwrap(), wallet)
    }

    #[test]
    fn rejects_bad_rpc_url() {
        assert!(init_provider("not a url").is_err());
        assert!(init_random_provider(&[]).is_err());
    }

    #[tokio::test]
    async fn starts_disconnected() {
        let connector = connector();
        assert_eq!(connector.session(), Session::disconnected());
    }

    #[tokio::test]
    async fn publishes_only_changes() {
        let connector = connector();
        let mut rx = connector.subscribe();
        let botanix = Session::connected(connector.address(), 3637);

        assert!(connector.publish(botanix));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), botanix);

        assert!(!connector.publish(botanix));
        assert!(!rx.has_changed().unwrap());

        connector.disconnect();
        assert_eq!(*rx.borrow_and_update(), Session::disconnected());
    }

    #[tokio::test]
    async fn unreachable_node_is_disconnected() {
        let connector = connector();
        connector.publish(Session::connected(connector.address(), 3637));

        let session = connector.refresh().await;
        assert_eq!(session, Session::disconnected());
        assert!(!connector.session().is_ready());
        assert!(connector.connect().await.is_err());
    }

    #[tokio::test]
    async fn watcher_stops_on_cancel() {
        let connector = connector();
        let cancel = CancellationToken::new();
        cancel.cancel();

        tokio::time::timeout(
            Duration::from_secs(5),
            connector.watch_chain(Duration::from_secs(60), cancel),
        )
        .await
        .unwrap();
    }
}
