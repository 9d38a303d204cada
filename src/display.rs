use tokio::{sync::broadcast, task::JoinHandle};

use crate::{claimer::ClaimStatus, session::Session};

pub fn session_summary(session: &Session) -> String {
    let address = session
        .address
        .map_or_else(|| "not connected".to_string(), |address| address.to_string());

    format!(
        "Network: {} | Address: {address}",
        session.network().label()
    )
}

/// Hint shown when the submit action is unavailable.
pub fn submit_hint(session: &Session, claiming: bool) -> Option<&'static str> {
    if !session.is_ready() {
        Some("Connect your wallet to start claiming tokens")
    } else if session.network().network().is_none() {
        Some("Please switch to Botanix or Plume network")
    } else if claiming {
        Some("Claiming...")
    } else {
        None
    }
}

/// Logs every status until the claimer goes away.
pub fn spawn_status_line(mut rx: broadcast::Receiver<ClaimStatus>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                // Terminal statuses are logged by the claimer at their own level
                Ok(status) if status.is_terminal() || status == ClaimStatus::Idle => {}
                Ok(status) => tracing::info!("{status}"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Status line skipped {skipped} updates");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    #[test]
    fn summary_shows_network_and_address() {
        let address = address!("00000000000000000000000000000000000000aa");
        let summary = session_summary(&Session::connected(address, 98866));
        assert!(summary.starts_with("Network: Plume"));
        assert!(summary.ends_with(&address.to_string()));

        assert_eq!(
            session_summary(&Session::disconnected()),
            "Network: Unknown | Address: not connected"
        );
    }

    #[test]
    fn hints_follow_session_state() {
        let address = address!("00000000000000000000000000000000000000aa");

        assert!(submit_hint(&Session::disconnected(), false)
            .unwrap()
            .contains("Connect"));
        assert!(submit_hint(&Session::connected(address, 1), false)
            .unwrap()
            .contains("switch"));
        assert_eq!(
            submit_hint(&Session::connected(address, 3637), true),
            Some("Claiming...")
        );
        assert_eq!(submit_hint(&Session::connected(address, 3637), false), None);
    }

    #[tokio::test]
    async fn status_line_ends_with_sender() {
        let (tx, rx) = broadcast::channel(4);
        let handle = spawn_status_line(rx);

        tx.send(ClaimStatus::Checking).unwrap();
        drop(tx);

        handle.await.unwrap();
    }
}
