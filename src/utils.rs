use std::{path::Path, str::FromStr, sync::Arc};

use alloy::{network::EthereumWallet, signers::local::PrivateKeySigner};

use tokio::io::AsyncBufReadExt;

pub async fn read_file_lines(path: impl AsRef<Path>) -> eyre::Result<Vec<String>> {
    let file = tokio::fs::read(path).await?;
    let mut lines = file.lines();

    let mut contents = vec![];
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if !line.is_empty() {
            contents.push(line.to_string());
        }
    }

    Ok(contents)
}

/// First non-empty line of the key file is the signer.
pub async fn read_private_key(path: impl AsRef<Path>) -> eyre::Result<Arc<EthereumWallet>> {
    let path = path.as_ref();
    let lines = read_file_lines(path)
        .await
        .map_err(|e| eyre::eyre!("Failed to read private key file {}: {e}", path.display()))?;

    let pk = lines
        .first()
        .ok_or_else(|| eyre::eyre!("Private key file {} is empty", path.display()))?;
    let signer = PrivateKeySigner::from_str(pk)
        .map_err(|_| eyre::eyre!("Private key in {} is not valid", path.display()))?;

    Ok(Arc::new(EthereumWallet::new(signer)))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use alloy::network::{Ethereum, NetworkWallet};

    use super::*;

    // anvil's first dev account
    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[tokio::test]
    async fn skips_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\n  first \n\nsecond").unwrap();

        let lines = read_file_lines(file.path()).await.unwrap();
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn loads_signer_from_first_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "\n{DEV_KEY}").unwrap();

        let wallet = read_private_key(file.path()).await.unwrap();
        let address = <EthereumWallet as NetworkWallet<Ethereum>>::default_signer_address(&wallet);
        assert_eq!(
            address.to_string(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
    }

    #[tokio::test]
    async fn rejects_garbage_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not-a-key").unwrap();

        let err = read_private_key(file.path()).await.unwrap_err();
        assert!(err.to_string().contains("not valid"));
    }

    #[tokio::test]
    async fn rejects_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();

        let err = read_private_key(file.path()).await.unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
