use std::fmt;

use alloy::{
    primitives::{Address, Bytes},
    signers::local::PrivateKeySigner,
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    chain::{ChainKind, ChainProfile},
    console,
};

static PRIVATE_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{64}$").expect("static regex"));

const PRIVATE_KEY_VAR: &str = "PRIVATE_KEY";

/// A signer read from `PRIVATE_KEY_<index>`.
#[derive(Clone)]
pub struct WalletCredential {
    pub index: u32,
    pub signer: PrivateKeySigner,
}

impl WalletCredential {
    pub fn address(&self) -> Address {
        self.signer.address()
    }
}

impl fmt::Debug for WalletCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletCredential")
            .field("index", &self.index)
            .field("address", &self.address())
            .finish()
    }
}

pub fn is_valid_private_key(key: &str) -> bool {
    PRIVATE_KEY_PATTERN.is_match(key)
}

/// Reads `PRIVATE_KEY_1`, `PRIVATE_KEY_2`, ... until the first unset index.
/// Malformed keys are reported and skipped.
pub fn load_wallets<F>(lookup: F) -> Vec<WalletCredential>
where
    F: Fn(&str) -> Option<String>,
{
    let mut wallets = Vec::new();
    for index in 1u32.. {
        let var = format!("{PRIVATE_KEY_VAR}_{index}");
        let Some(raw) = lookup(&var) else {
            break;
        };
        let key = raw.trim();
        if !is_valid_private_key(key) {
            console::warn(&format!(
                "{var} is not 0x followed by 64 hex characters, skipping"
            ));
            continue;
        }
        match key.parse::<PrivateKeySigner>() {
            Ok(signer) => {
                tracing::debug!(index, address = %signer.address(), "loaded wallet");
                wallets.push(WalletCredential { index, signer });
            }
            Err(e) => {
                console::warn(&format!("{var} is not a usable secp256k1 key ({e}), skipping"))
            }
        }
    }
    wallets
}

/// Receiver bytes on the destination chain for `wallet`.
///
/// EVM destinations receive at the sender's own address. Cosmos destinations
/// need a bech32 address in `<receiver_env>_<index>`.
pub fn receiver_for<F>(
    destination: &ChainProfile,
    wallet: &WalletCredential,
    lookup: F,
) -> eyre::Result<Bytes>
where
    F: Fn(&str) -> Option<String>,
{
    match destination.kind {
        ChainKind::Evm => Ok(Bytes::copy_from_slice(wallet.address().as_slice())),
        ChainKind::Cosmos => {
            let env = destination.receiver_env.as_deref().unwrap_or_default();
            let prefix = destination.bech32_prefix.as_deref().unwrap_or_default();
            let var = format!("{env}_{}", wallet.index);
            let receiver = lookup(&var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| eyre::eyre!("{var} is not set, no {} receiver", destination.name))?;
            if !receiver.starts_with(&format!("{prefix}1")) {
                eyre::bail!("{var} must be a {prefix}1... address, got {receiver}");
            }
            Ok(Bytes::copy_from_slice(receiver.as_bytes()))
        }
    }
}
