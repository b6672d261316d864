use alloy::{
    network::Ethereum,
    primitives::{Address, U256},
    providers::Provider,
    transports::Transport,
};

use crate::{bindings::IERC20, chain::RouteProfile, console, error::BridgeError};

/// Checks that `owner` can send `amount` through the bridge, approving the
/// bridge for the token once if its allowance falls short.
///
/// `Ok(false)` means the balance is too low and the transfer should be skipped.
pub async fn ensure_funds<P, T>(
    provider: &P,
    owner: Address,
    route: &RouteProfile,
    bridge: Address,
    amount: U256,
) -> eyre::Result<bool>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    let asset = &route.asset;

    if asset.native {
        let balance = provider.get_balance(owner).await?;
        tracing::debug!(%owner, %balance, "native balance");
        if balance < amount {
            console::error(
                &BridgeError::InsufficientBalance {
                    symbol: asset.symbol.clone(),
                    have: balance,
                    need: amount,
                }
                .to_string(),
            );
            return Ok(false);
        }
        return Ok(true);
    }

    let token = IERC20::new(asset.base_token, provider);

    let balance = token.balanceOf(owner).call().await?._0;
    tracing::debug!(%owner, %balance, token = %asset.base_token, "token balance");
    if balance < amount {
        console::error(
            &BridgeError::InsufficientBalance {
                symbol: asset.symbol.clone(),
                have: balance,
                need: amount,
            }
            .to_string(),
        );
        return Ok(false);
    }

    let allowance = token.allowance(owner, bridge).call().await?._0;
    if allowance >= amount {
        return Ok(true);
    }

    console::loading(&format!("Approving {} for the bridge contract...", asset.symbol));
    let receipt = token
        .approve(bridge, U256::MAX)
        .send()
        .await?
        .get_receipt()
        .await?;
    if !receipt.status() {
        return Err(BridgeError::ApprovalFailed(receipt.transaction_hash).into());
    }
    console::success(&format!("Approval confirmed: {}", receipt.transaction_hash));

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chain::Config,
        rpc_mock::{self, word},
    };
    use alloy::{primitives::TxHash, providers::ProviderBuilder};
    use httpmock::MockServer;
    use serde_json::json;

    const BALANCE_OF: &str = "0x70a08231";
    const ALLOWANCE: &str = "0xdd62ed3e";

    #[tokio::test]
    async fn native_balance_decides() {
        let server = MockServer::start_async().await;
        let balance = rpc_mock::method(&server, "eth_getBalance", json!("0x64")).await;

        let provider = ProviderBuilder::new().on_http(server.base_url().parse().unwrap());
        let config = Config::load(None).unwrap();
        let route = config.route("holesky-sepolia").unwrap();
        let owner = Address::repeat_byte(0x11);
        let bridge = config.bridge.contract;

        let ok = ensure_funds(&provider, owner, route, bridge, U256::from(100u64)).await.unwrap();
        assert!(ok);
        let ok = ensure_funds(&provider, owner, route, bridge, U256::from(101u64)).await.unwrap();
        assert!(!ok);

        balance.assert_hits_async(2).await;
    }

    #[tokio::test]
    async fn token_with_allowance_needs_no_approval() {
        let server = MockServer::start_async().await;
        let balance = rpc_mock::call(&server, BALANCE_OF, word(5_000_000)).await;
        let allowance = rpc_mock::call(&server, ALLOWANCE, word(5_000_000)).await;

        let provider = ProviderBuilder::new().on_http(server.base_url().parse().unwrap());
        let config = Config::load(None).unwrap();
        let route = config.route("sepolia-holesky").unwrap();

        let ok = ensure_funds(
            &provider,
            Address::repeat_byte(0x22),
            route,
            config.bridge.contract,
            U256::from(1_000_000u64),
        )
        .await
        .unwrap();
        assert!(ok);

        balance.assert_async().await;
        allowance.assert_async().await;
    }

    #[tokio::test]
    async fn token_balance_below_amount_skips_before_allowance() {
        let server = MockServer::start_async().await;
        let balance = rpc_mock::call(&server, BALANCE_OF, word(0)).await;
        let allowance = rpc_mock::call(&server, ALLOWANCE, word(0)).await;

        let provider = ProviderBuilder::new().on_http(server.base_url().parse().unwrap());
        let config = Config::load(None).unwrap();
        let route = config.route("sepolia-babylon").unwrap();

        let ok = ensure_funds(
            &provider,
            Address::repeat_byte(0x33),
            route,
            config.bridge.contract,
            U256::from(1u64),
        )
        .await
        .unwrap();
        assert!(!ok);

        balance.assert_async().await;
        allowance.assert_hits_async(0).await;
    }

    /// Balance covers the amount, allowance is zero, approval lands with `approved`.
    async fn approve_once(hash: TxHash, approved: bool) -> eyre::Result<bool> {
        let server = MockServer::start_async().await;
        let owner = rpc_mock::dev_signer().address();
        let config = Config::load(None).unwrap();
        let route = config.route("sepolia-holesky").unwrap();

        rpc_mock::call(&server, BALANCE_OF, word(5_000_000)).await;
        rpc_mock::call(&server, ALLOWANCE, word(0)).await;
        let sent = rpc_mock::accept_transactions(&server, hash).await;
        rpc_mock::method(
            &server,
            "eth_getTransactionReceipt",
            rpc_mock::receipt(hash, owner, route.asset.base_token, approved),
        )
        .await;

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(rpc_mock::dev_wallet())
            .on_http(server.base_url().parse().unwrap());
        let result = ensure_funds(
            &provider,
            owner,
            route,
            config.bridge.contract,
            U256::from(1_000_000u64),
        )
        .await;
        sent.assert_hits_async(1).await;
        result
    }

    #[tokio::test]
    async fn short_allowance_is_approved_once() {
        assert!(approve_once(TxHash::repeat_byte(0xab), true).await.unwrap());
    }

    #[tokio::test]
    async fn reverted_approval_is_an_error() {
        let hash = TxHash::repeat_byte(0xcd);
        let err = approve_once(hash, false).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BridgeError>(),
            Some(BridgeError::ApprovalFailed(h)) if *h == hash
        ));
    }
}
