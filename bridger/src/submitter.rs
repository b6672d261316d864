use std::{marker::PhantomData, time::Duration};

use alloy::{
    eips::BlockNumberOrTag,
    network::{Ethereum, TransactionBuilder},
    primitives::{Address, TxHash, B256, U256},
    providers::Provider,
    rpc::types::BlockTransactionsKind,
    transports::Transport,
};
use eyre::OptionExt;

use crate::{bindings::UCS03Zkgm, chain::RouteProfile, error::BridgeError};

/// Gas limit headroom over the node's estimate, in percent.
const GAS_LIMIT_MARGIN: u64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasFees {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// EIP-1559 fees from the latest base fee: room for the base fee to double
/// before the transaction is priced out.
pub fn gas_fees(base_fee: u128, priority_fee: u128) -> GasFees {
    GasFees {
        max_fee_per_gas: base_fee.saturating_mul(2).saturating_add(priority_fee),
        max_priority_fee_per_gas: priority_fee,
    }
}

pub fn gas_limit(estimate: u64) -> u64 {
    estimate.saturating_mul(GAS_LIMIT_MARGIN) / 100
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Confirmed { hash: TxHash, block: Option<u64> },
    Reverted { hash: TxHash },
    TimedOut { hash: TxHash },
}

impl Submission {
    pub fn hash(&self) -> TxHash {
        match self {
            Submission::Confirmed { hash, .. }
            | Submission::Reverted { hash }
            | Submission::TimedOut { hash } => *hash,
        }
    }
}

/// Everything `send` needs besides the instruction.
#[derive(Debug, Clone, Copy)]
pub struct SendParams {
    pub channel_id: u32,
    pub timeout_timestamp: u64,
    pub salt: B256,
    pub value: U256,
}

impl SendParams {
    pub fn for_route(
        route: &RouteProfile,
        amount: U256,
        timeout_timestamp: u64,
        salt: B256,
    ) -> Self {
        Self {
            channel_id: route.channel_id,
            timeout_timestamp,
            salt,
            // Native transfers carry the amount as call value.
            value: if route.asset.native { amount } else { U256::ZERO },
        }
    }
}

pub struct Submitter<'a, P, T> {
    provider: P,
    bridge: &'a Address,
    sender: Address,
    priority_fee: u128,
    confirmation_timeout: Duration,
    _phantom: PhantomData<T>,
}

impl<'a, P, T> Submitter<'a, P, T>
where
    P: Provider<T, Ethereum>,
    T: Transport + Clone,
{
    pub fn new(
        provider: P,
        bridge: &'a Address,
        sender: Address,
        priority_fee: u128,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            bridge,
            sender,
            priority_fee,
            confirmation_timeout,
            _phantom: PhantomData,
        }
    }

    /// Current fees derived from the latest block's base fee.
    pub async fn fees(&self) -> eyre::Result<GasFees> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest, BlockTransactionsKind::Hashes)
            .await?
            .ok_or_eyre("latest block not found")?;
        let base_fee = block
            .header
            .base_fee_per_gas
            .ok_or_eyre("chain does not report a base fee")?;
        Ok(gas_fees(base_fee as u128, self.priority_fee))
    }

    /// Sends one bridge transfer and waits up to the confirmation timeout for it.
    ///
    /// A timeout leaves the transaction in flight; its outcome is not observed.
    pub async fn submit(
        &self,
        instruction: UCS03Zkgm::Instruction,
        params: SendParams,
    ) -> eyre::Result<Submission> {
        let fees = self.fees().await?;
        let bridge = UCS03Zkgm::new(*self.bridge, &self.provider);

        let tx = bridge
            .send(
                params.channel_id,
                0,
                params.timeout_timestamp,
                params.salt,
                instruction,
            )
            .value(params.value)
            .into_transaction_request()
            .with_from(self.sender);

        let estimate = self
            .provider
            .estimate_gas(&tx)
            .await
            .map_err(|e| BridgeError::Submission(format!("gas estimation failed: {e}")))?;
        let tx = tx
            .with_gas_limit(gas_limit(estimate))
            .with_max_fee_per_gas(fees.max_fee_per_gas)
            .with_max_priority_fee_per_gas(fees.max_priority_fee_per_gas);
        tracing::debug!(
            estimate,
            max_fee = fees.max_fee_per_gas,
            priority = fees.max_priority_fee_per_gas,
            "sending bridge transfer"
        );

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| BridgeError::Submission(e.to_string()))?;
        let hash = *pending.tx_hash();
        tracing::info!(tx_hash = %hash, "submitted transaction");

        let receipt = tokio::time::timeout(
            self.confirmation_timeout,
            pending.with_required_confirmations(1).get_receipt(),
        )
        .await;

        match receipt {
            Err(_elapsed) => Ok(Submission::TimedOut { hash }),
            Ok(Err(e)) => Err(BridgeError::Submission(e.to_string()).into()),
            Ok(Ok(receipt)) if receipt.status() => Ok(Submission::Confirmed {
                hash,
                block: receipt.block_number,
            }),
            Ok(Ok(_)) => Ok(Submission::Reverted { hash }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc_mock;
    use alloy::{primitives::Bytes, providers::ProviderBuilder};
    use httpmock::MockServer;
    use serde_json::{json, Value};

    #[test]
    fn fees_from_base_fee() {
        let fees = gas_fees(10_000_000_000, 1_500_000_000);
        assert_eq!(fees.max_fee_per_gas, 21_500_000_000);
        assert_eq!(fees.max_priority_fee_per_gas, 1_500_000_000);
        assert_eq!(gas_fees(u128::MAX, 1).max_fee_per_gas, u128::MAX);
    }

    #[test]
    fn limit_has_headroom() {
        assert_eq!(gas_limit(100_000), 120_000);
        assert_eq!(gas_limit(0), 0);
    }

    #[test]
    fn native_routes_carry_value() {
        let config = crate::chain::Config::load(None).unwrap();
        let amount = U256::from(7u64);

        let native =
            SendParams::for_route(config.route("holesky-sepolia").unwrap(), amount, 1, B256::ZERO);
        assert_eq!(native.value, amount);
        assert_eq!(native.channel_id, 2);

        let token =
            SendParams::for_route(config.route("sepolia-holesky").unwrap(), amount, 1, B256::ZERO);
        assert_eq!(token.value, U256::ZERO);
    }

    #[tokio::test]
    async fn fees_read_latest_base_fee() {
        let server = MockServer::start_async().await;
        let latest = rpc_mock::latest_block(1_000_000_000);
        let block = rpc_mock::method(&server, "eth_getBlockByNumber", latest).await;

        let provider = ProviderBuilder::new().on_http(server.base_url().parse().unwrap());
        let bridge = Address::repeat_byte(0x5f);
        let submitter = Submitter::new(
            &provider,
            &bridge,
            Address::repeat_byte(0x01),
            1_500_000_000,
            Duration::from_secs(1),
        );
        let fees = submitter.fees().await.unwrap();
        assert_eq!(fees.max_fee_per_gas, 3_500_000_000);
        block.assert_async().await;
    }

    fn instruction() -> UCS03Zkgm::Instruction {
        UCS03Zkgm::Instruction {
            version: 1,
            opcode: 3,
            operand: Bytes::from_static(&[0u8; 64]),
        }
    }

    fn params() -> SendParams {
        SendParams {
            channel_id: 8,
            timeout_timestamp: 1,
            salt: B256::repeat_byte(0x07),
            value: U256::ZERO,
        }
    }

    /// Submits one transfer against a node whose receipt lookup answers `receipt`.
    async fn submit_with_receipt(hash: TxHash, receipt: Value, timeout: Duration) -> Submission {
        let server = MockServer::start_async().await;
        let sent = rpc_mock::accept_transactions(&server, hash).await;
        rpc_mock::method(&server, "eth_getTransactionReceipt", receipt).await;

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(rpc_mock::dev_wallet())
            .on_http(server.base_url().parse().unwrap());
        let bridge = Address::repeat_byte(0x5f);
        let submitter = Submitter::new(
            &provider,
            &bridge,
            rpc_mock::dev_signer().address(),
            1_500_000_000,
            timeout,
        );

        let submission = submitter.submit(instruction(), params()).await.unwrap();
        sent.assert_hits_async(1).await;
        submission
    }

    #[tokio::test]
    async fn mined_transfer_is_confirmed() {
        let hash = TxHash::repeat_byte(0xab);
        let receipt = rpc_mock::receipt(
            hash,
            rpc_mock::dev_signer().address(),
            Address::repeat_byte(0x5f),
            true,
        );
        let submission = submit_with_receipt(hash, receipt, Duration::from_secs(10)).await;
        assert_eq!(
            submission,
            Submission::Confirmed {
                hash,
                block: Some(0x11)
            }
        );
    }

    #[tokio::test]
    async fn reverted_transfer_is_reported() {
        let hash = TxHash::repeat_byte(0xab);
        let receipt = rpc_mock::receipt(
            hash,
            rpc_mock::dev_signer().address(),
            Address::repeat_byte(0x5f),
            false,
        );
        let submission = submit_with_receipt(hash, receipt, Duration::from_secs(10)).await;
        assert_eq!(submission, Submission::Reverted { hash });
    }

    #[tokio::test]
    async fn missing_receipt_times_out_without_resending() {
        let hash = TxHash::repeat_byte(0xab);
        let started = std::time::Instant::now();
        let submission = submit_with_receipt(hash, json!(null), Duration::from_secs(2)).await;
        assert_eq!(submission, Submission::TimedOut { hash });
        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}
