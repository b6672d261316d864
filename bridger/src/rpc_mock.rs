//! JSON-RPC node stubs for tests that drive a real alloy provider over HTTP.

use alloy::{
    network::EthereumWallet,
    primitives::{Address, TxHash},
    signers::local::PrivateKeySigner,
};
use httpmock::{Method::POST, Mock, MockServer};
use serde_json::{json, Value};

/// First anvil dev account.
pub const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub fn dev_signer() -> PrivateKeySigner {
    DEV_KEY.parse().unwrap()
}

pub fn dev_wallet() -> EthereumWallet {
    EthereumWallet::from(dev_signer())
}

fn reply(result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": 0, "result": result })
}

/// Answers every call to `method`.
pub async fn method<'a>(server: &'a MockServer, method: &str, result: Value) -> Mock<'a> {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/")
                .json_body_partial(json!({ "method": method }).to_string());
            then.status(200)
                .header("content-type", "application/json")
                .json_body(reply(result));
        })
        .await
}

/// Answers `eth_call`s whose calldata starts with `selector`.
pub async fn call<'a>(server: &'a MockServer, selector: &str, result: Value) -> Mock<'a> {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/")
                .json_body_partial(json!({ "method": "eth_call" }).to_string())
                .body_contains(selector);
            then.status(200)
                .header("content-type", "application/json")
                .json_body(reply(result));
        })
        .await
}

pub fn word(value: u64) -> Value {
    json!(format!("0x{value:064x}"))
}

pub fn latest_block(base_fee: u64) -> Value {
    let zero32 = format!("0x{}", "00".repeat(32));
    json!({
        "hash": format!("0x{}", "11".repeat(32)),
        "parentHash": zero32,
        "sha3Uncles": zero32,
        "miner": format!("0x{}", "00".repeat(20)),
        "stateRoot": zero32,
        "transactionsRoot": zero32,
        "receiptsRoot": zero32,
        "logsBloom": format!("0x{}", "00".repeat(256)),
        "difficulty": "0x0",
        "number": "0x10",
        "gasLimit": "0x1c9c380",
        "gasUsed": "0x0",
        "timestamp": "0x6553f100",
        "extraData": "0x",
        "mixHash": zero32,
        "nonce": "0x0000000000000000",
        "baseFeePerGas": format!("0x{base_fee:x}"),
        "size": "0x200",
        "uncles": [],
        "transactions": []
    })
}

pub fn fee_history(base_fee: u64) -> Value {
    json!({
        "oldestBlock": "0x10",
        "baseFeePerGas": [format!("0x{base_fee:x}"), format!("0x{base_fee:x}")],
        "gasUsedRatio": [0.5],
        "reward": [["0x59682f00"]]
    })
}

pub fn receipt(hash: TxHash, from: Address, to: Address, success: bool) -> Value {
    json!({
        "type": "0x2",
        "status": if success { "0x1" } else { "0x0" },
        "cumulativeGasUsed": "0x5208",
        "logs": [],
        "logsBloom": format!("0x{}", "00".repeat(256)),
        "transactionHash": hash.to_string(),
        "transactionIndex": "0x0",
        "blockHash": format!("0x{}", "22".repeat(32)),
        "blockNumber": "0x11",
        "gasUsed": "0x5208",
        "effectiveGasPrice": "0x77359400",
        "from": from.to_string(),
        "to": to.to_string(),
        "contractAddress": null
    })
}

/// Everything a wallet provider needs to fill, sign and send a transaction,
/// which the node acknowledges as `hash`. Returns the `eth_sendRawTransaction` stub.
pub async fn accept_transactions(server: &MockServer, hash: TxHash) -> Mock<'_> {
    method(server, "eth_chainId", json!("0xaa36a7")).await;
    method(server, "eth_getTransactionCount", json!("0x0")).await;
    method(server, "eth_getBlockByNumber", latest_block(1_000_000_000)).await;
    method(server, "eth_feeHistory", fee_history(1_000_000_000)).await;
    method(server, "eth_estimateGas", json!("0x30d40")).await;
    method(server, "eth_sendRawTransaction", json!(hash.to_string())).await
}
