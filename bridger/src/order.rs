use crate::{
    bindings::UCS03Zkgm,
    chain::{quote_token_bytes, ChainProfile, RouteProfile},
};
use alloy::{
    primitives::{keccak256, Address, Bytes, B256, U256},
    sol_types::SolValue,
};

pub const INSTRUCTION_VERSION: u8 = 1;
pub const OP_FUNGIBLE_ASSET_ORDER: u8 = 3;

/// One fungible asset transfer, as carried in a zkgm instruction operand.
#[derive(Debug, Clone)]
pub struct FungibleAssetOrder {
    pub sender: Bytes,
    pub receiver: Bytes,
    pub base_token: Address,
    pub base_amount: U256,
    pub base_token_symbol: String,
    pub base_token_name: String,
    pub base_token_decimals: u8,
    pub base_token_path: U256,
    pub quote_token: Bytes,
    pub quote_amount: U256,
}

impl FungibleAssetOrder {
    /// Builds a 1:1 order for `route`: the quote side receives what the base side locks.
    pub fn for_route(
        route: &RouteProfile,
        destination: &ChainProfile,
        sender: Address,
        receiver: Bytes,
        amount: U256,
    ) -> eyre::Result<Self> {
        let quote_token = quote_token_bytes(destination, &route.asset.quote_token)?;
        Ok(Self {
            sender: Bytes::copy_from_slice(sender.as_slice()),
            receiver,
            base_token: route.asset.base_token,
            base_amount: amount,
            base_token_symbol: route.asset.symbol.clone(),
            base_token_name: route.asset.name.clone(),
            base_token_decimals: route.asset.decimals,
            base_token_path: route.asset.token_path(),
            quote_token,
            quote_amount: amount,
        })
    }

    /// ABI parameter encoding of the order, the layout the contract decodes.
    pub fn encode(&self) -> Bytes {
        UCS03Zkgm::FungibleAssetOrder::from(self)
            .abi_encode_params()
            .into()
    }
}

impl From<&FungibleAssetOrder> for UCS03Zkgm::FungibleAssetOrder {
    fn from(order: &FungibleAssetOrder) -> Self {
        UCS03Zkgm::FungibleAssetOrder {
            sender: order.sender.clone(),
            receiver: order.receiver.clone(),
            baseToken: Bytes::copy_from_slice(order.base_token.as_slice()),
            baseAmount: order.base_amount,
            baseTokenSymbol: order.base_token_symbol.clone(),
            baseTokenName: order.base_token_name.clone(),
            baseTokenDecimals: order.base_token_decimals,
            baseTokenPath: order.base_token_path,
            quoteToken: order.quote_token.clone(),
            quoteAmount: order.quote_amount,
        }
    }
}

impl From<&FungibleAssetOrder> for UCS03Zkgm::Instruction {
    fn from(order: &FungibleAssetOrder) -> Self {
        UCS03Zkgm::Instruction {
            version: INSTRUCTION_VERSION,
            opcode: OP_FUNGIBLE_ASSET_ORDER,
            operand: order.encode(),
        }
    }
}

/// `keccak256(abi.encodePacked(sender, now_ms))`, unique per submission.
pub fn salt(sender: Address, now_ms: u64) -> B256 {
    keccak256((sender, U256::from(now_ms)).abi_encode_packed())
}

/// Destination-side deadline in nanoseconds since the epoch.
pub fn timeout_timestamp(now_ns: u64, window_secs: u64) -> u64 {
    now_ns.saturating_add(window_secs.saturating_mul(1_000_000_000))
}
