use alloy::primitives::{TxHash, U256};
use thiserror::Error;

/// Failures surfaced by a single bridge transfer.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("insufficient {symbol} balance: have {have}, need {need}")]
    InsufficientBalance {
        symbol: String,
        have: U256,
        need: U256,
    },
    #[error("approval transaction {0} reverted")]
    ApprovalFailed(TxHash),
    #[error("transaction {0} not confirmed within {1}s")]
    ConfirmationTimeout(TxHash, u64),
    #[error("submission failed: {0}")]
    Submission(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Validation(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount must not be negative")]
    Negative,
    #[error("amount must be greater than zero")]
    Zero,
    #[error("invalid amount: {0}")]
    Invalid(String),
}
