pub mod abi;
pub mod args;
pub mod contract;
pub mod provider;
pub mod utils;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::TxHash;

/// How the selected method is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Read-only `eth_call`.
    Call,
    /// Gas estimate from the signer's address; nothing is submitted.
    Estimate,
    /// Sign, submit and wait for the receipt.
    Send,
}

impl Mode {
    pub fn from_flags(has_signer: bool, estimate_only: bool) -> Self {
        match (has_signer, estimate_only) {
            (false, _) => Self::Call,
            (true, true) => Self::Estimate,
            (true, false) => Self::Send,
        }
    }
}

/// What a successful invocation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Value(Vec<DynSolValue>),
    GasEstimate(u64),
    Confirmed { tx_hash: TxHash, block_number: u64 },
}
