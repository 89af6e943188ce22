//! Submission context and settlement receipts.

use crate::authorization::SwapDirection;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Execution context of a relayed submission: who sent it, the fee rate
/// they paid and the time it was sequenced at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelaySubmission {
	/// Account submitting the authorization and receiving the incentive.
	pub relayer: Address,
	/// Fee rate paid for the submission, in the escrow unit per gas unit.
	pub fee_rate: U256,
	/// Sequencing time in unix seconds.
	pub timestamp: u64,
}

/// Record of one committed settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapReceipt {
	pub owner: Address,
	/// Nonce consumed by this settlement.
	pub nonce: U256,
	pub pool: Address,
	pub direction: SwapDirection,
	pub input_asset: Address,
	pub output_asset: Address,
	pub amount_in: U256,
	pub amount_out: U256,
	/// Output for exact-input swaps, input for exact-output swaps.
	pub settled: U256,
	/// Escrow value spent funding a wrapped-native input leg.
	pub escrow_value: U256,
	/// Amount credited to the relayer's escrow account.
	pub incentive: U256,
	pub relayer: Address,
	pub timestamp: u64,
}

impl SwapReceipt {
	/// Storage identifier of the receipt.
	pub fn id(&self) -> String {
		receipt_id(self.owner, self.nonce)
	}
}

/// Storage identifier for the receipt of `owner`'s settlement at `nonce`.
pub fn receipt_id(owner: Address, nonce: U256) -> String {
	format!("{}-{}", owner, nonce)
}
