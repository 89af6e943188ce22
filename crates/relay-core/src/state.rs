//! Committed relay state.

use crate::escrow::EscrowLedger;
use crate::nonce::NonceRegistry;
use relay_types::TokenLedger;
use serde::{Deserialize, Serialize};

/// Everything a relayed swap may mutate. Operations run against a clone and
/// the clone replaces the original only on success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
	pub tokens: TokenLedger,
	pub escrow: EscrowLedger,
	pub nonces: NonceRegistry,
}

impl ChainState {
	pub fn new() -> Self {
		Self::default()
	}
}
