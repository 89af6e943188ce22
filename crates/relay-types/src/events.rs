//! Event types published by the relay engine.
//!
//! Events are only emitted for committed state: a rejected or previewed
//! operation publishes at most a [`SwapEvent::Rejected`], never a balance or
//! nonce change.

use crate::receipt::SwapReceipt;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all relay events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RelayEvent {
	/// Gas tank movements.
	Escrow(EscrowEvent),
	/// Relayed swap outcomes.
	Swap(SwapEvent),
}

/// Events related to the escrow ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EscrowEvent {
	Deposited { owner: Address, value: U256 },
	Withdrawn { owner: Address, value: U256 },
}

/// Events related to relayed swaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SwapEvent {
	/// A relayed swap settled and was committed.
	Settled { receipt: SwapReceipt },
	/// A submission was rejected; nothing was committed.
	Rejected { relayer: Address, reason: String },
}
