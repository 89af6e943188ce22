//! Core relay engine for the gasless swap relay.
//!
//! Composes the payload codec, signature verifier, nonce registry, pool
//! resolver, swap executor and escrow ledger into a single all-or-nothing
//! `relayed_swap` operation, and wraps that in the async [`RelayEngine`]
//! which serializes access to the committed state, persists it and publishes
//! events after each commit.

use alloy_primitives::{Address, U256};
use relay_account::VerifyError;
use relay_pool::PoolError;
use relay_settlement::SettlementError;
use relay_storage::StorageError;
use relay_types::{CodecError, LedgerError};
use thiserror::Error;

pub mod builder;
pub mod engine;
pub mod escrow;
pub mod nonce;
pub mod relay;
pub mod state;

pub use builder::{BuilderError, RelayBuilder, RelayFactories};
pub use engine::{event_bus::EventBus, RelayEngine};
pub use escrow::{EscrowError, EscrowLedger};
pub use nonce::{NonceError, NonceRegistry};
pub use relay::Relay;
pub use state::ChainState;

/// Errors surfaced to whoever invoked a relay operation.
///
/// Every variant aborts the operation with no state change.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
	#[error("Malformed payload: {0}")]
	MalformedPayload(#[from] CodecError),
	#[error("Invalid signature: {0}")]
	InvalidSignature(#[from] VerifyError),
	#[error("Authorization expired at {deadline}, now {now}")]
	DeadlineExpired { deadline: U256, now: u64 },
	#[error("Nonce mismatch: expected {expected}, got {presented}")]
	NonceMismatch { expected: U256, presented: U256 },
	#[error("Pool mismatch: authorization names {signed}, resolved {resolved}")]
	PoolMismatch { signed: Address, resolved: Address },
	#[error("Slippage exceeded: {0}")]
	SlippageExceeded(String),
	#[error("Unauthorized callback from {caller}, expected {expected}")]
	UnauthorizedCallback { caller: Address, expected: Address },
	#[error("Insufficient escrow for {owner}: have {available}, need {required}")]
	InsufficientEscrow {
		owner: Address,
		available: U256,
		required: U256,
	},
	#[error("Escrow balance of {owner} would overflow")]
	EscrowOverflow { owner: Address },
	#[error("Settlement callback invoked more than once")]
	ReentrantCallback,
	#[error("Swap failed: {0}")]
	SwapFailed(String),
	#[error("Token ledger error: {0}")]
	Ledger(#[from] LedgerError),
	#[error("Pool deployment failed: {0}")]
	Deployment(String),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Storage error: {0}")]
	Storage(String),
}

impl From<NonceError> for RelayError {
	fn from(err: NonceError) -> Self {
		match err {
			NonceError::Mismatch {
				expected,
				presented,
			} => RelayError::NonceMismatch {
				expected,
				presented,
			},
		}
	}
}

impl From<EscrowError> for RelayError {
	fn from(err: EscrowError) -> Self {
		match err {
			EscrowError::InsufficientEscrow {
				owner,
				available,
				required,
			} => RelayError::InsufficientEscrow {
				owner,
				available,
				required,
			},
			EscrowError::Overflow { owner } => RelayError::EscrowOverflow { owner },
		}
	}
}

impl From<SettlementError> for RelayError {
	fn from(err: SettlementError) -> Self {
		match err {
			SettlementError::UnauthorizedCallback { caller, expected } => {
				RelayError::UnauthorizedCallback { caller, expected }
			}
			SettlementError::ReentrantCallback => RelayError::ReentrantCallback,
			SettlementError::SwapFailed(reason) => RelayError::SwapFailed(reason),
			slippage => RelayError::SlippageExceeded(slippage.to_string()),
		}
	}
}

impl From<PoolError> for RelayError {
	fn from(err: PoolError) -> Self {
		RelayError::Deployment(err.to_string())
	}
}

impl From<StorageError> for RelayError {
	fn from(err: StorageError) -> Self {
		RelayError::Storage(err.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::U160;

	#[test]
	fn test_settlement_errors_map_to_relay_taxonomy() {
		let limit = U160::from(42u8);
		assert!(matches!(
			RelayError::from(SettlementError::PriceLimitExceeded(limit)),
			RelayError::SlippageExceeded(_)
		));
		assert!(matches!(
			RelayError::from(SettlementError::InputAboveMaximum {
				amount_in: U256::from(2),
				maximum: U256::from(1),
			}),
			RelayError::SlippageExceeded(_)
		));
		assert_eq!(
			RelayError::from(SettlementError::ReentrantCallback),
			RelayError::ReentrantCallback
		);
	}
}
