//! Per-owner replay counters.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NonceError {
	#[error("Nonce mismatch: expected {expected}, got {presented}")]
	Mismatch { expected: U256, presented: U256 },
}

/// Next expected nonce per owner; starts at zero and only ever increments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonceRegistry {
	next: BTreeMap<Address, U256>,
}

impl NonceRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn expected(&self, owner: Address) -> U256 {
		self.next.get(&owner).copied().unwrap_or_default()
	}

	/// Consumes `presented` if it is the owner's next nonce and returns it.
	pub fn consume(&mut self, owner: Address, presented: U256) -> Result<U256, NonceError> {
		let expected = self.expected(owner);
		if presented != expected {
			return Err(NonceError::Mismatch {
				expected,
				presented,
			});
		}
		self.next.insert(owner, expected + U256::from(1u8));
		Ok(expected)
	}
}
