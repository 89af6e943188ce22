//! Deterministic pool address derivation.
//!
//! Pools are deployed with CREATE2 by a single factory, salted by the sorted
//! token pair and fee tier, so any party can compute a pool's address without
//! querying chain state.

use crate::constants::{DEFAULT_FACTORY, DEFAULT_POOL_INIT_CODE_HASH};
use alloy_primitives::{keccak256, Address, B256};
use serde::{Deserialize, Serialize};

/// Sorted token pair plus fee tier identifying one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolKey {
	pub token0: Address,
	pub token1: Address,
	pub fee: u32,
}

impl PoolKey {
	/// Builds the key, ordering the tokens ascending.
	pub fn new(token_a: Address, token_b: Address, fee: u32) -> Self {
		let (token0, token1) = if token_a < token_b {
			(token_a, token_b)
		} else {
			(token_b, token_a)
		};
		Self {
			token0,
			token1,
			fee,
		}
	}

	/// `keccak256(abi.encode(token0, token1, uint24 fee))`.
	pub fn salt(&self) -> B256 {
		let mut encoded = [0u8; 96];
		encoded[12..32].copy_from_slice(self.token0.as_slice());
		encoded[44..64].copy_from_slice(self.token1.as_slice());
		encoded[92..96].copy_from_slice(&self.fee.to_be_bytes());
		keccak256(encoded)
	}
}

/// CREATE2 address of the pool for `key` under `factory`.
pub fn compute_pool_address(factory: Address, key: &PoolKey, init_code_hash: B256) -> Address {
	factory.create2(key.salt(), init_code_hash)
}

/// Resolves pool addresses for a fixed factory and creation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolResolver {
	factory: Address,
	init_code_hash: B256,
}

impl PoolResolver {
	pub fn new(factory: Address, init_code_hash: B256) -> Self {
		Self {
			factory,
			init_code_hash,
		}
	}

	pub fn factory(&self) -> Address {
		self.factory
	}

	pub fn init_code_hash(&self) -> B256 {
		self.init_code_hash
	}

	/// Address of the pool trading `token_a`/`token_b` at `fee`, in either
	/// token order.
	pub fn resolve(&self, token_a: Address, token_b: Address, fee: u32) -> Address {
		compute_pool_address(
			self.factory,
			&PoolKey::new(token_a, token_b, fee),
			self.init_code_hash,
		)
	}
}

impl Default for PoolResolver {
	fn default() -> Self {
		Self::new(DEFAULT_FACTORY, DEFAULT_POOL_INIT_CODE_HASH)
	}
}
