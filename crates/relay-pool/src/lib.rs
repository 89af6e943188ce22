//! Pool module for the gasless swap relay.
//!
//! Pools are external collaborators with a fixed, callback-settled swap
//! interface: the pool releases the output first, then asks the caller to pay
//! what it owes through [`SwapCallback`], then checks that it was paid. This
//! crate defines that interface, the deterministic [`resolver`] that derives a
//! pool's address from its token pair and fee tier, a [`PoolDirectory`] of
//! deployed pools, and a constant-product reference pool for devnets.

use alloy_primitives::{Address, I256, U160};
use relay_types::{LedgerError, TokenLedger};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod constant_product;
}

pub mod constants;
pub mod resolver;

pub use constants::*;
pub use resolver::{compute_pool_address, PoolKey, PoolResolver};

/// Errors that can occur during a pool swap.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
	#[error("Swap amount must be non-zero")]
	ZeroAmount,
	#[error("Insufficient liquidity: {0}")]
	InsufficientLiquidity(String),
	#[error("Price limit {0} is on the wrong side of the current price or out of range")]
	InvalidPriceLimit(U160),
	#[error("Swap would move the price past the limit {0}")]
	PriceLimitReached(U160),
	#[error("Pool was not paid: expected {expected} more of {token}")]
	InputNotPaid { token: Address, expected: String },
	#[error("Swap callback rejected: {0}")]
	Callback(String),
	#[error("Arithmetic overflow in swap computation")]
	Overflow,
	#[error("Fee {0} leaves nothing of the input to trade")]
	UnsupportedFee(u32),
	#[error("Pool already deployed at {0}")]
	AlreadyDeployed(Address),
	#[error(transparent)]
	Ledger(#[from] LedgerError),
}

/// Failure raised by a [`SwapCallback`]; the pool aborts the swap with it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CallbackRejected(pub String);

/// Receiver of the pool's mid-swap payment request.
///
/// `caller` is the address of the pool making the call. Deltas follow the
/// pool's perspective: positive means the pool must receive that amount of
/// the token, negative means the pool has already sent it.
pub trait SwapCallback {
	fn swap_callback(
		&mut self,
		caller: Address,
		ledger: &mut TokenLedger,
		amount0_delta: I256,
		amount1_delta: I256,
		data: &[u8],
	) -> Result<(), CallbackRejected>;
}

/// Trait defining the fixed interface every pool exposes to the relay.
pub trait PoolInterface: Send + Sync {
	/// Address the pool is deployed at.
	fn address(&self) -> Address;

	/// Lower-sorted token of the pair.
	fn token0(&self) -> Address;

	/// Higher-sorted token of the pair.
	fn token1(&self) -> Address;

	/// Fee tier in hundredths of a basis point.
	fn fee(&self) -> u32;

	/// Swaps against the pool.
	///
	/// `amount_specified` is positive for exact input and negative for exact
	/// output. The output is sent to `recipient` before `callback` is invoked;
	/// the swap fails unless the pool's input balance grew by the owed amount
	/// once the callback returns. Returns `(amount0, amount1)` deltas.
	#[allow(clippy::too_many_arguments)]
	fn swap(
		&self,
		ledger: &mut TokenLedger,
		recipient: Address,
		zero_for_one: bool,
		amount_specified: I256,
		sqrt_price_limit_x96: U160,
		data: &[u8],
		callback: &mut dyn SwapCallback,
	) -> Result<(I256, I256), PoolError>;
}

/// Persistable description of a deployed pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDescriptor {
	pub address: Address,
	pub token0: Address,
	pub token1: Address,
	pub fee: u32,
}

impl PoolDescriptor {
	pub fn of(pool: &dyn PoolInterface) -> Self {
		Self {
			address: pool.address(),
			token0: pool.token0(),
			token1: pool.token1(),
			fee: pool.fee(),
		}
	}
}

/// Pools reachable from the relay, keyed by deployment address.
///
/// Cloning is cheap: pools are shared behind `Arc` and keep their reserves in
/// the [`TokenLedger`], not in the pool object.
#[derive(Clone, Default)]
pub struct PoolDirectory {
	pools: BTreeMap<Address, Arc<dyn PoolInterface>>,
}

impl PoolDirectory {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a pool under its own address.
	pub fn insert(&mut self, pool: Arc<dyn PoolInterface>) -> Result<(), PoolError> {
		let address = pool.address();
		if self.pools.contains_key(&address) {
			return Err(PoolError::AlreadyDeployed(address));
		}
		tracing::debug!(pool = %address, fee = pool.fee(), "Registered pool");
		self.pools.insert(address, pool);
		Ok(())
	}

	pub fn get(&self, address: &Address) -> Option<Arc<dyn PoolInterface>> {
		self.pools.get(address).cloned()
	}

	pub fn contains(&self, address: &Address) -> bool {
		self.pools.contains_key(address)
	}

	pub fn len(&self) -> usize {
		self.pools.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pools.is_empty()
	}

	/// Descriptions of every registered pool, ordered by address.
	pub fn descriptors(&self) -> Vec<PoolDescriptor> {
		self.pools
			.values()
			.map(|pool| PoolDescriptor::of(pool.as_ref()))
			.collect()
	}
}

impl std::fmt::Debug for PoolDirectory {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list().entries(self.descriptors()).finish()
	}
}
