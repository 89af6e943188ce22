//! Settlement module for the gasless swap relay.
//!
//! The [`SwapExecutor`] drives one callback-settled swap against the pool an
//! authorization names: it derives the direction and signed amount, calls the
//! pool, pays the input leg from inside the callback and enforces the signed
//! slippage bounds on the realized amounts. It operates on whatever ledger it
//! is handed; atomicity is the caller's concern.

use alloy_primitives::{Address, I256, U160, U256};
use relay_pool::{extreme_price_limit, PoolDirectory, PoolError};
use relay_types::{Authorization, CallbackContext, SwapDirection, TokenLedger};
use thiserror::Error;

mod callback;

use callback::SettlementCallback;

/// Errors that can occur while settling a swap.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettlementError {
	/// The callback was invoked by something other than the resolved pool.
	#[error("Callback from {caller}, expected pool {expected}")]
	UnauthorizedCallback { caller: Address, expected: Address },
	/// The callback was invoked more than once during a single swap.
	#[error("Callback invoked more than once")]
	ReentrantCallback,
	/// Exact input delivered less than the signed minimum, or exact output
	/// delivered less than the requested amount.
	#[error("Output {amount_out} below minimum {minimum}")]
	OutputBelowMinimum { amount_out: U256, minimum: U256 },
	/// Exact output cost more than the signed maximum.
	#[error("Input {amount_in} above maximum {maximum}")]
	InputAboveMaximum { amount_in: U256, maximum: U256 },
	/// The pool refused to trade past the signed sqrt-price limit.
	#[error("Price limit {0} reached")]
	PriceLimitExceeded(U160),
	/// Pool-side failure: missing pool, pair mismatch, liquidity, payment.
	#[error("Swap failed: {0}")]
	SwapFailed(String),
}

impl SettlementError {
	/// True for the failures that mean the realized price was worse than
	/// signed.
	pub fn is_slippage(&self) -> bool {
		matches!(
			self,
			Self::OutputBelowMinimum { .. } | Self::InputAboveMaximum { .. } | Self::PriceLimitExceeded(_)
		)
	}
}

/// One swap to settle: the verified terms and the pool they resolve to.
#[derive(Debug, Clone, Copy)]
pub struct SettlementRequest<'a> {
	pub authorization: &'a Authorization,
	pub context: &'a CallbackContext,
	/// Pool address resolved from the context and matched against the
	/// authorization.
	pub pool: Address,
	/// Opaque bytes forwarded to the pool's callback.
	pub data: &'a [u8],
}

/// Realized amounts of a settled swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementOutcome {
	/// Output for exact input, input for exact output.
	pub settled: U256,
	pub amount_in: U256,
	pub amount_out: U256,
	/// Escrow value consumed funding a wrapped-native input leg; zero for
	/// token-funded inputs.
	pub escrow_value: U256,
}

/// Executes callback-settled swaps on behalf of the relay.
#[derive(Debug, Clone, Copy)]
pub struct SwapExecutor {
	/// Token whose input leg is funded from escrow instead of a balance.
	wrapped_native: Address,
	/// Spender the owners approve for token-funded input legs.
	relay_address: Address,
}

impl SwapExecutor {
	pub fn new(wrapped_native: Address, relay_address: Address) -> Self {
		Self {
			wrapped_native,
			relay_address,
		}
	}

	pub fn wrapped_native(&self) -> Address {
		self.wrapped_native
	}

	pub fn relay_address(&self) -> Address {
		self.relay_address
	}

	/// Runs the swap and checks the realized amounts against the signed
	/// bounds.
	///
	/// On error `ledger` may hold a partially applied swap and must be
	/// discarded.
	pub fn execute(
		&self,
		pools: &PoolDirectory,
		ledger: &mut TokenLedger,
		request: SettlementRequest<'_>,
	) -> Result<SettlementOutcome, SettlementError> {
		let SettlementRequest {
			authorization,
			context,
			pool: pool_address,
			data,
		} = request;

		let pool = pools
			.get(&pool_address)
			.ok_or_else(|| SettlementError::SwapFailed(format!("no pool deployed at {}", pool_address)))?;

		let zero_for_one = context.zero_for_one();
		let (token0, token1) = if zero_for_one {
			(context.input_asset, context.output_asset)
		} else {
			(context.output_asset, context.input_asset)
		};
		if pool.token0() != token0 || pool.token1() != token1 || pool.fee() != context.fee_tier {
			return Err(SettlementError::SwapFailed(format!(
				"pool {} does not trade {}/{} at fee {}",
				pool_address, token0, token1, context.fee_tier
			)));
		}

		let magnitude = I256::try_from(authorization.amount)
			.map_err(|_| SettlementError::SwapFailed("amount exceeds int256".into()))?;
		let amount_specified = match authorization.direction {
			SwapDirection::ExactInput => magnitude,
			SwapDirection::ExactOutput => -magnitude,
		};
		let price_limit = if authorization.price_limit.is_zero() {
			extreme_price_limit(zero_for_one)
		} else {
			authorization.price_limit
		};

		let received_before = ledger.balance_of(context.output_asset, context.beneficiary);
		let mut callback =
			SettlementCallback::new(pool_address, context, self.wrapped_native, self.relay_address);

		tracing::debug!(
			pool = %pool_address,
			zero_for_one,
			amount_specified = %amount_specified,
			price_limit = %price_limit,
			"Calling pool swap"
		);

		let swap = pool.swap(
			ledger,
			context.beneficiary,
			zero_for_one,
			amount_specified,
			price_limit,
			data,
			&mut callback,
		);
		// A callback failure takes precedence over how the pool reported it.
		if let Some(failure) = callback.failure.take() {
			return Err(failure);
		}
		let (amount0, amount1) = swap.map_err(|e| match e {
			PoolError::PriceLimitReached(limit) | PoolError::InvalidPriceLimit(limit) => {
				SettlementError::PriceLimitExceeded(limit)
			}
			other => SettlementError::SwapFailed(other.to_string()),
		})?;

		let (delta_in, delta_out) = if zero_for_one {
			(amount0, amount1)
		} else {
			(amount1, amount0)
		};
		if delta_in.is_negative() || delta_out.is_positive() {
			return Err(SettlementError::SwapFailed(format!(
				"pool reported inconsistent deltas ({}, {})",
				amount0, amount1
			)));
		}
		let amount_in = delta_in.unsigned_abs();
		let amount_out = delta_out.unsigned_abs();

		let received = ledger
			.balance_of(context.output_asset, context.beneficiary)
			.saturating_sub(received_before);
		if received < amount_out {
			return Err(SettlementError::SwapFailed(format!(
				"beneficiary received {} of the reported {} output",
				received, amount_out
			)));
		}

		let settled = match authorization.direction {
			SwapDirection::ExactInput => {
				if amount_out < authorization.limit {
					return Err(SettlementError::OutputBelowMinimum {
						amount_out,
						minimum: authorization.limit,
					});
				}
				amount_out
			}
			SwapDirection::ExactOutput => {
				if amount_out < authorization.amount {
					return Err(SettlementError::OutputBelowMinimum {
						amount_out,
						minimum: authorization.amount,
					});
				}
				if amount_in > authorization.limit {
					return Err(SettlementError::InputAboveMaximum {
						amount_in,
						maximum: authorization.limit,
					});
				}
				amount_in
			}
		};

		Ok(SettlementOutcome {
			settled,
			amount_in,
			amount_out,
			escrow_value: callback.escrow_value,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use relay_pool::implementations::constant_product::ConstantProductPool;
	use relay_pool::{PoolInterface, SwapCallback};
	use std::sync::Arc;

	const WETH: Address = Address::repeat_byte(0xee);
	const DAI: Address = Address::repeat_byte(0x0d);
	const POOL: Address = Address::repeat_byte(0x50);
	const RELAY: Address = Address::repeat_byte(0x7e);
	const OWNER: Address = Address::repeat_byte(0x01);

	fn ether(n: u64) -> U256 {
		U256::from(n) * U256::from(10u64).pow(U256::from(18))
	}

	fn setup() -> (PoolDirectory, TokenLedger) {
		let mut ledger = TokenLedger::new();
		ledger.mint(WETH, POOL, ether(1_000)).unwrap();
		ledger.mint(DAI, POOL, ether(2_000_000)).unwrap();
		let mut pools = PoolDirectory::new();
		pools
			.insert(Arc::new(ConstantProductPool::new(POOL, WETH, DAI, 3000)))
			.unwrap();
		(pools, ledger)
	}

	fn authorization(direction: SwapDirection, amount: U256, limit: U256) -> Authorization {
		Authorization {
			amount,
			limit,
			deadline: U256::MAX,
			nonce: U256::ZERO,
			max_incentive: U256::ZERO,
			pool: POOL,
			price_limit: U160::ZERO,
			direction,
		}
	}

	fn context(input_asset: Address, output_asset: Address) -> CallbackContext {
		CallbackContext {
			input_asset,
			output_asset,
			beneficiary: OWNER,
			fee_tier: 3000,
		}
	}

	fn executor() -> SwapExecutor {
		SwapExecutor::new(WETH, RELAY)
	}

	#[test]
	fn test_exact_output_funded_from_escrow() {
		let (pools, mut ledger) = setup();
		let auth = authorization(SwapDirection::ExactOutput, ether(4_000), ether(3));
		let ctx = context(WETH, DAI);

		let outcome = executor()
			.execute(
				&pools,
				&mut ledger,
				SettlementRequest {
					authorization: &auth,
					context: &ctx,
					pool: POOL,
					data: &[],
				},
			)
			.unwrap();

		assert_eq!(outcome.amount_out, ether(4_000));
		assert_eq!(outcome.settled, outcome.amount_in);
		assert_eq!(outcome.escrow_value, outcome.amount_in);
		assert!(outcome.amount_in > ether(2) && outcome.amount_in < ether(3));
		assert_eq!(ledger.balance_of(DAI, OWNER), ether(4_000));
		assert_eq!(ledger.balance_of(WETH, POOL), ether(1_000) + outcome.amount_in);
	}

	#[test]
	fn test_exact_input_pulls_approved_tokens() {
		let (pools, mut ledger) = setup();
		ledger.mint(DAI, OWNER, ether(5_000)).unwrap();
		ledger.approve(DAI, OWNER, RELAY, U256::MAX);

		let auth = authorization(SwapDirection::ExactInput, ether(4_000), ether(1));
		let ctx = context(DAI, WETH);

		let outcome = executor()
			.execute(
				&pools,
				&mut ledger,
				SettlementRequest {
					authorization: &auth,
					context: &ctx,
					pool: POOL,
					data: &[],
				},
			)
			.unwrap();

		assert_eq!(outcome.amount_in, ether(4_000));
		assert_eq!(outcome.settled, outcome.amount_out);
		assert_eq!(outcome.escrow_value, U256::ZERO);
		assert_eq!(ledger.balance_of(DAI, OWNER), ether(1_000));
		assert_eq!(ledger.balance_of(WETH, OWNER), outcome.amount_out);
	}

	#[test]
	fn test_token_input_without_allowance_fails() {
		let (pools, mut ledger) = setup();
		ledger.mint(DAI, OWNER, ether(5_000)).unwrap();

		let auth = authorization(SwapDirection::ExactInput, ether(4_000), ether(1));
		let ctx = context(DAI, WETH);

		let err = executor()
			.execute(
				&pools,
				&mut ledger,
				SettlementRequest {
					authorization: &auth,
					context: &ctx,
					pool: POOL,
					data: &[],
				},
			)
			.unwrap_err();
		assert!(matches!(err, SettlementError::SwapFailed(ref msg) if msg.contains("allowance")));
	}

	#[test]
	fn test_exact_input_below_minimum() {
		let (pools, mut ledger) = setup();
		// 1 WETH buys just under 2000 DAI at these reserves.
		let auth = authorization(SwapDirection::ExactInput, ether(1), ether(2_000));
		let ctx = context(WETH, DAI);

		let err = executor()
			.execute(
				&pools,
				&mut ledger,
				SettlementRequest {
					authorization: &auth,
					context: &ctx,
					pool: POOL,
					data: &[],
				},
			)
			.unwrap_err();
		assert!(matches!(err, SettlementError::OutputBelowMinimum { .. }));
		assert!(err.is_slippage());
	}

	#[test]
	fn test_exact_output_above_maximum() {
		let (pools, mut ledger) = setup();
		let auth = authorization(SwapDirection::ExactOutput, ether(4_000), ether(2));
		let ctx = context(WETH, DAI);

		let err = executor()
			.execute(
				&pools,
				&mut ledger,
				SettlementRequest {
					authorization: &auth,
					context: &ctx,
					pool: POOL,
					data: &[],
				},
			)
			.unwrap_err();
		assert!(matches!(
			err,
			SettlementError::InputAboveMaximum { maximum, .. } if maximum == ether(2)
		));
	}

	#[test]
	fn test_missing_pool_fails() {
		let (_, mut ledger) = setup();
		let auth = authorization(SwapDirection::ExactInput, ether(1), U256::ZERO);
		let ctx = context(WETH, DAI);

		let err = executor()
			.execute(
				&PoolDirectory::new(),
				&mut ledger,
				SettlementRequest {
					authorization: &auth,
					context: &ctx,
					pool: POOL,
					data: &[],
				},
			)
			.unwrap_err();
		assert!(matches!(err, SettlementError::SwapFailed(_)));
	}

	/// Forwards to a real pool but reports a different caller to the callback.
	struct SpoofingPool {
		inner: ConstantProductPool,
		spoofed_caller: Address,
	}

	/// Invokes the callback twice.
	struct ReentrantPool {
		inner: ConstantProductPool,
	}

	macro_rules! forward_pool_identity {
		() => {
			fn address(&self) -> Address {
				self.inner.address()
			}
			fn token0(&self) -> Address {
				self.inner.token0()
			}
			fn token1(&self) -> Address {
				self.inner.token1()
			}
			fn fee(&self) -> u32 {
				self.inner.fee()
			}
		};
	}

	impl PoolInterface for SpoofingPool {
		forward_pool_identity!();

		fn swap(
			&self,
			ledger: &mut TokenLedger,
			_recipient: Address,
			zero_for_one: bool,
			amount_specified: I256,
			_sqrt_price_limit_x96: U160,
			data: &[u8],
			callback: &mut dyn SwapCallback,
		) -> Result<(I256, I256), PoolError> {
			let owed = amount_specified.abs();
			let (amount0, amount1) = if zero_for_one {
				(owed, I256::ZERO)
			} else {
				(I256::ZERO, owed)
			};
			callback
				.swap_callback(self.spoofed_caller, ledger, amount0, amount1, data)
				.map_err(|e| PoolError::Callback(e.to_string()))?;
			Ok((amount0, amount1))
		}
	}

	impl PoolInterface for ReentrantPool {
		forward_pool_identity!();

		fn swap(
			&self,
			ledger: &mut TokenLedger,
			_recipient: Address,
			zero_for_one: bool,
			amount_specified: I256,
			_sqrt_price_limit_x96: U160,
			data: &[u8],
			callback: &mut dyn SwapCallback,
		) -> Result<(I256, I256), PoolError> {
			let owed = amount_specified.abs();
			let (amount0, amount1) = if zero_for_one {
				(owed, I256::ZERO)
			} else {
				(I256::ZERO, owed)
			};
			for _ in 0..2 {
				// Ignores the rejection, as a hostile pool would.
				let _ = callback.swap_callback(self.address(), ledger, amount0, amount1, data);
			}
			Ok((amount0, amount1))
		}
	}

	fn run_against(pool: Arc<dyn PoolInterface>) -> (SettlementError, TokenLedger) {
		let (_, mut ledger) = setup();
		let mut pools = PoolDirectory::new();
		pools.insert(pool).unwrap();
		let auth = authorization(SwapDirection::ExactInput, ether(1), U256::ZERO);
		let ctx = context(WETH, DAI);

		let err = executor()
			.execute(
				&pools,
				&mut ledger,
				SettlementRequest {
					authorization: &auth,
					context: &ctx,
					pool: POOL,
					data: &[],
				},
			)
			.unwrap_err();
		(err, ledger)
	}

	#[test]
	fn test_spoofed_callback_caller_is_rejected() {
		let attacker = Address::repeat_byte(0xad);
		let (err, ledger) = run_against(Arc::new(SpoofingPool {
			inner: ConstantProductPool::new(POOL, WETH, DAI, 3000),
			spoofed_caller: attacker,
		}));

		assert_eq!(
			err,
			SettlementError::UnauthorizedCallback {
				caller: attacker,
				expected: POOL,
			}
		);
		assert_eq!(ledger.balance_of(WETH, attacker), U256::ZERO);
	}

	#[test]
	fn test_second_callback_is_rejected() {
		let (err, _) = run_against(Arc::new(ReentrantPool {
			inner: ConstantProductPool::new(POOL, WETH, DAI, 3000),
		}));
		assert_eq!(err, SettlementError::ReentrantCallback);
	}
}
