//! Constant-product reference pool.
//!
//! A devnet stand-in for a concentrated-liquidity pool that honours the same
//! callback-settled swap interface. Reserves are the pool address's balances
//! in the [`TokenLedger`], pricing follows `x * y = k` with the fee charged
//! on the input, and the implied sqrt price is `sqrt(reserve1 / reserve0)` in
//! Q64.96. A swap that would cross its price limit is rejected outright
//! rather than partially filled.

use crate::constants::{FEE_DENOMINATOR, MAX_SQRT_RATIO, MIN_SQRT_RATIO};
use crate::{PoolError, PoolInterface, SwapCallback};
use alloy_primitives::{Address, I256, U160, U256, U512};
use relay_types::TokenLedger;

/// Constant-product pool over one sorted token pair.
#[derive(Debug, Clone)]
pub struct ConstantProductPool {
	address: Address,
	token0: Address,
	token1: Address,
	fee: u32,
}

impl ConstantProductPool {
	/// Builds a pool; the pair is sorted so `token0 < token1`.
	pub fn new(address: Address, token_a: Address, token_b: Address, fee: u32) -> Self {
		let (token0, token1) = if token_a < token_b {
			(token_a, token_b)
		} else {
			(token_b, token_a)
		};
		Self {
			address,
			token0,
			token1,
			fee,
		}
	}

	/// Current `(reserve0, reserve1)`.
	pub fn reserves(&self, ledger: &TokenLedger) -> (U256, U256) {
		(
			ledger.balance_of(self.token0, self.address),
			ledger.balance_of(self.token1, self.address),
		)
	}

	/// Quotes `(amount_in, amount_out)` without touching the ledger.
	pub fn quote(
		&self,
		ledger: &TokenLedger,
		zero_for_one: bool,
		amount_specified: I256,
	) -> Result<(U256, U256), PoolError> {
		let (reserve0, reserve1) = self.reserves(ledger);
		let (reserve_in, reserve_out) = if zero_for_one {
			(reserve0, reserve1)
		} else {
			(reserve1, reserve0)
		};
		if reserve_in.is_zero() || reserve_out.is_zero() {
			return Err(PoolError::InsufficientLiquidity("pool has no reserves".into()));
		}

		let amount = amount_specified.unsigned_abs();
		if amount_specified.is_positive() {
			let amount_out = output_for_input(amount, reserve_in, reserve_out, self.fee)?;
			Ok((amount, amount_out))
		} else {
			let amount_in = input_for_output(amount, reserve_in, reserve_out, self.fee)?;
			Ok((amount_in, amount))
		}
	}
}

fn widen(value: U256) -> U512 {
	U512::from(value)
}

fn narrow(value: U512) -> Result<U256, PoolError> {
	U256::checked_from_limbs_slice(value.as_limbs()).ok_or(PoolError::Overflow)
}

/// Share of the input that reaches the reserves, in pips.
fn fee_complement(fee: u32) -> Result<U512, PoolError> {
	match FEE_DENOMINATOR.checked_sub(fee) {
		Some(complement) if complement > 0 => Ok(U512::from(complement)),
		_ => Err(PoolError::UnsupportedFee(fee)),
	}
}

fn signed(value: U256) -> Result<I256, PoolError> {
	I256::try_from(value).map_err(|_| PoolError::Overflow)
}

/// `out = in * (1 - fee) * r_out / (r_in + in * (1 - fee))`, rounded down.
fn output_for_input(
	amount_in: U256,
	reserve_in: U256,
	reserve_out: U256,
	fee: u32,
) -> Result<U256, PoolError> {
	let in_after_fee = widen(amount_in) * fee_complement(fee)?;
	let numerator = in_after_fee * widen(reserve_out);
	let denominator = widen(reserve_in) * widen(U256::from(FEE_DENOMINATOR)) + in_after_fee;
	narrow(numerator / denominator)
}

/// `in = r_in * out / ((r_out - out) * (1 - fee)) + 1`, rounded up.
fn input_for_output(
	amount_out: U256,
	reserve_in: U256,
	reserve_out: U256,
	fee: u32,
) -> Result<U256, PoolError> {
	if amount_out >= reserve_out {
		return Err(PoolError::InsufficientLiquidity(format!(
			"requested {} but only {} available",
			amount_out, reserve_out
		)));
	}
	let numerator = widen(reserve_in) * widen(amount_out) * widen(U256::from(FEE_DENOMINATOR));
	let denominator = widen(reserve_out - amount_out) * fee_complement(fee)?;
	narrow(numerator / denominator + U512::from(1u8))
}

/// Compares `limit` against `sqrt(reserve1 / reserve0)` in Q64.96 without
/// taking a square root: `limit^2 * reserve0` against `reserve1 << 192`.
fn limit_cmp_price(limit: U160, reserve0: U256, reserve1: U256) -> std::cmp::Ordering {
	let limit = U512::from(limit);
	let lhs = (limit * limit).saturating_mul(widen(reserve0));
	let rhs = widen(reserve1) << 192;
	lhs.cmp(&rhs)
}

impl PoolInterface for ConstantProductPool {
	fn address(&self) -> Address {
		self.address
	}

	fn token0(&self) -> Address {
		self.token0
	}

	fn token1(&self) -> Address {
		self.token1
	}

	fn fee(&self) -> u32 {
		self.fee
	}

	fn swap(
		&self,
		ledger: &mut TokenLedger,
		recipient: Address,
		zero_for_one: bool,
		amount_specified: I256,
		sqrt_price_limit_x96: U160,
		data: &[u8],
		callback: &mut dyn SwapCallback,
	) -> Result<(I256, I256), PoolError> {
		use std::cmp::Ordering;

		if amount_specified.is_zero() {
			return Err(PoolError::ZeroAmount);
		}

		let (reserve0, reserve1) = self.reserves(ledger);
		let limit_in_range = sqrt_price_limit_x96 > MIN_SQRT_RATIO && sqrt_price_limit_x96 < MAX_SQRT_RATIO;
		let limit_on_side = match limit_cmp_price(sqrt_price_limit_x96, reserve0, reserve1) {
			Ordering::Less => zero_for_one,
			Ordering::Greater => !zero_for_one,
			Ordering::Equal => false,
		};
		if !limit_in_range || !limit_on_side {
			return Err(PoolError::InvalidPriceLimit(sqrt_price_limit_x96));
		}

		let (amount_in, amount_out) = self.quote(ledger, zero_for_one, amount_specified)?;
		let (token_in, token_out) = if zero_for_one {
			(self.token0, self.token1)
		} else {
			(self.token1, self.token0)
		};

		// The price after the swap must stay on the near side of the limit.
		let (next0, next1) = if zero_for_one {
			(reserve0 + amount_in, reserve1 - amount_out)
		} else {
			(reserve0 - amount_out, reserve1 + amount_in)
		};
		let crossed = match limit_cmp_price(sqrt_price_limit_x96, next0, next1) {
			Ordering::Greater => zero_for_one,
			Ordering::Less => !zero_for_one,
			Ordering::Equal => false,
		};
		if crossed {
			return Err(PoolError::PriceLimitReached(sqrt_price_limit_x96));
		}

		let (amount0, amount1) = if zero_for_one {
			(signed(amount_in)?, -signed(amount_out)?)
		} else {
			(-signed(amount_out)?, signed(amount_in)?)
		};

		let balance_before = ledger.balance_of(token_in, self.address);
		ledger.transfer(token_out, self.address, recipient, amount_out)?;

		callback
			.swap_callback(self.address, ledger, amount0, amount1, data)
			.map_err(|e| PoolError::Callback(e.to_string()))?;

		let balance_after = ledger.balance_of(token_in, self.address);
		if balance_after < balance_before + amount_in {
			return Err(PoolError::InputNotPaid {
				token: token_in,
				expected: amount_in.to_string(),
			});
		}

		tracing::debug!(
			pool = %self.address,
			zero_for_one,
			amount_in = %amount_in,
			amount_out = %amount_out,
			"Pool swap settled"
		);

		Ok((amount0, amount1))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::constants::extreme_price_limit;
	use crate::CallbackRejected;

	const POOL: Address = Address::repeat_byte(0x50);
	const TOKEN_A: Address = Address::repeat_byte(0x0a);
	const TOKEN_B: Address = Address::repeat_byte(0x0b);
	const PAYER: Address = Address::repeat_byte(0x01);
	const RECIPIENT: Address = Address::repeat_byte(0x02);

	/// Pays whatever the pool asks for out of `PAYER`'s balance.
	struct Payer {
		calls: usize,
	}

	impl SwapCallback for Payer {
		fn swap_callback(
			&mut self,
			caller: Address,
			ledger: &mut TokenLedger,
			amount0_delta: I256,
			amount1_delta: I256,
			_data: &[u8],
		) -> Result<(), CallbackRejected> {
			self.calls += 1;
			let (token, owed) = if amount0_delta.is_positive() {
				(TOKEN_A, amount0_delta)
			} else {
				(TOKEN_B, amount1_delta)
			};
			ledger
				.transfer(token, PAYER, caller, owed.unsigned_abs())
				.map_err(|e| CallbackRejected(e.to_string()))
		}
	}

	/// Never pays.
	struct Deadbeat;

	impl SwapCallback for Deadbeat {
		fn swap_callback(
			&mut self,
			_caller: Address,
			_ledger: &mut TokenLedger,
			_amount0_delta: I256,
			_amount1_delta: I256,
			_data: &[u8],
		) -> Result<(), CallbackRejected> {
			Ok(())
		}
	}

	fn setup(reserve_a: u64, reserve_b: u64) -> (ConstantProductPool, TokenLedger) {
		let pool = ConstantProductPool::new(POOL, TOKEN_A, TOKEN_B, 3000);
		let mut ledger = TokenLedger::new();
		ledger.mint(TOKEN_A, POOL, U256::from(reserve_a)).unwrap();
		ledger.mint(TOKEN_B, POOL, U256::from(reserve_b)).unwrap();
		ledger.mint(TOKEN_A, PAYER, U256::from(1_000_000u64)).unwrap();
		ledger.mint(TOKEN_B, PAYER, U256::from(1_000_000u64)).unwrap();
		(pool, ledger)
	}

	#[test]
	fn test_exact_input_pays_out_and_collects() {
		let (pool, mut ledger) = setup(1_000_000, 1_000_000);
		let mut payer = Payer { calls: 0 };

		let (amount0, amount1) = pool
			.swap(
				&mut ledger,
				RECIPIENT,
				true,
				I256::try_from(1000).unwrap(),
				extreme_price_limit(true),
				&[],
				&mut payer,
			)
			.unwrap();

		// 1000 * 0.997 * 1e6 / (1e6 + 997) = 996.006...
		assert_eq!(amount0, I256::try_from(1000).unwrap());
		assert_eq!(amount1, -I256::try_from(996).unwrap());
		assert_eq!(payer.calls, 1);
		assert_eq!(ledger.balance_of(TOKEN_B, RECIPIENT), U256::from(996));
		assert_eq!(pool.reserves(&ledger), (U256::from(1_001_000u64), U256::from(999_004u64)));
	}

	#[test]
	fn test_exact_output_rounds_input_up() {
		let (pool, mut ledger) = setup(1_000_000, 1_000_000);
		let mut payer = Payer { calls: 0 };

		let (amount0, amount1) = pool
			.swap(
				&mut ledger,
				RECIPIENT,
				false,
				-I256::try_from(1000).unwrap(),
				extreme_price_limit(false),
				&[],
				&mut payer,
			)
			.unwrap();

		// 1e6 * 1000 * 1e6 / (999000 * 997000) + 1 = 1004.01... + 1
		assert_eq!(amount0, -I256::try_from(1000).unwrap());
		assert_eq!(amount1, I256::try_from(1005).unwrap());
		assert_eq!(ledger.balance_of(TOKEN_A, RECIPIENT), U256::from(1000));
	}

	#[test]
	fn test_unpaid_swap_fails() {
		let (pool, mut ledger) = setup(1_000_000, 1_000_000);

		let err = pool
			.swap(
				&mut ledger,
				RECIPIENT,
				true,
				I256::try_from(1000).unwrap(),
				extreme_price_limit(true),
				&[],
				&mut Deadbeat,
			)
			.unwrap_err();
		assert!(matches!(err, PoolError::InputNotPaid { token, .. } if token == TOKEN_A));
	}

	#[test]
	fn test_exact_output_beyond_reserves_fails() {
		let (pool, mut ledger) = setup(1_000, 1_000);

		let err = pool
			.swap(
				&mut ledger,
				RECIPIENT,
				true,
				-I256::try_from(1_000).unwrap(),
				extreme_price_limit(true),
				&[],
				&mut Payer { calls: 0 },
			)
			.unwrap_err();
		assert!(matches!(err, PoolError::InsufficientLiquidity(_)));
	}

	#[test]
	fn test_price_limit_on_wrong_side_is_rejected() {
		let (pool, mut ledger) = setup(1_000_000, 1_000_000);

		// The price is 1.0, i.e. sqrt price 2^96; selling token0 needs a lower bound.
		let above = U160::from(1u8) << 97;
		let err = pool
			.swap(
				&mut ledger,
				RECIPIENT,
				true,
				I256::try_from(1000).unwrap(),
				above,
				&[],
				&mut Payer { calls: 0 },
			)
			.unwrap_err();
		assert_eq!(err, PoolError::InvalidPriceLimit(above));
	}

	#[test]
	fn test_swap_crossing_price_limit_is_rejected() {
		let (pool, mut ledger) = setup(1_000_000, 1_000_000);
		let before = ledger.clone();

		// Just under 2^96: any meaningful sale of token0 crosses it.
		let tight = (U160::from(1u8) << 96) - U160::from(1u64 << 40);
		let err = pool
			.swap(
				&mut ledger,
				RECIPIENT,
				true,
				I256::try_from(100_000).unwrap(),
				tight,
				&[],
				&mut Payer { calls: 0 },
			)
			.unwrap_err();
		assert_eq!(err, PoolError::PriceLimitReached(tight));
		assert_eq!(ledger, before);
	}

	#[test]
	fn test_zero_amount_is_rejected() {
		let (pool, mut ledger) = setup(1_000_000, 1_000_000);
		let err = pool
			.swap(
				&mut ledger,
				RECIPIENT,
				true,
				I256::ZERO,
				extreme_price_limit(true),
				&[],
				&mut Payer { calls: 0 },
			)
			.unwrap_err();
		assert_eq!(err, PoolError::ZeroAmount);
	}

	#[test]
	fn test_full_fee_is_unsupported() {
		let (_, ledger) = setup(1_000_000, 1_000_000);
		let pool = ConstantProductPool::new(POOL, TOKEN_A, TOKEN_B, FEE_DENOMINATOR);
		assert_eq!(
			pool.quote(&ledger, true, I256::try_from(1000).unwrap()),
			Err(PoolError::UnsupportedFee(FEE_DENOMINATOR))
		);
	}

	#[test]
	fn test_narrow_rejects_values_above_u256() {
		assert_eq!(narrow(widen(U256::MAX)).unwrap(), U256::MAX);
		assert!(matches!(
			narrow(widen(U256::MAX) + U512::from(1u8)),
			Err(PoolError::Overflow)
		));
	}
}
