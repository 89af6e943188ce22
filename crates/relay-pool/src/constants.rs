//! Protocol constants shared with the canonical concentrated-liquidity pools.

use alloy_primitives::{address, b256, uint, Address, B256, U160};

/// Lowest sqrt price (Q64.96) a pool can reach, `getSqrtRatioAtTick(MIN_TICK)`.
pub const MIN_SQRT_RATIO: U160 = uint!(4295128739_U160);

/// Highest sqrt price (Q64.96) a pool can reach, `getSqrtRatioAtTick(MAX_TICK)`.
pub const MAX_SQRT_RATIO: U160 = uint!(1461446703485210103287273052203988822378723970342_U160);

/// Canonical pool factory on Ethereum mainnet.
pub const DEFAULT_FACTORY: Address = address!("1F98431c8aD98523631AE4a59f267346ea31F984");

/// keccak256 of the canonical pool creation code.
pub const DEFAULT_POOL_INIT_CODE_HASH: B256 =
	b256!("e34f199b19b2b4f47f68442619d555527d244f78a3297ea89325f843f87b8b54");

/// Fee tiers are expressed in hundredths of a basis point.
pub const FEE_DENOMINATOR: u32 = 1_000_000;

/// Price bound that leaves a swap unconstrained in the given direction.
pub fn extreme_price_limit(zero_for_one: bool) -> U160 {
	if zero_for_one {
		MIN_SQRT_RATIO + U160::from(1u8)
	} else {
		MAX_SQRT_RATIO - U160::from(1u8)
	}
}
