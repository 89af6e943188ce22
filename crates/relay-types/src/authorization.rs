//! Swap authorization types.
//!
//! An [`Authorization`] carries the economic terms of a single swap and a
//! [`CallbackContext`] names the assets and the owner the settlement leg pays.
//! Both are bound into one [`SwapPayload`] whose digest the authority signs,
//! so neither half can be swapped out without invalidating the signature.

use crate::codec::{self, CodecError};
use alloy_primitives::{Address, Bytes, B256, U160, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest fee tier representable in the pool factory's `uint24` fee field.
pub const MAX_FEE_TIER: u32 = 0x00FF_FFFF;

/// Which side of the swap the authorization fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapDirection {
	/// `amount` is spent exactly, `limit` is the minimum acceptable output.
	ExactInput,
	/// `amount` is received exactly, `limit` is the maximum acceptable input.
	ExactOutput,
}

impl SwapDirection {
	/// Builds the direction from the wire flag (`true` = exact input).
	pub fn from_exact_input(exact_input: bool) -> Self {
		if exact_input {
			Self::ExactInput
		} else {
			Self::ExactOutput
		}
	}

	/// Returns the wire flag for this direction.
	pub fn is_exact_input(&self) -> bool {
		matches!(self, Self::ExactInput)
	}
}

impl fmt::Display for SwapDirection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::ExactInput => write!(f, "exact-input"),
			Self::ExactOutput => write!(f, "exact-output"),
		}
	}
}

/// Signed economic terms of one swap.
///
/// Constructed off-chain and consumed at most once: the nonce must equal the
/// owner's counter at settlement time and the deadline must not have passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
	/// Input quantity (exact input) or output quantity (exact output).
	pub amount: U256,
	/// Minimum output (exact input) or maximum input (exact output).
	pub limit: U256,
	/// Absolute expiry as unix seconds.
	pub deadline: U256,
	/// Expected value of the owner's replay counter.
	pub nonce: U256,
	/// Upper bound on the fee rate the relayer is reimbursed at.
	pub max_incentive: U256,
	/// Pool the authority quoted against.
	pub pool: Address,
	/// Q64.96 square-root price bound; zero leaves only `limit` in force.
	pub price_limit: U160,
	/// Which side of the swap is fixed.
	pub direction: SwapDirection,
}

impl Authorization {
	/// Checks the invariants that hold independently of ledger state.
	pub fn validate(&self) -> Result<(), CodecError> {
		if self.amount.is_zero() {
			return Err(CodecError::InvalidField {
				field: "amount",
				reason: "must be greater than zero".into(),
			});
		}
		Ok(())
	}

	/// Returns true once `now` (unix seconds) has moved past the deadline.
	pub fn is_expired(&self, now: u64) -> bool {
		self.deadline < U256::from(now)
	}
}

/// Settlement leg of a swap: which asset is paid, which is received and who
/// owns the authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackContext {
	/// Asset paid into the pool.
	pub input_asset: Address,
	/// Asset released by the pool.
	pub output_asset: Address,
	/// Owner of the authorization; receives the output, owns the nonce
	/// counter and the escrow account that is debited.
	pub beneficiary: Address,
	/// Pool fee tier in hundredths of a basis point.
	pub fee_tier: u32,
}

impl CallbackContext {
	/// Checks field ranges that the wire format alone does not enforce.
	pub fn validate(&self) -> Result<(), CodecError> {
		if self.fee_tier > MAX_FEE_TIER {
			return Err(CodecError::InvalidField {
				field: "fee_tier",
				reason: format!("{} exceeds uint24", self.fee_tier),
			});
		}
		if self.input_asset == self.output_asset {
			return Err(CodecError::InvalidField {
				field: "output_asset",
				reason: "input and output assets are identical".into(),
			});
		}
		Ok(())
	}

	/// True when the input asset sorts before the output asset, i.e. the
	/// swap moves token0 into the pool.
	pub fn zero_for_one(&self) -> bool {
		self.input_asset < self.output_asset
	}
}

/// The complete signed unit: terms plus settlement leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapPayload {
	pub authorization: Authorization,
	pub context: CallbackContext,
}

impl SwapPayload {
	pub fn new(authorization: Authorization, context: CallbackContext) -> Self {
		Self {
			authorization,
			context,
		}
	}

	/// Owner whose nonce and escrow this payload consumes.
	pub fn owner(&self) -> Address {
		self.context.beneficiary
	}

	/// Canonical wire bytes.
	pub fn encode(&self) -> Bytes {
		codec::encode_payload(&self.authorization, &self.context)
	}

	/// Strict inverse of [`SwapPayload::encode`].
	pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
		let (authorization, context) = codec::decode_payload(bytes)?;
		Ok(Self::new(authorization, context))
	}

	/// Digest the authority signs over.
	pub fn digest(&self) -> B256 {
		codec::payload_digest(&self.encode())
	}
}

/// Wire bytes of a payload together with the authority's signature over its
/// digest; the pair a relayer submits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPayload {
	pub payload: Bytes,
	pub signature: crate::signature::RecoverableSignature,
}
