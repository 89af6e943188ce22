//! Settlement-leg callback handler.
//!
//! The pool calls back once mid-swap to be paid. The handler trusts nothing
//! it is handed: the caller must be the resolved pool, only one invocation
//! per swap is honoured, and the token and payer come from the signed
//! context rather than the callback data.

use crate::SettlementError;
use alloy_primitives::{Address, I256, U256};
use relay_pool::{CallbackRejected, SwapCallback};
use relay_types::{CallbackContext, TokenLedger};

pub(crate) struct SettlementCallback<'a> {
	expected_pool: Address,
	context: &'a CallbackContext,
	wrapped_native: Address,
	relay_address: Address,
	invoked: bool,
	/// Escrow value spent wrapping the input leg.
	pub(crate) escrow_value: U256,
	/// First typed failure raised inside the callback, if any.
	pub(crate) failure: Option<SettlementError>,
}

impl<'a> SettlementCallback<'a> {
	pub(crate) fn new(
		expected_pool: Address,
		context: &'a CallbackContext,
		wrapped_native: Address,
		relay_address: Address,
	) -> Self {
		Self {
			expected_pool,
			context,
			wrapped_native,
			relay_address,
			invoked: false,
			escrow_value: U256::ZERO,
			failure: None,
		}
	}

	fn reject(&mut self, error: SettlementError) -> CallbackRejected {
		let rejected = CallbackRejected(error.to_string());
		self.failure.get_or_insert(error);
		rejected
	}

	fn pay(
		&mut self,
		caller: Address,
		ledger: &mut TokenLedger,
		token: Address,
		owed: U256,
	) -> Result<(), SettlementError> {
		if token != self.context.input_asset {
			return Err(SettlementError::SwapFailed(format!(
				"pool requested {} but the signed input asset is {}",
				token, self.context.input_asset
			)));
		}

		if token == self.wrapped_native {
			// Input is funded from the owner's escrow; the relay debits it once
			// the swap has settled.
			ledger
				.mint(token, caller, owed)
				.map_err(|e| SettlementError::SwapFailed(e.to_string()))?;
			self.escrow_value += owed;
		} else {
			ledger
				.transfer_from(token, self.relay_address, self.context.beneficiary, caller, owed)
				.map_err(|e| SettlementError::SwapFailed(e.to_string()))?;
		}
		Ok(())
	}
}

impl SwapCallback for SettlementCallback<'_> {
	fn swap_callback(
		&mut self,
		caller: Address,
		ledger: &mut TokenLedger,
		amount0_delta: I256,
		amount1_delta: I256,
		_data: &[u8],
	) -> Result<(), CallbackRejected> {
		if self.invoked {
			return Err(self.reject(SettlementError::ReentrantCallback));
		}
		self.invoked = true;

		if caller != self.expected_pool {
			return Err(self.reject(SettlementError::UnauthorizedCallback {
				caller,
				expected: self.expected_pool,
			}));
		}

		let (token0, token1) = if self.context.zero_for_one() {
			(self.context.input_asset, self.context.output_asset)
		} else {
			(self.context.output_asset, self.context.input_asset)
		};
		let owed = if amount0_delta.is_positive() {
			Some((token0, amount0_delta.unsigned_abs()))
		} else if amount1_delta.is_positive() {
			Some((token1, amount1_delta.unsigned_abs()))
		} else {
			None
		};

		let Some((token, amount)) = owed else {
			return Ok(());
		};
		self.pay(caller, ledger, token, amount)
			.map_err(|e| self.reject(e))
	}
}
