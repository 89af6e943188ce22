//! The relayed swap pipeline.
//!
//! [`Relay`] holds only fixed parameters; all mutable state lives in the
//! [`ChainState`] handed to it. Each call works on a clone of that state and
//! writes it back only when every step has succeeded, so a failure at any
//! step (including after the nonce was consumed or the pool paid out) leaves
//! the caller's state untouched.

use crate::state::ChainState;
use crate::RelayError;
use alloy_primitives::U256;
use relay_account::SignatureVerifier;
use relay_pool::{PoolDirectory, PoolResolver};
use relay_settlement::{SettlementRequest, SwapExecutor};
use relay_types::{
	payload_digest, RecoverableSignature, RelaySubmission, SwapPayload, SwapReceipt,
};

/// Fixed parameters of the relay: who may authorize, how pools resolve, how
/// swaps settle and how relayers are paid.
#[derive(Debug, Clone)]
pub struct Relay {
	verifier: SignatureVerifier,
	resolver: PoolResolver,
	executor: SwapExecutor,
	settlement_gas_units: U256,
}

impl Relay {
	pub fn new(
		verifier: SignatureVerifier,
		resolver: PoolResolver,
		executor: SwapExecutor,
		settlement_gas_units: u64,
	) -> Self {
		Self {
			verifier,
			resolver,
			executor,
			settlement_gas_units: U256::from(settlement_gas_units),
		}
	}

	pub fn verifier(&self) -> &SignatureVerifier {
		&self.verifier
	}

	pub fn resolver(&self) -> &PoolResolver {
		&self.resolver
	}

	pub fn executor(&self) -> &SwapExecutor {
		&self.executor
	}

	/// Incentive owed for a submission: the paid fee rate, capped at the
	/// signed maximum, times the reimbursed gas units.
	pub fn incentive(&self, fee_rate: U256, max_incentive: U256) -> U256 {
		fee_rate
			.min(max_incentive)
			.saturating_mul(self.settlement_gas_units)
	}

	/// Settles a signed payload and commits the result into `state`.
	pub fn relayed_swap(
		&self,
		state: &mut ChainState,
		pools: &PoolDirectory,
		submission: &RelaySubmission,
		signature: &RecoverableSignature,
		payload: &[u8],
	) -> Result<SwapReceipt, RelayError> {
		let mut working = state.clone();
		let receipt = self.settle(&mut working, pools, submission, signature, payload)?;
		*state = working;
		Ok(receipt)
	}

	/// Runs the identical pipeline against a scratch copy of `state` and
	/// returns the amount the committing call would settle.
	pub fn preview_relayed_swap(
		&self,
		state: &ChainState,
		pools: &PoolDirectory,
		submission: &RelaySubmission,
		signature: &RecoverableSignature,
		payload: &[u8],
	) -> Result<U256, RelayError> {
		let mut scratch = state.clone();
		self.settle(&mut scratch, pools, submission, signature, payload)
			.map(|receipt| receipt.settled)
	}

	fn settle(
		&self,
		state: &mut ChainState,
		pools: &PoolDirectory,
		submission: &RelaySubmission,
		signature: &RecoverableSignature,
		payload: &[u8],
	) -> Result<SwapReceipt, RelayError> {
		let SwapPayload {
			authorization,
			context,
		} = SwapPayload::decode(payload)?;
		let owner = context.beneficiary;

		let signer = self.verifier.verify(&payload_digest(payload), signature)?;
		tracing::debug!(%owner, %signer, "Authorization signature verified");

		if authorization.is_expired(submission.timestamp) {
			return Err(RelayError::DeadlineExpired {
				deadline: authorization.deadline,
				now: submission.timestamp,
			});
		}

		let nonce = state.nonces.consume(owner, authorization.nonce)?;

		let resolved = self
			.resolver
			.resolve(context.input_asset, context.output_asset, context.fee_tier);
		if resolved != authorization.pool {
			return Err(RelayError::PoolMismatch {
				signed: authorization.pool,
				resolved,
			});
		}

		let outcome = self.executor.execute(
			pools,
			&mut state.tokens,
			SettlementRequest {
				authorization: &authorization,
				context: &context,
				pool: resolved,
				data: payload,
			},
		)?;
		tracing::debug!(
			%owner,
			amount_in = %outcome.amount_in,
			amount_out = %outcome.amount_out,
			"Swap executed"
		);

		let incentive = self.incentive(submission.fee_rate, authorization.max_incentive);
		state
			.escrow
			.debit_for_settlement(owner, outcome.escrow_value, incentive)?;
		state.escrow.credit_relayer(submission.relayer, incentive)?;

		Ok(SwapReceipt {
			owner,
			nonce,
			pool: resolved,
			direction: authorization.direction,
			input_asset: context.input_asset,
			output_asset: context.output_asset,
			amount_in: outcome.amount_in,
			amount_out: outcome.amount_out,
			settled: outcome.settled,
			escrow_value: outcome.escrow_value,
			incentive,
			relayer: submission.relayer,
			timestamp: submission.timestamp,
		})
	}
}
