//! Token balances and allowances.
//!
//! The ledger is the settlement substrate shared by the relay and the pools:
//! pools keep their reserves here, the swap callback pays inputs through it
//! and outputs land in the beneficiary's balance. It follows ERC-20 semantics
//! (`transfer`, `approve`, `transfer_from`); `mint` exists for seeding devnet
//! balances and for wrapping escrowed value into the wrapped-native token.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur while moving tokens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
	#[error("Insufficient {token} balance for {holder}: have {available}, need {required}")]
	InsufficientBalance {
		token: Address,
		holder: Address,
		available: U256,
		required: U256,
	},
	#[error("Insufficient {token} allowance from {owner} to {spender}: have {available}, need {required}")]
	InsufficientAllowance {
		token: Address,
		owner: Address,
		spender: Address,
		available: U256,
		required: U256,
	},
	#[error("Balance overflow for {token}")]
	Overflow { token: Address },
}

/// Per-token balances (`token -> holder -> amount`) and allowances
/// (`token -> owner -> spender -> amount`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLedger {
	balances: BTreeMap<Address, BTreeMap<Address, U256>>,
	#[serde(default)]
	allowances: BTreeMap<Address, BTreeMap<Address, BTreeMap<Address, U256>>>,
}

impl TokenLedger {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn balance_of(&self, token: Address, holder: Address) -> U256 {
		self.balances
			.get(&token)
			.and_then(|holders| holders.get(&holder))
			.copied()
			.unwrap_or_default()
	}

	pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
		self.allowances
			.get(&token)
			.and_then(|owners| owners.get(&owner))
			.and_then(|spenders| spenders.get(&spender))
			.copied()
			.unwrap_or_default()
	}

	/// Creates `amount` new units of `token` in `holder`'s balance.
	pub fn mint(&mut self, token: Address, holder: Address, amount: U256) -> Result<(), LedgerError> {
		let balance = self.balances.entry(token).or_default().entry(holder).or_default();
		*balance = balance
			.checked_add(amount)
			.ok_or(LedgerError::Overflow { token })?;
		Ok(())
	}

	/// Moves `amount` of `token` from `from` to `to`.
	pub fn transfer(
		&mut self,
		token: Address,
		from: Address,
		to: Address,
		amount: U256,
	) -> Result<(), LedgerError> {
		let available = self.balance_of(token, from);
		if available < amount {
			return Err(LedgerError::InsufficientBalance {
				token,
				holder: from,
				available,
				required: amount,
			});
		}
		if from == to || amount.is_zero() {
			return Ok(());
		}

		let holders = self.balances.entry(token).or_default();
		holders.insert(from, available - amount);
		let receiver = holders.entry(to).or_default();
		*receiver = receiver
			.checked_add(amount)
			.ok_or(LedgerError::Overflow { token })?;
		Ok(())
	}

	/// Sets the amount `spender` may move out of `owner`'s balance.
	pub fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: U256) {
		self.allowances
			.entry(token)
			.or_default()
			.entry(owner)
			.or_default()
			.insert(spender, amount);
	}

	/// Moves tokens on behalf of `from`, consuming `spender`'s allowance.
	///
	/// An allowance of `U256::MAX` is treated as unlimited and not decreased.
	pub fn transfer_from(
		&mut self,
		token: Address,
		spender: Address,
		from: Address,
		to: Address,
		amount: U256,
	) -> Result<(), LedgerError> {
		let allowed = self.allowance(token, from, spender);
		if allowed < amount {
			return Err(LedgerError::InsufficientAllowance {
				token,
				owner: from,
				spender,
				available: allowed,
				required: amount,
			});
		}
		self.transfer(token, from, to, amount)?;
		if allowed != U256::MAX {
			self.approve(token, from, spender, allowed - amount);
		}
		Ok(())
	}
}
