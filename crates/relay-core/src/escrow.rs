//! Escrow ("gas tank") ledger.
//!
//! Holds each owner's balance of the native value unit. The same balance
//! funds a swap's wrapped-native input leg and the relayer incentive; the
//! settlement debit and relayer credit are crate-private so they can only
//! happen inside a relayed swap.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur when moving escrowed value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EscrowError {
	#[error("Insufficient escrow for {owner}: have {available}, need {required}")]
	InsufficientEscrow {
		owner: Address,
		available: U256,
		required: U256,
	},
	#[error("Escrow balance of {owner} would overflow")]
	Overflow { owner: Address },
}

/// Per-owner escrow balances. Accounts appear on first credit and are never
/// removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowLedger {
	balances: BTreeMap<Address, U256>,
}

impl EscrowLedger {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn balance_of(&self, owner: Address) -> U256 {
		self.balances.get(&owner).copied().unwrap_or_default()
	}

	/// Credits `owner`; a credit that would overflow the balance is refused.
	pub fn deposit(&mut self, owner: Address, value: U256) -> Result<(), EscrowError> {
		let balance = self
			.balance_of(owner)
			.checked_add(value)
			.ok_or(EscrowError::Overflow { owner })?;
		self.balances.insert(owner, balance);
		Ok(())
	}

	/// Debits `owner`'s own balance; the caller must already be known to be
	/// `owner`.
	pub fn withdraw(&mut self, owner: Address, value: U256) -> Result<(), EscrowError> {
		self.debit(owner, value)
	}

	/// Debits the swap value and the incentive as one amount.
	pub(crate) fn debit_for_settlement(
		&mut self,
		owner: Address,
		swap_value: U256,
		incentive: U256,
	) -> Result<(), EscrowError> {
		let required = swap_value
			.checked_add(incentive)
			.ok_or(EscrowError::InsufficientEscrow {
				owner,
				available: self.balance_of(owner),
				required: U256::MAX,
			})?;
		self.debit(owner, required)
	}

	/// Credits the relayer that submitted a settlement.
	pub(crate) fn credit_relayer(
		&mut self,
		relayer: Address,
		incentive: U256,
	) -> Result<(), EscrowError> {
		self.deposit(relayer, incentive)
	}

	fn debit(&mut self, owner: Address, value: U256) -> Result<(), EscrowError> {
		let available = self.balance_of(owner);
		if available < value {
			return Err(EscrowError::InsufficientEscrow {
				owner,
				available,
				required: value,
			});
		}
		if !value.is_zero() {
			self.balances.insert(owner, available - value);
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const OWNER: Address = Address::repeat_byte(0x01);
	const RELAYER: Address = Address::repeat_byte(0x02);

	#[test]
	fn test_deposit_and_withdraw() {
		let mut escrow = EscrowLedger::new();
		assert_eq!(escrow.balance_of(OWNER), U256::ZERO);

		escrow.deposit(OWNER, U256::from(100)).unwrap();
		escrow.deposit(OWNER, U256::from(50)).unwrap();
		escrow.withdraw(OWNER, U256::from(30)).unwrap();
		assert_eq!(escrow.balance_of(OWNER), U256::from(120));
	}

	#[test]
	fn test_withdraw_beyond_balance_leaves_it_unchanged() {
		let mut escrow = EscrowLedger::new();
		escrow.deposit(OWNER, U256::from(10)).unwrap();

		let err = escrow.withdraw(OWNER, U256::from(11)).unwrap_err();
		assert_eq!(
			err,
			EscrowError::InsufficientEscrow {
				owner: OWNER,
				available: U256::from(10),
				required: U256::from(11),
			}
		);
		assert_eq!(escrow.balance_of(OWNER), U256::from(10));
	}

	#[test]
	fn test_settlement_debits_value_and_incentive_together() {
		let mut escrow = EscrowLedger::new();
		escrow.deposit(OWNER, U256::from(100)).unwrap();

		// Either part alone fits, the sum does not.
		let err = escrow
			.debit_for_settlement(OWNER, U256::from(60), U256::from(50))
			.unwrap_err();
		assert!(matches!(err, EscrowError::InsufficientEscrow { .. }));
		assert_eq!(escrow.balance_of(OWNER), U256::from(100));

		escrow
			.debit_for_settlement(OWNER, U256::from(60), U256::from(40))
			.unwrap();
		escrow.credit_relayer(RELAYER, U256::from(40)).unwrap();
		assert_eq!(escrow.balance_of(OWNER), U256::ZERO);
		assert_eq!(escrow.balance_of(RELAYER), U256::from(40));
	}

	#[test]
	fn test_credit_beyond_max_is_refused() {
		let mut escrow = EscrowLedger::new();
		escrow.deposit(RELAYER, U256::MAX).unwrap();
		escrow.deposit(OWNER, U256::from(10)).unwrap();

		assert_eq!(
			escrow.deposit(RELAYER, U256::from(1)),
			Err(EscrowError::Overflow { owner: RELAYER })
		);
		assert_eq!(
			escrow.credit_relayer(RELAYER, U256::from(1)),
			Err(EscrowError::Overflow { owner: RELAYER })
		);
		assert_eq!(escrow.balance_of(RELAYER), U256::MAX);

		// A settlement debit whose parts overflow when summed cannot be covered.
		let err = escrow
			.debit_for_settlement(OWNER, U256::MAX, U256::from(1))
			.unwrap_err();
		assert!(matches!(err, EscrowError::InsufficientEscrow { .. }));
		assert_eq!(escrow.balance_of(OWNER), U256::from(10));
	}
}
