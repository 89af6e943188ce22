//! Storage-related types for the relay.

use std::str::FromStr;

/// Storage namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Committed ledger state (escrow, nonces, token balances).
	Ledger,
	/// Settlement receipts keyed by owner and nonce.
	Receipts,
	/// Descriptors of deployed pools.
	Pools,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Ledger => "ledger",
			StorageKey::Receipts => "receipts",
			StorageKey::Pools => "pools",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Ledger, Self::Receipts, Self::Pools].into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"ledger" => Ok(Self::Ledger),
			"receipts" => Ok(Self::Receipts),
			"pools" => Ok(Self::Pools),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
