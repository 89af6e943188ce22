//! Authority signature verification.
//!
//! Recovers the signer of a payload digest and compares it against the one
//! authority fixed at construction. The digest is signed as an EIP-191
//! personal message, matching what `signMessage` produces in wallet tooling.

use alloy_primitives::{eip191_hash_message, Address, B256};
use relay_types::{RecoverableSignature, SignatureFormatError};
use thiserror::Error;

/// Reasons a signature fails to authorize a payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
	/// The `(v, r, s)` triple is malformed.
	#[error("Malformed signature: {0}")]
	Format(#[from] SignatureFormatError),
	/// No public key could be recovered from the triple.
	#[error("Signer recovery failed: {0}")]
	Recovery(String),
	/// A valid signature by some other key.
	#[error("Signed by {recovered}, expected authority {expected}")]
	UnknownSigner { expected: Address, recovered: Address },
}

/// Checks payload signatures against a single fixed authority.
///
/// Rotation or multiple authorities are not supported; a new verifier is
/// built when the authority changes.
#[derive(Debug, Clone, Copy)]
pub struct SignatureVerifier {
	authority: Address,
}

impl SignatureVerifier {
	pub fn new(authority: Address) -> Self {
		Self { authority }
	}

	pub fn authority(&self) -> Address {
		self.authority
	}

	/// Hash actually signed for a payload digest.
	pub fn signing_hash(digest: &B256) -> B256 {
		eip191_hash_message(digest)
	}

	/// Recovers the address that produced `signature` over `digest`.
	pub fn recover(
		&self,
		digest: &B256,
		signature: &RecoverableSignature,
	) -> Result<Address, VerifyError> {
		let signature = signature.to_signature()?;
		signature
			.recover_address_from_prehash(&Self::signing_hash(digest))
			.map_err(|e| VerifyError::Recovery(e.to_string()))
	}

	/// Recovers the signer and requires it to be the authority.
	pub fn verify(
		&self,
		digest: &B256,
		signature: &RecoverableSignature,
	) -> Result<Address, VerifyError> {
		let recovered = self.recover(digest, signature)?;
		if recovered != self.authority {
			return Err(VerifyError::UnknownSigner {
				expected: self.authority,
				recovered,
			});
		}
		Ok(recovered)
	}
}
