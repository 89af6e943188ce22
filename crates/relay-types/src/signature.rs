//! Recoverable ECDSA signature in the `(v, r, s)` form relayers submit.

use alloy_primitives::{Signature, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Half of the secp256k1 group order; canonical signatures keep `s` at or
/// below it.
pub const SECP256K1N_HALF: U256 = U256::from_limbs([
	0xdfe9_2f46_681b_20a0,
	0x5d57_6e73_57a4_501d,
	0xffff_ffff_ffff_ffff,
	0x7fff_ffff_ffff_ffff,
]);

/// Errors raised when a signature triple is structurally unusable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureFormatError {
	#[error("Invalid recovery id {0}")]
	RecoveryId(u8),
	#[error("Signature component {0} is zero")]
	ZeroComponent(&'static str),
	#[error("Signature s value is not in the lower half order")]
	HighS,
	#[error("Invalid signature length: expected 65 bytes, got {0}")]
	Length(usize),
}

/// The three signature components as transported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecoverableSignature {
	/// Recovery id, either 27/28 or 0/1.
	pub v: u8,
	pub r: B256,
	pub s: B256,
}

impl RecoverableSignature {
	pub fn new(v: u8, r: B256, s: B256) -> Self {
		Self { v, r, s }
	}

	/// Parses the 65-byte `r ‖ s ‖ v` form.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureFormatError> {
		if bytes.len() != 65 {
			return Err(SignatureFormatError::Length(bytes.len()));
		}
		Ok(Self {
			r: B256::from_slice(&bytes[..32]),
			s: B256::from_slice(&bytes[32..64]),
			v: bytes[64],
		})
	}

	/// Serializes to the 65-byte `r ‖ s ‖ v` form.
	pub fn to_bytes(&self) -> [u8; 65] {
		let mut out = [0u8; 65];
		out[..32].copy_from_slice(self.r.as_slice());
		out[32..64].copy_from_slice(self.s.as_slice());
		out[64] = self.v;
		out
	}

	/// y-parity encoded by `v`.
	pub fn y_parity(&self) -> Result<bool, SignatureFormatError> {
		match self.v {
			0 | 27 => Ok(false),
			1 | 28 => Ok(true),
			other => Err(SignatureFormatError::RecoveryId(other)),
		}
	}

	/// Converts into an alloy signature, rejecting malleable or degenerate
	/// components.
	pub fn to_signature(&self) -> Result<Signature, SignatureFormatError> {
		let parity = self.y_parity()?;
		let r = U256::from_be_bytes(self.r.0);
		let s = U256::from_be_bytes(self.s.0);
		if r.is_zero() {
			return Err(SignatureFormatError::ZeroComponent("r"));
		}
		if s.is_zero() {
			return Err(SignatureFormatError::ZeroComponent("s"));
		}
		if s > SECP256K1N_HALF {
			return Err(SignatureFormatError::HighS);
		}
		Ok(Signature::new(r, s, parity))
	}
}

impl From<Signature> for RecoverableSignature {
	fn from(sig: Signature) -> Self {
		Self {
			v: 27 + sig.v() as u8,
			r: B256::from(sig.r()),
			s: B256::from(sig.s()),
		}
	}
}

impl fmt::Display for RecoverableSignature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "v={} r={} s={}", self.v, self.r, self.s)
	}
}
