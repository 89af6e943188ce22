//! Canonical payload codec.
//!
//! The signed payload has exactly one byte representation. Encoders are
//! versioned modules built from explicit word writes; [`v1`] is the format
//! the off-chain signing tooling produces today and is re-exported as the
//! current format.

pub mod v1;

use alloy_primitives::{keccak256, Address, B256, U256};
use thiserror::Error;

pub use v1::{decode_payload, encode_payload, CALLBACK_CONTEXT_LEN, PAYLOAD_LEN, SWAP_PARAMS_LEN};

/// Errors raised while decoding a payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
	/// The payload or one of its blobs has the wrong size.
	#[error("Invalid length for {what}: expected {expected} bytes, got {actual}")]
	Length {
		what: &'static str,
		expected: usize,
		actual: usize,
	},
	/// A framing offset does not point where the canonical layout puts it.
	#[error("Non-canonical offset for {what}: expected {expected}, got {actual}")]
	Offset {
		what: &'static str,
		expected: usize,
		actual: String,
	},
	/// A field holds a value outside the range of its declared type.
	#[error("Invalid field '{field}': {reason}")]
	InvalidField { field: &'static str, reason: String },
}

/// Hash of the full encoded payload; identical on every side of the wire.
pub fn payload_digest(payload: &[u8]) -> B256 {
	keccak256(payload)
}

/// Minimal ABI word writer for the static fields of a payload.
#[derive(Debug)]
pub(crate) struct WordWriter {
	buf: Vec<u8>,
}

impl WordWriter {
	pub(crate) fn with_capacity(words: usize) -> Self {
		Self {
			buf: Vec::with_capacity(words * 32),
		}
	}

	pub(crate) fn push_u256(&mut self, v: U256) {
		self.buf.extend_from_slice(&v.to_be_bytes::<32>());
	}

	pub(crate) fn push_address(&mut self, addr: &Address) {
		let mut word = [0u8; 32];
		word[12..].copy_from_slice(addr.as_slice());
		self.buf.extend_from_slice(&word);
	}

	pub(crate) fn push_bool(&mut self, v: bool) {
		let mut word = [0u8; 32];
		word[31] = v as u8;
		self.buf.extend_from_slice(&word);
	}

	pub(crate) fn push_bytes(&mut self, bytes: &[u8]) {
		self.buf.extend_from_slice(bytes);
	}

	pub(crate) fn finish(self) -> Vec<u8> {
		self.buf
	}
}

/// Cursor over 32-byte words that rejects dirty padding.
pub(crate) struct WordReader<'a> {
	words: std::slice::ChunksExact<'a, u8>,
}

impl<'a> WordReader<'a> {
	/// Callers have already checked `bytes.len()` is a multiple of 32.
	pub(crate) fn new(bytes: &'a [u8]) -> Self {
		Self {
			words: bytes.chunks_exact(32),
		}
	}

	fn next_word(&mut self, field: &'static str) -> Result<&'a [u8], CodecError> {
		self.words.next().ok_or_else(|| CodecError::InvalidField {
			field,
			reason: "missing word".into(),
		})
	}

	pub(crate) fn read_u256(&mut self, field: &'static str) -> Result<U256, CodecError> {
		let word = self.next_word(field)?;
		Ok(U256::from_be_slice(word))
	}

	/// Reads a word whose top `32 - width` bytes must be zero.
	pub(crate) fn read_narrow(
		&mut self,
		field: &'static str,
		width: usize,
	) -> Result<&'a [u8], CodecError> {
		let word = self.next_word(field)?;
		let (padding, value) = word.split_at(32 - width);
		if padding.iter().any(|b| *b != 0) {
			return Err(CodecError::InvalidField {
				field,
				reason: format!("value does not fit in {} bytes", width),
			});
		}
		Ok(value)
	}

	pub(crate) fn read_address(&mut self, field: &'static str) -> Result<Address, CodecError> {
		self.read_narrow(field, 20).map(Address::from_slice)
	}

	pub(crate) fn read_bool(&mut self, field: &'static str) -> Result<bool, CodecError> {
		match self.read_narrow(field, 1)?[0] {
			0 => Ok(false),
			1 => Ok(true),
			other => Err(CodecError::InvalidField {
				field,
				reason: format!("boolean word holds {}", other),
			}),
		}
	}
}
