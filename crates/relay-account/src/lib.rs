//! Authority signing and signature verification for the relay.
//!
//! The authority is the single off-chain key whose signature gates every
//! relayed swap. This crate provides both halves of that gate: the
//! [`AuthorityService`] that signs payload digests off-chain, and the
//! [`SignatureVerifier`] the relay uses to recover and check the signer.

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use relay_types::{
	ConfigSchema, ImplementationRegistry, RecoverableSignature, SignedPayload, SwapPayload,
};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

pub mod verifier;

pub use verifier::{SignatureVerifier, VerifyError};

/// Errors that can occur during authority operations.
#[derive(Debug, Error)]
pub enum AuthorityError {
	/// Signing the digest failed.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// The configured key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// Error raised by the underlying implementation.
	#[error("Implementation error: {0}")]
	Implementation(String),
}

/// Trait defining the interface for authority signer implementations.
#[async_trait]
pub trait AuthorityInterface: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Address the relay must be configured with to accept this signer.
	async fn address(&self) -> Result<Address, AuthorityError>;

	/// Signs a payload digest as an EIP-191 personal message.
	async fn sign_digest(&self, digest: &B256) -> Result<RecoverableSignature, AuthorityError>;
}

/// Type alias for authority factory functions.
pub type AuthorityFactory = fn(&toml::Value) -> Result<Box<dyn AuthorityInterface>, AuthorityError>;

/// Registry trait for authority implementations.
pub trait AuthorityRegistry: ImplementationRegistry<Factory = AuthorityFactory> {}

/// Get all registered authority implementations.
pub fn get_all_implementations() -> Vec<(&'static str, AuthorityFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Service producing signed payloads for relayers.
pub struct AuthorityService {
	implementation: Box<dyn AuthorityInterface>,
}

impl AuthorityService {
	pub fn new(implementation: Box<dyn AuthorityInterface>) -> Self {
		Self { implementation }
	}

	pub async fn address(&self) -> Result<Address, AuthorityError> {
		self.implementation.address().await
	}

	/// Encodes the payload canonically and signs its digest.
	pub async fn sign_payload(&self, payload: &SwapPayload) -> Result<SignedPayload, AuthorityError> {
		let bytes = payload.encode();
		let digest = relay_types::payload_digest(&bytes);
		let signature = self.implementation.sign_digest(&digest).await?;

		tracing::debug!(
			owner = %payload.owner(),
			nonce = %payload.authorization.nonce,
			digest = %digest,
			"Signed swap payload"
		);

		Ok(SignedPayload {
			payload: bytes,
			signature,
		})
	}
}
