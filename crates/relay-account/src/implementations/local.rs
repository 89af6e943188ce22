//! Local private-key authority.
//!
//! Keeps the authority key in process memory. Suitable for devnets and for
//! quoting services that hold their key on the same host.

use crate::{AuthorityError, AuthorityFactory, AuthorityInterface, AuthorityRegistry};
use alloy_primitives::{Address, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use relay_types::{
	without_0x_prefix, ConfigSchema, Field, FieldType, ImplementationRegistry, RecoverableSignature,
	Schema, SecretString, ValidationError,
};

/// Authority backed by an in-memory secp256k1 key.
pub struct LocalAuthority {
	signer: PrivateKeySigner,
}

impl LocalAuthority {
	/// Builds the authority from a hex private key (with or without `0x`).
	pub fn new(private_key: &SecretString) -> Result<Self, AuthorityError> {
		let signer = parse_private_key(private_key)?;
		Ok(Self { signer })
	}

	/// Fresh random key; used by tests and throwaway devnets.
	pub fn random() -> Self {
		Self {
			signer: PrivateKeySigner::random(),
		}
	}
}

/// Parses a hex private key into a signer.
pub fn parse_private_key(private_key: &SecretString) -> Result<PrivateKeySigner, AuthorityError> {
	private_key.with_exposed(|key| {
		without_0x_prefix(key.trim())
			.parse::<PrivateKeySigner>()
			.map_err(|e| AuthorityError::InvalidKey(e.to_string()))
	})
}

/// Address controlled by a hex private key.
pub fn address_from_private_key(private_key: &SecretString) -> Result<Address, AuthorityError> {
	parse_private_key(private_key).map(|signer| signer.address())
}

#[async_trait]
impl AuthorityInterface for LocalAuthority {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LocalAuthoritySchema)
	}

	async fn address(&self) -> Result<Address, AuthorityError> {
		Ok(self.signer.address())
	}

	async fn sign_digest(&self, digest: &B256) -> Result<RecoverableSignature, AuthorityError> {
		let signature = self
			.signer
			.sign_message_sync(digest.as_slice())
			.map_err(|e| AuthorityError::SigningFailed(e.to_string()))?;
		Ok(RecoverableSignature::from(signature))
	}
}

/// Configuration schema for LocalAuthority.
pub struct LocalAuthoritySchema;

impl ConfigSchema for LocalAuthoritySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("private_key", FieldType::String).with_validator(|value| {
					let key = value.as_str().unwrap_or_default();
					let hex = without_0x_prefix(key);
					if hex.len() != 64 {
						return Err("Private key must be 64 hex characters".to_string());
					}
					if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
						return Err("Private key must contain only hex characters".to_string());
					}
					Ok(())
				}),
			],
			vec![],
		);

		schema.validate(config)
	}
}

/// Factory function to create a local authority from configuration.
///
/// Configuration parameters:
/// - `private_key`: hex-encoded secp256k1 key
pub fn create_authority(config: &toml::Value) -> Result<Box<dyn AuthorityInterface>, AuthorityError> {
	let key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AuthorityError::InvalidKey("private_key is required".into()))?;

	Ok(Box::new(LocalAuthority::new(&SecretString::from(key))?))
}

/// Registry for the local authority implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = AuthorityFactory;

	fn factory() -> Self::Factory {
		create_authority
	}
}

impl AuthorityRegistry for Registry {}
