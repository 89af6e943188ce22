//! Builder pattern for constructing relay engines.
//!
//! Composes a [`RelayEngine`] from the validated configuration and a set of
//! storage factories, restores previously committed state and deploys any
//! pools the configuration seeds that do not exist yet.

use crate::engine::{event_bus::EventBus, RelayEngine};
use crate::relay::Relay;
use relay_account::SignatureVerifier;
use relay_config::Config;
use relay_pool::PoolResolver;
use relay_settlement::SwapExecutor;
use relay_storage::{StorageError, StorageInterface, StorageService};
use relay_types::ConfigSchema;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during relay engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions available to the builder, keyed by implementation name.
pub struct RelayFactories<SF> {
	pub storage_factories: HashMap<String, SF>,
}

/// Builder for constructing a RelayEngine with pluggable storage.
pub struct RelayBuilder {
	config: Config,
}

impl RelayBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine, restores its state and applies pool seeds.
	pub async fn build<SF>(self, factories: RelayFactories<SF>) -> Result<RelayEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
	{
		// Create storage implementations
		let mut storage_impls = HashMap::new();
		for (name, config) in &self.config.storage.implementations {
			if let Some(factory) = factories.storage_factories.get(name) {
				match factory(config) {
					Ok(implementation) => {
						// Validate the configuration using the implementation's schema
						if let Err(e) = implementation.config_schema().validate(config) {
							tracing::error!(
								component = "storage",
								implementation = %name,
								error = %e,
								"Invalid configuration for storage implementation"
							);
							return Err(BuilderError::Config(format!(
								"Invalid configuration for storage implementation '{}': {}",
								name, e
							)));
						}
						storage_impls.insert(name.clone(), implementation);
						let is_primary = &self.config.storage.primary == name;
						tracing::info!(component = "storage", implementation = %name, enabled = %is_primary, "Loaded");
					}
					Err(e) => {
						tracing::error!(
							component = "storage",
							implementation = %name,
							error = %e,
							"Failed to create storage implementation"
						);
						return Err(BuilderError::Config(format!(
							"Failed to create storage implementation '{}': {}",
							name, e
						)));
					}
				}
			}
		}

		let primary_storage = &self.config.storage.primary;
		let storage_backend = storage_impls.remove(primary_storage).ok_or_else(|| {
			BuilderError::MissingComponent(format!(
				"Primary storage '{}' has no registered implementation",
				primary_storage
			))
		})?;
		let storage = Arc::new(StorageService::new(storage_backend));

		let relay_config = &self.config.relay;
		let relay = Relay::new(
			SignatureVerifier::new(relay_config.authority),
			PoolResolver::new(relay_config.factory, relay_config.pool_init_code_hash),
			SwapExecutor::new(relay_config.wrapped_native, relay_config.address),
			relay_config.settlement_gas_units,
		);
		tracing::info!(
			relay_id = %relay_config.id,
			authority = %relay_config.authority,
			factory = %relay_config.factory,
			"Relay configured"
		);

		let engine = RelayEngine::new(relay, storage, EventBus::new(1000));
		engine
			.restore()
			.await
			.map_err(|e| BuilderError::Config(format!("Failed to restore relay state: {}", e)))?;

		let deployed = engine.pools().await;
		for seed in &self.config.pools {
			let address = engine
				.relay()
				.resolver()
				.resolve(seed.token_a, seed.token_b, seed.fee);
			if deployed.iter().any(|pool| pool.address == address) {
				tracing::debug!(pool = %address, "Seeded pool already deployed");
				continue;
			}
			engine
				.deploy_pool(
					seed.token_a,
					seed.token_b,
					seed.fee,
					seed.reserve_a,
					seed.reserve_b,
				)
				.await
				.map_err(|e| {
					BuilderError::Config(format!("Failed to seed pool {}: {}", address, e))
				})?;
		}

		Ok(engine)
	}
}
