//! Factory registry for relay implementations.
//!
//! Collects every self-registered storage and authority implementation so
//! that configuration can select them by name.

use relay_account::{AuthorityError, AuthorityInterface, AuthorityService};
use relay_config::{AuthorityConfig, Config};
use relay_core::{RelayBuilder, RelayEngine, RelayFactories};
use relay_storage::{StorageError, StorageInterface};
use relay_types::ConfigSchema;
use std::collections::HashMap;
use std::sync::OnceLock;

pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;
pub type AuthorityFactory = fn(&toml::Value) -> Result<Box<dyn AuthorityInterface>, AuthorityError>;

/// Global registry for all implementation factories
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub authority: HashMap<String, AuthorityFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			storage: HashMap::new(),
			authority: HashMap::new(),
		}
	}

	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}

	pub fn register_authority(&mut self, name: impl Into<String>, factory: AuthorityFactory) {
		self.authority.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Get the global factory registry, populating it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in relay_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}

		for (name, factory) in relay_account::get_all_implementations() {
			tracing::debug!("Registering authority implementation: {}", name);
			registry.register_authority(name, factory);
		}

		registry
	})
}

/// Macro to build factories from config implementations
macro_rules! build_factories {
	($registry:expr, $config_impls:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $config_impls.keys() {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)
				.into());
			}
		}
		factories
	}};
}

/// Builds the relay engine using the registry and config.
pub async fn build_engine_from_config(
	config: Config,
) -> Result<RelayEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();
	let storage_factories =
		build_factories!(registry, config.storage.implementations, storage, "storage");

	let builder = RelayBuilder::new(config);
	Ok(builder.build(RelayFactories { storage_factories }).await?)
}

/// Builds the primary authority signer from the `[authority]` section.
pub fn build_authority(
	config: &AuthorityConfig,
) -> Result<AuthorityService, Box<dyn std::error::Error>> {
	let registry = get_registry();
	let factories = build_factories!(registry, config.implementations, authority, "authority");

	let factory = factories
		.get(&config.primary)
		.ok_or_else(|| format!("Primary authority '{}' is not configured", config.primary))?;
	let implementation_config = config
		.implementations
		.get(&config.primary)
		.ok_or_else(|| format!("Primary authority '{}' is not configured", config.primary))?;

	let implementation = factory(implementation_config)?;
	// Validate the configuration using the implementation's schema
	implementation.config_schema().validate(implementation_config)?;
	tracing::info!(component = "authority", implementation = %config.primary, "Loaded");
	Ok(AuthorityService::new(implementation))
}
