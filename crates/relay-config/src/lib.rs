//! Configuration module for the gasless swap relay.
//!
//! Loads the relay's TOML configuration, resolves `${VAR}` and
//! `${VAR:-default}` references against the environment and validates the
//! result before any component is built from it.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)

mod loader;

use alloy_primitives::{Address, B256, U256};
use regex::Regex;
use relay_pool::{PoolKey, DEFAULT_FACTORY, DEFAULT_POOL_INIT_CODE_HASH, FEE_DENOMINATOR};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Gas units reimbursed per settlement when the config does not say.
pub const DEFAULT_SETTLEMENT_GAS_UNITS: u64 = 189_000;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, not the echoed input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the relay.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Relay identity and protocol parameters.
	pub relay: RelayConfig,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Off-chain authority signer, only needed to sign payloads locally.
	pub authority: Option<AuthorityConfig>,
	/// Devnet pools deployed with the given reserves at startup.
	#[serde(default)]
	pub pools: Vec<PoolSeedConfig>,
}

/// Relay identity and protocol parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
	/// Unique identifier for this relay instance.
	pub id: String,
	/// Address owners approve as spender for token-funded swaps.
	pub address: Address,
	/// The single authority whose signatures are accepted.
	pub authority: Address,
	/// Pool factory used for address resolution.
	#[serde(default = "default_factory")]
	pub factory: Address,
	/// Hash of the pool creation code used for address resolution.
	#[serde(default = "default_pool_init_code_hash")]
	pub pool_init_code_hash: B256,
	/// Wrapped form of the native value unit; inputs in this token are
	/// funded from escrow.
	pub wrapped_native: Address,
	/// Gas units the relayer is reimbursed for per settlement.
	#[serde(default = "default_settlement_gas_units")]
	pub settlement_gas_units: u64,
}

fn default_factory() -> Address {
	DEFAULT_FACTORY
}

fn default_pool_init_code_hash() -> B256 {
	DEFAULT_POOL_INIT_CODE_HASH
}

fn default_settlement_gas_units() -> u64 {
	DEFAULT_SETTLEMENT_GAS_UNITS
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the authority signer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthorityConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of authority implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// A pool deployed at startup, with initial reserves minted to it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolSeedConfig {
	pub token_a: Address,
	pub token_b: Address,
	/// Fee tier in hundredths of a basis point.
	pub fee: u32,
	pub reserve_a: U256,
	pub reserve_b: U256,
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				}
			},
		};

		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives and
	/// resolving environment variables.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Validates the configuration to ensure all required fields are set and
	/// consistent.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.relay.id.trim().is_empty() {
			return Err(ConfigError::Validation("Relay ID cannot be empty".into()));
		}
		if self.relay.authority == Address::ZERO {
			return Err(ConfigError::Validation(
				"Relay authority cannot be the zero address".into(),
			));
		}
		if self.relay.address == Address::ZERO {
			return Err(ConfigError::Validation(
				"Relay address cannot be the zero address".into(),
			));
		}
		if self.relay.wrapped_native == Address::ZERO {
			return Err(ConfigError::Validation(
				"Wrapped native token cannot be the zero address".into(),
			));
		}
		if self.relay.settlement_gas_units == 0 {
			return Err(ConfigError::Validation(
				"settlement_gas_units must be greater than zero".into(),
			));
		}

		validate_primary("storage", &self.storage.primary, &self.storage.implementations)?;
		if let Some(authority) = &self.authority {
			validate_primary("authority", &authority.primary, &authority.implementations)?;
		}

		let mut seen = HashSet::new();
		for pool in &self.pools {
			if pool.token_a == pool.token_b {
				return Err(ConfigError::Validation(format!(
					"Pool {}/{} must trade two distinct tokens",
					pool.token_a, pool.token_b
				)));
			}
			if pool.fee == 0 || pool.fee >= FEE_DENOMINATOR {
				return Err(ConfigError::Validation(format!(
					"Pool fee {} must be between 1 and {}",
					pool.fee,
					FEE_DENOMINATOR - 1
				)));
			}
			if pool.reserve_a.is_zero() || pool.reserve_b.is_zero() {
				return Err(ConfigError::Validation(format!(
					"Pool {}/{} must be seeded with non-zero reserves",
					pool.token_a, pool.token_b
				)));
			}
			if !seen.insert(PoolKey::new(pool.token_a, pool.token_b, pool.fee)) {
				return Err(ConfigError::Validation(format!(
					"Duplicate pool {}/{} at fee {}",
					pool.token_a, pool.token_b, pool.fee
				)));
			}
		}

		Ok(())
	}
}

fn validate_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations. Available: {:?}",
			section,
			primary,
			implementations.keys().collect::<Vec<_>>()
		)));
	}
	Ok(())
}

/// Parses TOML, resolving environment variables and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE: &str = r#"
[relay]
id = "devnet-relay"
address = "0x7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e7e"
authority = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
wrapped_native = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"

[storage]
primary = "memory"
[storage.implementations.memory]
"#;

	fn with(extra: &str) -> String {
		format!("{}\n{}", BASE, extra)
	}

	#[test]
	fn test_defaults_applied() {
		let config: Config = BASE.parse().unwrap();
		assert_eq!(config.relay.id, "devnet-relay");
		assert_eq!(config.relay.factory, DEFAULT_FACTORY);
		assert_eq!(config.relay.pool_init_code_hash, DEFAULT_POOL_INIT_CODE_HASH);
		assert_eq!(config.relay.settlement_gas_units, DEFAULT_SETTLEMENT_GAS_UNITS);
		assert!(config.authority.is_none());
		assert!(config.pools.is_empty());
	}

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("RELAY_TEST_HOST", "localhost");
		std::env::set_var("RELAY_TEST_PORT", "5432");

		let input = "host = \"${RELAY_TEST_HOST}:${RELAY_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("RELAY_TEST_HOST");
		std::env::remove_var("RELAY_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${RELAY_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${RELAY_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.unwrap_err().to_string().contains("RELAY_MISSING_VAR"));
	}

	#[test]
	fn test_config_with_env_vars() {
		std::env::set_var("RELAY_TEST_GAS_UNITS", "200000");
		let config: Config = BASE
			.replace(
				"[storage]",
				"settlement_gas_units = ${RELAY_TEST_GAS_UNITS}\n\n[storage]",
			)
			.parse()
			.unwrap();
		assert_eq!(config.relay.settlement_gas_units, 200_000);
		std::env::remove_var("RELAY_TEST_GAS_UNITS");
	}

	#[test]
	fn test_pool_seeds_parse() {
		let config: Config = with(
			r#"
[[pools]]
token_a = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
token_b = "0x6B175474E89094C44Da98b954EedeAC495271d0F"
fee = 3000
reserve_a = "1000000000000000000000"
reserve_b = "2000000000000000000000000"
"#,
		)
		.parse()
		.unwrap();

		assert_eq!(config.pools.len(), 1);
		assert_eq!(config.pools[0].fee, 3000);
		assert_eq!(
			config.pools[0].reserve_a,
			U256::from(1000u64) * U256::from(10u64).pow(U256::from(18))
		);
	}

	#[test]
	fn test_rejects_zero_authority() {
		let input = BASE.replace(
			"0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
			"0x0000000000000000000000000000000000000000",
		);
		let err = input.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("authority"));
	}

	#[test]
	fn test_rejects_unknown_storage_primary() {
		let input = BASE.replace("primary = \"memory\"", "primary = \"file\"");
		let err = input.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Primary storage 'file' not found"));
	}

	#[test]
	fn test_rejects_zero_gas_units() {
		let input = BASE.replace("[storage]", "settlement_gas_units = 0\n\n[storage]");
		assert!(input.parse::<Config>().is_err());
	}

	#[test]
	fn test_rejects_duplicate_pools_in_either_order() {
		let input = with(
			r#"
[[pools]]
token_a = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
token_b = "0x6B175474E89094C44Da98b954EedeAC495271d0F"
fee = 3000
reserve_a = "1"
reserve_b = "1"

[[pools]]
token_a = "0x6B175474E89094C44Da98b954EedeAC495271d0F"
token_b = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
fee = 3000
reserve_a = "1"
reserve_b = "1"
"#,
		);
		let err = input.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Duplicate pool"));
	}

	#[test]
	fn test_rejects_oversized_fee() {
		let input = with(
			r#"
[[pools]]
token_a = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
token_b = "0x6B175474E89094C44Da98b954EedeAC495271d0F"
fee = 1000000
reserve_a = "1"
reserve_b = "1"
"#,
		);
		assert!(input.parse::<Config>().is_err());
	}

	#[test]
	fn test_authority_primary_must_exist() {
		let input = with(
			r#"
[authority]
primary = "local"
[authority.implementations.remote]
"#,
		);
		let err = input.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Primary authority 'local'"));
	}

	#[tokio::test]
	async fn test_shipped_devnet_config_loads() {
		let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/relay.toml");
		let config = Config::from_file(path.to_str().unwrap()).await.unwrap();

		assert_eq!(config.relay.id, "devnet-relay");
		assert_eq!(config.storage.primary, "file");
		assert_eq!(config.pools.len(), 2);
		assert!(config.authority.is_some());
	}
}
