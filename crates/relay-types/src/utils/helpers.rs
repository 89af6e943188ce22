//! Helper utilities for common operations.

use super::formatting::without_0x_prefix;

/// Current unix timestamp in seconds; 0 if the clock is before the epoch.
pub fn current_timestamp() -> u64 {
	std::time::SystemTime::now()
		.duration_since(std::time::UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}

/// Decodes a hex string with or without the `0x` prefix.
pub fn parse_hex_bytes(input: &str) -> Result<Vec<u8>, hex::FromHexError> {
	hex::decode(without_0x_prefix(input.trim()))
}
