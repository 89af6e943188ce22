//! Common types module for the gasless swap relay.
//!
//! This module defines the data model shared by every relay component: the
//! signed swap authorization and its callback context, the canonical payload
//! codec, recoverable signatures, the token ledger the pools settle against,
//! settlement receipts and the events published after each commit.

/// Swap authorization, callback context and payload types.
pub mod authorization;
/// Canonical binary encoding of signed swap payloads.
pub mod codec;
/// Events published by the relay engine after a committed operation.
pub mod events;
/// Token balances and allowances the pools settle against.
pub mod ledger;
/// Settlement receipts and relayer submission context.
pub mod receipt;
/// Self-registration trait for pluggable implementations.
pub mod registry;
/// Redacting wrapper for private keys.
pub mod secret_string;
/// Recoverable ECDSA signature triple.
pub mod signature;
/// Storage namespaces.
pub mod storage;
/// Formatting and time helpers.
pub mod utils;
/// Configuration validation types for implementation-specific TOML tables.
pub mod validation;

pub use alloy_primitives::{Address, Bytes, B256, I256, U160, U256};

pub use authorization::*;
pub use codec::{decode_payload, encode_payload, payload_digest, CodecError};
pub use events::*;
pub use ledger::*;
pub use receipt::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use signature::*;
pub use storage::*;
pub use utils::{current_timestamp, parse_hex_bytes, with_0x_prefix, without_0x_prefix};
pub use validation::*;
