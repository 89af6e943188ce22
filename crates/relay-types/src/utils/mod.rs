//! Utility functions for formatting and time.

pub mod formatting;
pub mod helpers;

pub use formatting::{with_0x_prefix, without_0x_prefix};
pub use helpers::{current_timestamp, parse_hex_bytes};
