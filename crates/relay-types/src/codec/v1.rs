//! Payload format version 1.
//!
//! Byte-for-byte identical to `abi.encode(bytes swapParams, bytes callbackData)`
//! where both blobs are ABI encodings of static tuples:
//!
//! ```text
//! swapParams   = (uint256 amount, uint256 limit, uint256 deadline, uint256 nonce,
//!                 uint256 maxIncentive, address pool, uint160 priceLimit, bool exactIn)
//! callbackData = (address inputAsset, address outputAsset, address beneficiary, uint24 fee)
//!
//! [0x000] 0x40             offset of swapParams
//! [0x020] 0x160            offset of callbackData
//! [0x040] 256              length of swapParams
//! [0x060] swapParams       8 words
//! [0x160] 128              length of callbackData
//! [0x180] callbackData     4 words
//! ```

use super::{CodecError, WordReader, WordWriter};
use crate::authorization::{Authorization, CallbackContext, SwapDirection};
use alloy_primitives::{Bytes, U160, U256};

/// Size of the encoded swap parameters blob.
pub const SWAP_PARAMS_LEN: usize = 8 * 32;
/// Size of the encoded callback context blob.
pub const CALLBACK_CONTEXT_LEN: usize = 4 * 32;
/// Size of the full framed payload.
pub const PAYLOAD_LEN: usize = 2 * 32 + 32 + SWAP_PARAMS_LEN + 32 + CALLBACK_CONTEXT_LEN;

const SWAP_PARAMS_OFFSET: usize = 2 * 32;
const CALLBACK_CONTEXT_OFFSET: usize = SWAP_PARAMS_OFFSET + 32 + SWAP_PARAMS_LEN;

fn encode_swap_params(auth: &Authorization) -> Vec<u8> {
	let mut enc = WordWriter::with_capacity(8);
	enc.push_u256(auth.amount);
	enc.push_u256(auth.limit);
	enc.push_u256(auth.deadline);
	enc.push_u256(auth.nonce);
	enc.push_u256(auth.max_incentive);
	enc.push_address(&auth.pool);
	enc.push_u256(U256::from(auth.price_limit));
	enc.push_bool(auth.direction.is_exact_input());
	enc.finish()
}

fn encode_callback_context(ctx: &CallbackContext) -> Vec<u8> {
	let mut enc = WordWriter::with_capacity(4);
	enc.push_address(&ctx.input_asset);
	enc.push_address(&ctx.output_asset);
	enc.push_address(&ctx.beneficiary);
	enc.push_u256(U256::from(ctx.fee_tier));
	enc.finish()
}

/// Encodes an authorization and its callback context into the signed payload.
pub fn encode_payload(auth: &Authorization, ctx: &CallbackContext) -> Bytes {
	let swap_params = encode_swap_params(auth);
	let callback = encode_callback_context(ctx);

	let mut enc = WordWriter::with_capacity(PAYLOAD_LEN / 32);
	enc.push_u256(U256::from(SWAP_PARAMS_OFFSET));
	enc.push_u256(U256::from(CALLBACK_CONTEXT_OFFSET));
	enc.push_u256(U256::from(swap_params.len()));
	enc.push_bytes(&swap_params);
	enc.push_u256(U256::from(callback.len()));
	enc.push_bytes(&callback);
	enc.finish().into()
}

fn expect_word(
	reader: &mut WordReader<'_>,
	what: &'static str,
	expected: usize,
) -> Result<(), CodecError> {
	let actual = reader.read_u256(what)?;
	if actual != U256::from(expected) {
		return Err(CodecError::Offset {
			what,
			expected,
			actual: actual.to_string(),
		});
	}
	Ok(())
}

fn decode_swap_params(reader: &mut WordReader<'_>) -> Result<Authorization, CodecError> {
	let amount = reader.read_u256("amount")?;
	let limit = reader.read_u256("limit")?;
	let deadline = reader.read_u256("deadline")?;
	let nonce = reader.read_u256("nonce")?;
	let max_incentive = reader.read_u256("max_incentive")?;
	let pool = reader.read_address("pool")?;
	let price_limit = U160::from_be_slice(reader.read_narrow("price_limit", 20)?);
	let direction = SwapDirection::from_exact_input(reader.read_bool("exact_input")?);

	Ok(Authorization {
		amount,
		limit,
		deadline,
		nonce,
		max_incentive,
		pool,
		price_limit,
		direction,
	})
}

fn decode_callback_context(reader: &mut WordReader<'_>) -> Result<CallbackContext, CodecError> {
	let input_asset = reader.read_address("input_asset")?;
	let output_asset = reader.read_address("output_asset")?;
	let beneficiary = reader.read_address("beneficiary")?;
	let fee = reader.read_narrow("fee_tier", 3)?;
	let fee_tier = u32::from_be_bytes([0, fee[0], fee[1], fee[2]]);

	Ok(CallbackContext {
		input_asset,
		output_asset,
		beneficiary,
		fee_tier,
	})
}

/// Decodes a signed payload, accepting only the canonical layout.
pub fn decode_payload(bytes: &[u8]) -> Result<(Authorization, CallbackContext), CodecError> {
	if bytes.len() != PAYLOAD_LEN {
		return Err(CodecError::Length {
			what: "payload",
			expected: PAYLOAD_LEN,
			actual: bytes.len(),
		});
	}

	let mut reader = WordReader::new(bytes);
	expect_word(&mut reader, "swap params offset", SWAP_PARAMS_OFFSET)?;
	expect_word(&mut reader, "callback context offset", CALLBACK_CONTEXT_OFFSET)?;

	expect_length(&mut reader, "swap params", SWAP_PARAMS_LEN)?;
	let auth = decode_swap_params(&mut reader)?;
	expect_length(&mut reader, "callback context", CALLBACK_CONTEXT_LEN)?;
	let ctx = decode_callback_context(&mut reader)?;

	auth.validate()?;
	ctx.validate()?;
	Ok((auth, ctx))
}

fn expect_length(
	reader: &mut WordReader<'_>,
	what: &'static str,
	expected: usize,
) -> Result<(), CodecError> {
	let actual = reader.read_u256(what)?;
	if actual != U256::from(expected) {
		return Err(CodecError::Length {
			what,
			expected,
			actual: usize::try_from(actual).unwrap_or(usize::MAX),
		});
	}
	Ok(())
}
