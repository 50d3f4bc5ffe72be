//! Head/tail encoding of token sequences.

use crate::Token;
use primitive_types::U256;

fn word(value: U256) -> [u8; 32] {
	let mut out = [0u8; 32];
	value.to_big_endian(&mut out);
	out
}

fn pad_right(out: &mut Vec<u8>, bytes: &[u8]) {
	out.extend_from_slice(bytes);
	let rem = bytes.len() % 32;
	if rem != 0 {
		out.resize(out.len() + 32 - rem, 0);
	}
}

fn head_size(token: &Token) -> usize {
	match token {
		Token::FixedArray(tokens) if !token.is_dynamic() => tokens.iter().map(head_size).sum(),
		_ => 32,
	}
}

/// Encode a token in place, without offset indirection. Static tokens
/// produce their head; dynamic tokens produce their tail payload.
fn encode_token(out: &mut Vec<u8>, token: &Token) {
	match token {
		Token::Address(address) => {
			out.extend_from_slice(&[0u8; 12]);
			out.extend_from_slice(address.as_bytes());
		}
		Token::Uint(value) | Token::Int(value) => out.extend_from_slice(&word(*value)),
		Token::Bool(value) => out.extend_from_slice(&word(U256::from(*value as u8))),
		Token::FixedBytes(bytes) => pad_right(out, bytes),
		Token::Bytes(bytes) => {
			out.extend_from_slice(&word(U256::from(bytes.len())));
			pad_right(out, bytes);
		}
		Token::String(value) => {
			out.extend_from_slice(&word(U256::from(value.len())));
			pad_right(out, value.as_bytes());
		}
		Token::Array(tokens) => {
			out.extend_from_slice(&word(U256::from(tokens.len())));
			out.extend_from_slice(&encode(tokens));
		}
		Token::FixedArray(tokens) => {
			if token.is_dynamic() {
				out.extend_from_slice(&encode(tokens));
			} else {
				for token in tokens {
					encode_token(out, token);
				}
			}
		}
	}
}

/// Encode a sequence of tokens: heads in order, then the tail region. The
/// head slot of a dynamic token holds the byte offset of its payload,
/// measured from the start of the sequence.
pub fn encode(tokens: &[Token]) -> Vec<u8> {
	let heads_len: usize = tokens.iter().map(head_size).sum();
	let mut head = Vec::with_capacity(heads_len);
	let mut tail = Vec::new();

	for token in tokens {
		if token.is_dynamic() {
			head.extend_from_slice(&word(U256::from(heads_len + tail.len())));
			encode_token(&mut tail, token);
		} else {
			encode_token(&mut head, token);
		}
	}

	head.extend_from_slice(&tail);
	head
}

#[cfg(test)]
mod tests {
	use super::*;
	use primitive_types::H160;

	#[test]
	fn static_tokens_are_words() {
		let encoded = encode(&[
			Token::Address(H160::repeat_byte(0x11)),
			Token::Uint(U256::from(100)),
			Token::Bool(true),
		]);
		assert_eq!(
			hex::encode(encoded),
			concat!(
				"0000000000000000000000001111111111111111111111111111111111111111",
				"0000000000000000000000000000000000000000000000000000000000000064",
				"0000000000000000000000000000000000000000000000000000000000000001",
			)
		);
	}

	#[test]
	fn dynamic_tokens_use_offsets() {
		let encoded = encode(&[
			Token::Uint(U256::from(1)),
			Token::String("abc".into()),
			Token::Array(vec![Token::Uint(U256::from(7))]),
		]);
		assert_eq!(
			hex::encode(encoded),
			concat!(
				"0000000000000000000000000000000000000000000000000000000000000001",
				"0000000000000000000000000000000000000000000000000000000000000060",
				"00000000000000000000000000000000000000000000000000000000000000a0",
				"0000000000000000000000000000000000000000000000000000000000000003",
				"6162630000000000000000000000000000000000000000000000000000000000",
				"0000000000000000000000000000000000000000000000000000000000000001",
				"0000000000000000000000000000000000000000000000000000000000000007",
			)
		);
	}

	#[test]
	fn static_fixed_arrays_are_inline() {
		let encoded = encode(&[
			Token::FixedArray(vec![Token::Uint(U256::from(1)), Token::Uint(U256::from(2))]),
			Token::Bytes(vec![]),
		]);
		assert_eq!(encoded.len(), 32 * 4);
		assert_eq!(encoded[95], 0x60);
		assert!(encoded[96..].iter().all(|b| *b == 0));
	}
}
