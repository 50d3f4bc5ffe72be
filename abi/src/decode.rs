//! Bounds-checked decoding of head/tail encoded data.

use crate::error::{Error, Result};
use crate::{ParamType, Token};
use primitive_types::{H160, U256};

fn malformed(what: &str, at: usize) -> Error {
	Error::MalformedReturnData(format!("{} at byte {}", what, at))
}

fn read_word(data: &[u8], at: usize) -> Result<&[u8]> {
	let end = at
		.checked_add(32)
		.ok_or_else(|| malformed("word out of range", at))?;
	data.get(at..end)
		.ok_or_else(|| malformed("word out of range", at))
}

/// Read a word that must be an offset or length within `data`.
fn read_usize(data: &[u8], at: usize) -> Result<usize> {
	let value = U256::from_big_endian(read_word(data, at)?);
	if value > U256::from(data.len()) {
		return Err(malformed("offset or length exceeds data", at));
	}
	Ok(value.as_usize())
}

fn read_bytes(data: &[u8], at: usize) -> Result<Vec<u8>> {
	let len = read_usize(data, at)?;
	let start = at + 32;
	start
		.checked_add(len)
		.and_then(|end| data.get(start..end))
		.map(|bytes| bytes.to_vec())
		.ok_or_else(|| malformed("byte string out of range", at))
}

/// Read an integer word, rejecting values that do not fit `bits`. Signed
/// values must be sign-extended.
fn read_int(data: &[u8], at: usize, bits: usize, signed: bool) -> Result<U256> {
	let value = U256::from_big_endian(read_word(data, at)?);
	if bits >= 256 {
		return Ok(value);
	}

	let fits = if signed {
		let high = value >> (bits - 1);
		high.is_zero() || high == U256::MAX >> (bits - 1)
	} else {
		(value >> bits).is_zero()
	};
	if !fits {
		return Err(malformed("integer out of range", at));
	}
	Ok(value)
}

fn decode_static(kind: &ParamType, data: &[u8], at: usize) -> Result<Token> {
	match kind {
		ParamType::FixedArray(inner, len) => {
			let size = inner.head_size();
			let fits = size
				.checked_mul(*len)
				.and_then(|total| at.checked_add(total))
				.map(|end| end <= data.len())
				.unwrap_or(false);
			if !fits {
				return Err(malformed("fixed array exceeds data", at));
			}

			let mut tokens = Vec::with_capacity(*len);
			for i in 0..*len {
				tokens.push(decode_static(inner, data, at + i * size)?);
			}
			Ok(Token::FixedArray(tokens))
		}
		ParamType::Address => Ok(Token::Address(H160::from_slice(&read_word(data, at)?[12..]))),
		ParamType::Uint(bits) => Ok(Token::Uint(read_int(data, at, *bits, false)?)),
		ParamType::Int(bits) => Ok(Token::Int(read_int(data, at, *bits, true)?)),
		ParamType::Bool => {
			let value = U256::from_big_endian(read_word(data, at)?);
			if value > U256::one() {
				return Err(malformed("invalid bool", at));
			}
			Ok(Token::Bool(value == U256::one()))
		}
		ParamType::FixedBytes(len) => Ok(Token::FixedBytes(read_word(data, at)?[..*len].to_vec())),
		ParamType::Bytes | ParamType::String | ParamType::Array(_) => {
			Err(malformed("dynamic type in static position", at))
		}
	}
}

/// Decode a dynamic value whose payload starts at `at`.
fn decode_dynamic(kind: &ParamType, data: &[u8], at: usize) -> Result<Token> {
	match kind {
		ParamType::Bytes => Ok(Token::Bytes(read_bytes(data, at)?)),
		ParamType::String => {
			let bytes = read_bytes(data, at)?;
			String::from_utf8(bytes)
				.map(Token::String)
				.map_err(|_| malformed("invalid utf-8 string", at))
		}
		ParamType::Array(inner) => {
			let len = read_usize(data, at)?;
			let body = data
				.get(at + 32..)
				.ok_or_else(|| malformed("array out of range", at))?;
			// Every element takes at least one head word.
			if len > body.len() / 32 {
				return Err(malformed("array length exceeds data", at));
			}
			let kinds = vec![(**inner).clone(); len];
			Ok(Token::Array(decode_sequence(&kinds, body)?))
		}
		ParamType::FixedArray(inner, len) => {
			let body = data
				.get(at..)
				.ok_or_else(|| malformed("array out of range", at))?;
			if *len > body.len() / 32 {
				return Err(malformed("array length exceeds data", at));
			}
			let kinds = vec![(**inner).clone(); *len];
			Ok(Token::FixedArray(decode_sequence(&kinds, body)?))
		}
		_ => decode_static(kind, data, at),
	}
}

fn decode_sequence(kinds: &[ParamType], data: &[u8]) -> Result<Vec<Token>> {
	let mut tokens = Vec::with_capacity(kinds.len());
	let mut head = 0;

	for kind in kinds {
		if kind.is_dynamic() {
			let offset = read_usize(data, head)?;
			tokens.push(decode_dynamic(kind, data, offset)?);
		} else {
			tokens.push(decode_static(kind, data, head)?);
		}
		head = head.saturating_add(kind.head_size());
	}

	Ok(tokens)
}

/// Decode `data` as a sequence of values of the given types.
pub fn decode(kinds: &[ParamType], data: &[u8]) -> Result<Vec<Token>> {
	decode_sequence(kinds, data)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::encode::encode;

	#[test]
	fn decodes_bool() {
		let mut data = [0u8; 32];
		data[31] = 1;
		assert_eq!(decode(&[ParamType::Bool], &data).unwrap(), vec![Token::Bool(true)]);
		data[31] = 2;
		assert!(decode(&[ParamType::Bool], &data).is_err());
	}

	#[test]
	fn short_data_is_malformed() {
		let err = decode(&[ParamType::Uint(256)], &[0u8; 31]).unwrap_err();
		assert!(matches!(err, Error::MalformedReturnData(_)));
	}

	#[test]
	fn offsets_past_the_end_are_malformed() {
		let mut data = vec![0u8; 64];
		data[31] = 0xff;
		assert!(decode(&[ParamType::Bytes], &data).is_err());

		// Claims a huge array backed by a single word.
		let mut data = vec![0u8; 96];
		data[31] = 0x20;
		data[63] = 0x40;
		assert!(decode(&[ParamType::Array(Box::new(ParamType::Uint(8)))], &data).is_err());
	}

	#[test]
	fn oversized_fixed_arrays_are_malformed() {
		let kind: ParamType = "uint8[1000000000000000]".parse().unwrap();
		assert!(matches!(
			decode(&[kind], &[0u8; 32]).unwrap_err(),
			Error::MalformedReturnData(_)
		));

		let kind: ParamType = "string[1000000000000000]".parse().unwrap();
		assert!(matches!(
			decode(&[kind], &[0u8; 64]).unwrap_err(),
			Error::MalformedReturnData(_)
		));

		let kind: ParamType = "uint8[2]".parse().unwrap();
		assert!(decode(&[kind], &[0u8; 63]).is_err());
	}

	#[test]
	fn integers_must_fit_their_width() {
		let mut word = [0u8; 32];
		word[23] = 1;
		word[31] = 5;
		assert!(matches!(
			decode(&[ParamType::Uint(8)], &word).unwrap_err(),
			Error::MalformedReturnData(_)
		));
		assert_eq!(
			decode(&[ParamType::Uint(72)], &word).unwrap(),
			vec![Token::Uint((U256::one() << 64) + U256::from(5))]
		);

		let mut word = [0u8; 32];
		word[31] = 0xff;
		assert_eq!(
			decode(&[ParamType::Uint(8)], &word).unwrap(),
			vec![Token::Uint(U256::from(255))]
		);
		// 255 is not a sign-extended int8.
		assert!(decode(&[ParamType::Int(8)], &word).is_err());

		let minus_one = [0xffu8; 32];
		assert_eq!(
			decode(&[ParamType::Int(8)], &minus_one).unwrap(),
			vec![Token::Int(U256::MAX)]
		);
		assert!(decode(&[ParamType::Uint(8)], &minus_one).is_err());
	}

	#[test]
	fn dynamic_values_round_trip() {
		let kinds: Vec<ParamType> = ["string", "uint8[]", "bytes", "string[2]", "address[2]"]
			.iter()
			.map(|k| k.parse().unwrap())
			.collect();
		let tokens = vec![
			Token::String("hello".into()),
			Token::Array(vec![Token::Uint(U256::from(1)), Token::Uint(U256::from(2))]),
			Token::Bytes(vec![0xde; 40]),
			Token::FixedArray(vec![Token::String("a".into()), Token::String("".into())]),
			Token::FixedArray(vec![
				Token::Address(H160::repeat_byte(1)),
				Token::Address(H160::repeat_byte(2)),
			]),
		];
		assert_eq!(decode(&kinds, &encode(&tokens)).unwrap(), tokens);
	}
}
