//! Conversion of dynamically typed JSON literals into [`Token`]s.
//!
//! Every [`Error::TypeCoercion`] of the codec is raised here.

use crate::error::{Error, Result};
use crate::{ParamType, Token};
use primitive_types::{H160, U256};
use serde_json::Value;

fn mismatch(kind: &ParamType, value: &Value) -> Error {
	Error::TypeCoercion {
		expected: kind.to_string(),
		found: value.to_string(),
	}
}

fn strip_hex_prefix(s: &str) -> &str {
	s.strip_prefix("0x")
		.or_else(|| s.strip_prefix("0X"))
		.unwrap_or(s)
}

fn decode_hex(kind: &ParamType, value: &Value, s: &str) -> Result<Vec<u8>> {
	hex::decode(strip_hex_prefix(s)).map_err(|_| mismatch(kind, value))
}

/// Parse an unsigned magnitude from a JSON number or a decimal or `0x` hex
/// string. Returns the magnitude and whether it was negative.
fn parse_integer(kind: &ParamType, value: &Value) -> Result<(U256, bool)> {
	match value {
		Value::Number(n) => {
			if let Some(v) = n.as_u64() {
				Ok((U256::from(v), false))
			} else if let Some(v) = n.as_i64() {
				Ok((U256::from(v.unsigned_abs()), true))
			} else {
				Err(mismatch(kind, value))
			}
		}
		Value::String(s) => {
			let s = s.trim();
			let (negative, digits) = match s.strip_prefix('-') {
				Some(rest) => (true, rest),
				None => (false, s),
			};
			let magnitude = if digits.starts_with("0x") || digits.starts_with("0X") {
				U256::from_str_radix(strip_hex_prefix(digits), 16)
					.map_err(|_| mismatch(kind, value))?
			} else {
				U256::from_dec_str(digits).map_err(|_| mismatch(kind, value))?
			};
			Ok((magnitude, negative && !magnitude.is_zero()))
		}
		_ => Err(mismatch(kind, value)),
	}
}

/// Coerce a JSON literal into a token of the declared type.
pub fn coerce(kind: &ParamType, value: &Value) -> Result<Token> {
	match kind {
		ParamType::Address => match value {
			Value::String(s) => {
				let bytes = decode_hex(kind, value, s.trim())?;
				if bytes.len() != 20 {
					return Err(mismatch(kind, value));
				}
				Ok(Token::Address(H160::from_slice(&bytes)))
			}
			_ => Err(mismatch(kind, value)),
		},
		ParamType::Uint(bits) => {
			let (magnitude, negative) = parse_integer(kind, value)?;
			if negative || (*bits < 256 && magnitude >= U256::one() << *bits) {
				return Err(mismatch(kind, value));
			}
			Ok(Token::Uint(magnitude))
		}
		ParamType::Int(bits) => {
			let (magnitude, negative) = parse_integer(kind, value)?;
			let bound = U256::one() << (*bits - 1);
			if negative {
				if magnitude > bound {
					return Err(mismatch(kind, value));
				}
				Ok(Token::Int((!magnitude).overflowing_add(U256::one()).0))
			} else {
				if magnitude >= bound {
					return Err(mismatch(kind, value));
				}
				Ok(Token::Int(magnitude))
			}
		}
		ParamType::Bool => match value {
			Value::Bool(b) => Ok(Token::Bool(*b)),
			Value::String(s) if s == "true" => Ok(Token::Bool(true)),
			Value::String(s) if s == "false" => Ok(Token::Bool(false)),
			_ => Err(mismatch(kind, value)),
		},
		ParamType::String => match value {
			Value::String(s) => Ok(Token::String(s.clone())),
			_ => Err(mismatch(kind, value)),
		},
		ParamType::Bytes => match value {
			Value::String(s) => Ok(Token::Bytes(decode_hex(kind, value, s)?)),
			_ => Err(mismatch(kind, value)),
		},
		ParamType::FixedBytes(len) => match value {
			Value::String(s) => {
				let mut bytes = decode_hex(kind, value, s)?;
				if bytes.len() > *len {
					return Err(mismatch(kind, value));
				}
				bytes.resize(*len, 0);
				Ok(Token::FixedBytes(bytes))
			}
			_ => Err(mismatch(kind, value)),
		},
		ParamType::Array(inner) => match value {
			Value::Array(items) => Ok(Token::Array(
				items
					.iter()
					.map(|item| coerce(inner, item))
					.collect::<Result<_>>()?,
			)),
			_ => Err(mismatch(kind, value)),
		},
		ParamType::FixedArray(inner, len) => match value {
			Value::Array(items) if items.len() == *len => Ok(Token::FixedArray(
				items
					.iter()
					.map(|item| coerce(inner, item))
					.collect::<Result<_>>()?,
			)),
			_ => Err(mismatch(kind, value)),
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn addresses_with_or_without_prefix() {
		let expected = Token::Address(H160::repeat_byte(0x11));
		let plain = json!("1111111111111111111111111111111111111111");
		let prefixed = json!("0x1111111111111111111111111111111111111111");
		assert_eq!(coerce(&ParamType::Address, &plain).unwrap(), expected);
		assert_eq!(coerce(&ParamType::Address, &prefixed).unwrap(), expected);
		assert!(coerce(&ParamType::Address, &json!("0x11")).is_err());
		assert!(coerce(&ParamType::Address, &json!(17)).is_err());
	}

	#[test]
	fn unsigned_ranges() {
		assert_eq!(
			coerce(&ParamType::Uint(8), &json!(255)).unwrap(),
			Token::Uint(U256::from(255))
		);
		assert!(coerce(&ParamType::Uint(8), &json!(256)).is_err());
		assert!(coerce(&ParamType::Uint(256), &json!(-1)).is_err());
		assert_eq!(
			coerce(&ParamType::Uint(256), &json!("0xff")).unwrap(),
			Token::Uint(U256::from(255))
		);
		assert_eq!(
			coerce(
				&ParamType::Uint(256),
				&json!("115792089237316195423570985008687907853269984665640564039457584007913129639935")
			)
			.unwrap(),
			Token::Uint(U256::MAX)
		);
	}

	#[test]
	fn signed_ranges() {
		assert_eq!(
			coerce(&ParamType::Int(8), &json!(-128)).unwrap(),
			Token::Int(U256::MAX - U256::from(127))
		);
		assert!(coerce(&ParamType::Int(8), &json!(-129)).is_err());
		assert!(coerce(&ParamType::Int(8), &json!(128)).is_err());
		assert_eq!(
			coerce(&ParamType::Int(256), &json!("-1")).unwrap(),
			Token::Int(U256::MAX)
		);
	}

	#[test]
	fn fixed_bytes_are_right_padded() {
		assert_eq!(
			coerce(&ParamType::FixedBytes(4), &json!("0xabcd")).unwrap(),
			Token::FixedBytes(vec![0xab, 0xcd, 0, 0])
		);
		assert!(coerce(&ParamType::FixedBytes(1), &json!("abcd")).is_err());
	}

	#[test]
	fn arrays_coerce_elementwise() {
		let kind: ParamType = "bool[2]".parse().unwrap();
		assert_eq!(
			coerce(&kind, &json!([true, "false"])).unwrap(),
			Token::FixedArray(vec![Token::Bool(true), Token::Bool(false)])
		);
		assert!(coerce(&kind, &json!([true])).is_err());

		let kind: ParamType = "uint8[]".parse().unwrap();
		let err = coerce(&kind, &json!([1, "x"])).unwrap_err();
		assert!(matches!(err, Error::TypeCoercion { .. }));
	}
}
