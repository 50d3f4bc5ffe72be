use crate::ParamType;
use primitive_types::{H160, U256};
use serde_json::{json, Value};

/// A typed value, ready to be encoded or freshly decoded.
///
/// Signed integers are held in two's complement.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Token {
	Address(H160),
	Uint(U256),
	Int(U256),
	Bool(bool),
	FixedBytes(Vec<u8>),
	Bytes(Vec<u8>),
	String(String),
	Array(Vec<Token>),
	FixedArray(Vec<Token>),
}

impl Token {
	/// Whether the token is encoded in the tail region.
	pub fn is_dynamic(&self) -> bool {
		match self {
			Token::Bytes(_) | Token::String(_) | Token::Array(_) => true,
			Token::FixedArray(tokens) => tokens.iter().any(Token::is_dynamic),
			_ => false,
		}
	}

	/// Render the token as JSON, given its declared type.
	///
	/// Integers up to 64 bits become JSON numbers, wider ones decimal strings.
	/// Addresses and byte strings are `0x`-prefixed hex.
	pub fn to_json(&self, kind: &ParamType) -> Value {
		match (self, kind) {
			(Token::Address(address), _) => json!(format!("0x{}", hex::encode(address))),
			(Token::Uint(value), ParamType::Uint(bits)) if *bits <= 64 => json!(value.low_u64()),
			(Token::Uint(value), _) => json!(value.to_string()),
			(Token::Int(value), ParamType::Int(bits)) if *bits <= 64 => json!(value.low_u64() as i64),
			(Token::Int(value), _) => json!(signed_to_string(*value)),
			(Token::Bool(value), _) => json!(value),
			(Token::FixedBytes(bytes), _) | (Token::Bytes(bytes), _) => {
				json!(format!("0x{}", hex::encode(bytes)))
			}
			(Token::String(value), _) => json!(value),
			(Token::Array(tokens), ParamType::Array(inner))
			| (Token::FixedArray(tokens), ParamType::FixedArray(inner, _)) => {
				Value::Array(tokens.iter().map(|t| t.to_json(inner)).collect())
			}
			(Token::Array(tokens), _) | (Token::FixedArray(tokens), _) => Value::Array(
				tokens
					.iter()
					.map(|t| t.to_json(&ParamType::Uint(256)))
					.collect(),
			),
		}
	}
}

fn signed_to_string(value: U256) -> String {
	if value.bit(255) {
		let magnitude = (!value).overflowing_add(U256::one()).0;
		format!("-{}", magnitude)
	} else {
		value.to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn integers_render_by_width() {
		let small = Token::Uint(U256::from(100));
		assert_eq!(small.to_json(&ParamType::Uint(64)), json!(100));
		assert_eq!(small.to_json(&ParamType::Uint(256)), json!("100"));

		let minus_one = Token::Int(U256::MAX);
		assert_eq!(minus_one.to_json(&ParamType::Int(8)), json!(-1));
		assert_eq!(minus_one.to_json(&ParamType::Int(256)), json!("-1"));
	}

	#[test]
	fn bytes_and_addresses_are_hex() {
		let address = Token::Address(H160::repeat_byte(0xab));
		assert_eq!(
			address.to_json(&ParamType::Address),
			json!("0xabababababababababababababababababababab")
		);
		let bytes = Token::Bytes(vec![1, 2]);
		assert_eq!(bytes.to_json(&ParamType::Bytes), json!("0x0102"));
	}
}
