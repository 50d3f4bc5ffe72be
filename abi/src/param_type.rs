use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Declared type of a parameter.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum ParamType {
	Address,
	/// `uintN`, N bits.
	Uint(usize),
	/// `intN`, N bits.
	Int(usize),
	Bool,
	/// `bytesN`, N bytes.
	FixedBytes(usize),
	Bytes,
	String,
	/// `T[]`
	Array(Box<ParamType>),
	/// `T[k]`
	FixedArray(Box<ParamType>, usize),
}

impl ParamType {
	/// Whether values of this type live in the tail region of an encoding.
	pub fn is_dynamic(&self) -> bool {
		match self {
			ParamType::Bytes | ParamType::String | ParamType::Array(_) => true,
			ParamType::FixedArray(inner, _) => inner.is_dynamic(),
			_ => false,
		}
	}

	/// Bytes this type occupies in the head region.
	pub fn head_size(&self) -> usize {
		match self {
			ParamType::FixedArray(inner, len) if !self.is_dynamic() => {
				inner.head_size().saturating_mul(*len)
			}
			_ => 32,
		}
	}
}

fn parse_width(name: &str, digits: &str, default: usize) -> Result<usize> {
	if digits.is_empty() {
		return Ok(default);
	}
	digits
		.parse::<usize>()
		.map_err(|_| Error::InvalidType(name.to_string()))
}

impl FromStr for ParamType {
	type Err = Error;

	fn from_str(name: &str) -> Result<Self> {
		let name = name.trim();

		if let Some(stripped) = name.strip_suffix(']') {
			let open = stripped
				.rfind('[')
				.ok_or_else(|| Error::InvalidType(name.to_string()))?;
			let inner = ParamType::from_str(&stripped[..open])?;
			let len = &stripped[open + 1..];
			if len.is_empty() {
				return Ok(ParamType::Array(Box::new(inner)));
			}
			let len = len
				.parse::<usize>()
				.map_err(|_| Error::InvalidType(name.to_string()))?;
			if len == 0 || inner.head_size().checked_mul(len).is_none() {
				return Err(Error::InvalidType(name.to_string()));
			}
			return Ok(ParamType::FixedArray(Box::new(inner), len));
		}

		let kind = match name {
			"address" => ParamType::Address,
			"bool" => ParamType::Bool,
			"string" => ParamType::String,
			"bytes" => ParamType::Bytes,
			"byte" => ParamType::FixedBytes(1),
			_ => {
				if let Some(bits) = name.strip_prefix("uint") {
					ParamType::Uint(parse_width(name, bits, 256)?)
				} else if let Some(bits) = name.strip_prefix("int") {
					ParamType::Int(parse_width(name, bits, 256)?)
				} else if let Some(len) = name.strip_prefix("bytes") {
					ParamType::FixedBytes(parse_width(name, len, 0)?)
				} else {
					return Err(Error::InvalidType(name.to_string()));
				}
			}
		};

		match kind {
			ParamType::Uint(bits) | ParamType::Int(bits)
				if bits == 0 || bits > 256 || bits % 8 != 0 =>
			{
				Err(Error::InvalidType(name.to_string()))
			}
			ParamType::FixedBytes(len) if len == 0 || len > 32 => {
				Err(Error::InvalidType(name.to_string()))
			}
			kind => Ok(kind),
		}
	}
}

/// Canonical name, as used in method signatures.
impl fmt::Display for ParamType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ParamType::Address => write!(f, "address"),
			ParamType::Uint(bits) => write!(f, "uint{}", bits),
			ParamType::Int(bits) => write!(f, "int{}", bits),
			ParamType::Bool => write!(f, "bool"),
			ParamType::FixedBytes(len) => write!(f, "bytes{}", len),
			ParamType::Bytes => write!(f, "bytes"),
			ParamType::String => write!(f, "string"),
			ParamType::Array(inner) => write!(f, "{}[]", inner),
			ParamType::FixedArray(inner, len) => write!(f, "{}[{}]", inner, len),
		}
	}
}
