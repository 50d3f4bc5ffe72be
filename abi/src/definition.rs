//! JSON ABI documents and the methods they declare.

use crate::coerce::coerce;
use crate::decode::decode;
use crate::encode::encode;
use crate::error::{Error, Result};
use crate::{ParamType, Token};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha3::{Digest, Keccak256};
use std::collections::BTreeMap;

/// Selector of the standard `Error(string)` revert payload.
pub const REVERT_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// One entry of a JSON ABI document, as emitted by contract compilers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AbiJsonArg {
	#[serde(default)]
	pub name: String,
	#[serde(rename = "type")]
	pub ty: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AbiJsonEntry {
	#[serde(rename = "type", default = "default_entry_type")]
	pub ty: String,
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub inputs: Vec<AbiJsonArg>,
	#[serde(default)]
	pub outputs: Vec<AbiJsonArg>,
	#[serde(rename = "stateMutability", skip_serializing_if = "Option::is_none")]
	pub state_mutability: Option<String>,
}

fn default_entry_type() -> String {
	"function".to_string()
}

/// A named, typed parameter.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Param {
	pub name: String,
	pub kind: ParamType,
}

impl Param {
	fn from_json(arg: &AbiJsonArg) -> Result<Self> {
		Ok(Self {
			name: arg.name.clone(),
			kind: arg.ty.parse()?,
		})
	}
}

fn coerce_args(params: &[Param], args: &[Value]) -> Result<Vec<Token>> {
	if params.len() != args.len() {
		return Err(Error::ArityMismatch {
			expected: params.len(),
			got: args.len(),
		});
	}

	params
		.iter()
		.zip(args)
		.map(|(param, arg)| coerce(&param.kind, arg))
		.collect()
}

/// A callable method.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Function {
	pub name: String,
	pub inputs: Vec<Param>,
	pub outputs: Vec<Param>,
}

impl Function {
	/// Canonical signature, `name(type1,type2,...)`.
	pub fn signature(&self) -> String {
		let types: Vec<String> = self.inputs.iter().map(|p| p.kind.to_string()).collect();
		format!("{}({})", self.name, types.join(","))
	}

	/// First four bytes of the Keccak-256 of the canonical signature.
	pub fn selector(&self) -> [u8; 4] {
		selector(&self.signature())
	}

	/// Selector followed by the packed arguments.
	pub fn encode_input(&self, args: &[Value]) -> Result<Vec<u8>> {
		let tokens = coerce_args(&self.inputs, args)?;
		let mut data = self.selector().to_vec();
		data.extend_from_slice(&encode(&tokens));
		Ok(data)
	}

	pub fn decode_output(&self, data: &[u8]) -> Result<Vec<Token>> {
		let kinds: Vec<ParamType> = self.outputs.iter().map(|p| p.kind.clone()).collect();
		decode(&kinds, data)
	}

	/// Decode return data into a JSON object keyed by output name, or by
	/// position for unnamed outputs.
	pub fn decode_output_json(&self, data: &[u8]) -> Result<Value> {
		let tokens = self.decode_output(data)?;
		let mut map = Map::new();
		for (i, (param, token)) in self.outputs.iter().zip(tokens).enumerate() {
			let key = if param.name.is_empty() {
				i.to_string()
			} else {
				param.name.clone()
			};
			map.insert(key, token.to_json(&param.kind));
		}
		Ok(Value::Object(map))
	}
}

/// The deployment entry. Its packed arguments are appended to the creation
/// code without a selector.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Constructor {
	pub inputs: Vec<Param>,
}

impl Constructor {
	pub fn encode_input(&self, args: &[Value]) -> Result<Vec<u8>> {
		Ok(encode(&coerce_args(&self.inputs, args)?))
	}
}

/// Selector of an arbitrary signature string.
pub fn selector(signature: &str) -> [u8; 4] {
	let digest = Keccak256::digest(signature.as_bytes());
	let mut out = [0u8; 4];
	out.copy_from_slice(&digest[..4]);
	out
}

/// A parsed ABI definition: methods by name and the constructor.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Abi {
	pub constructor: Option<Constructor>,
	pub functions: BTreeMap<String, Function>,
}

impl Abi {
	/// Parse a JSON ABI document. Events and fallback entries are ignored; an
	/// overloaded name keeps its last declaration.
	pub fn load(json: &str) -> Result<Self> {
		let entries: Vec<AbiJsonEntry> =
			serde_json::from_str(json).map_err(|e| Error::InvalidDefinition(e.to_string()))?;
		Self::from_entries(&entries)
	}

	pub fn from_entries(entries: &[AbiJsonEntry]) -> Result<Self> {
		let mut abi = Abi::default();

		for entry in entries {
			match entry.ty.as_str() {
				"function" => {
					if entry.name.is_empty() {
						return Err(Error::InvalidDefinition("function without a name".into()));
					}
					let function = Function {
						name: entry.name.clone(),
						inputs: entry
							.inputs
							.iter()
							.map(Param::from_json)
							.collect::<Result<_>>()?,
						outputs: entry
							.outputs
							.iter()
							.map(Param::from_json)
							.collect::<Result<_>>()?,
					};
					abi.functions.insert(function.name.clone(), function);
				}
				"constructor" => {
					abi.constructor = Some(Constructor {
						inputs: entry
							.inputs
							.iter()
							.map(Param::from_json)
							.collect::<Result<_>>()?,
					});
				}
				_ => (),
			}
		}

		Ok(abi)
	}

	pub fn function(&self, name: &str) -> Result<&Function> {
		self.functions
			.get(name)
			.ok_or_else(|| Error::UnknownMethod(name.to_string()))
	}

	/// Pack a method call: selector followed by the encoded arguments.
	pub fn pack(&self, method: &str, args: &[Value]) -> Result<Vec<u8>> {
		self.function(method)?.encode_input(args)
	}

	/// Pack constructor arguments. A definition without a constructor takes
	/// no arguments.
	pub fn pack_constructor(&self, args: &[Value]) -> Result<Vec<u8>> {
		match &self.constructor {
			Some(constructor) => constructor.encode_input(args),
			None if args.is_empty() => Ok(Vec::new()),
			None => Err(Error::ArityMismatch {
				expected: 0,
				got: args.len(),
			}),
		}
	}

	/// Decode the return data of `method` into a JSON object.
	pub fn unpack(&self, method: &str, data: &[u8]) -> Result<Value> {
		self.function(method)?.decode_output_json(data)
	}
}

/// Decode an `Error(string)` revert payload, if `data` is one.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
	if data.len() < 4 || data[..4] != REVERT_SELECTOR {
		return None;
	}

	match decode(&[ParamType::String], &data[4..]).ok()?.pop()? {
		Token::String(reason) => Some(reason),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	const TOKEN_ABI: &str = r#"[
		{"type":"constructor","inputs":[{"name":"supply","type":"uint256"}]},
		{"type":"function","name":"transfer","inputs":[{"name":"to","type":"address"},{"name":"value","type":"uint256"}],"outputs":[{"name":"","type":"bool"}]},
		{"type":"function","name":"balanceOf","constant":true,"inputs":[{"name":"owner","type":"address"}],"outputs":[{"name":"balance","type":"uint256"}]},
		{"type":"event","name":"Transfer","inputs":[{"name":"from","type":"address","indexed":true}]}
	]"#;

	#[test]
	fn transfer_selector() {
		assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
		assert_eq!(selector("Error(string)"), REVERT_SELECTOR);
	}

	#[test]
	fn loads_functions_and_constructor() {
		let abi = Abi::load(TOKEN_ABI).unwrap();
		assert_eq!(abi.functions.len(), 2);
		assert_eq!(abi.constructor.as_ref().unwrap().inputs.len(), 1);
		assert_eq!(
			abi.function("balanceOf").unwrap().signature(),
			"balanceOf(address)"
		);
		assert!(matches!(Abi::load("{"), Err(Error::InvalidDefinition(_))));
	}

	#[test]
	fn pack_transfer() {
		let abi = Abi::load(TOKEN_ABI).unwrap();
		let data = abi
			.pack(
				"transfer",
				&[json!("0x1111111111111111111111111111111111111111"), json!(100)],
			)
			.unwrap();
		assert_eq!(data.len(), 4 + 64);
		assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
		assert_eq!(data[4 + 63], 100);
	}

	#[test]
	fn pack_errors() {
		let abi = Abi::load(TOKEN_ABI).unwrap();
		assert_eq!(
			abi.pack("mint", &[]),
			Err(Error::UnknownMethod("mint".into()))
		);
		assert_eq!(
			abi.pack("transfer", &[json!(1)]),
			Err(Error::ArityMismatch {
				expected: 2,
				got: 1
			})
		);
		assert!(matches!(
			abi.pack("transfer", &[json!(true), json!(1)]),
			Err(Error::TypeCoercion { .. })
		));
	}

	#[test]
	fn unpack_keys_by_name_or_position() {
		let abi = Abi::load(TOKEN_ABI).unwrap();
		let mut data = vec![0u8; 32];
		data[31] = 1;
		assert_eq!(abi.unpack("transfer", &data).unwrap(), json!({"0": true}));
		assert_eq!(
			abi.unpack("balanceOf", &data).unwrap(),
			json!({"balance": "1"})
		);
	}

	#[test]
	fn constructor_args_have_no_selector() {
		let abi = Abi::load(TOKEN_ABI).unwrap();
		let data = abi.pack_constructor(&[json!(7)]).unwrap();
		assert_eq!(data.len(), 32);
		assert_eq!(data[31], 7);

		let bare = Abi::default();
		assert_eq!(bare.pack_constructor(&[]), Ok(Vec::new()));
		assert!(bare.pack_constructor(&[json!(1)]).is_err());
	}

	#[test]
	fn revert_reason() {
		let mut data = REVERT_SELECTOR.to_vec();
		data.extend_from_slice(&encode(&[Token::String("not enough".into())]));
		assert_eq!(decode_revert_reason(&data), Some("not enough".to_string()));
		assert_eq!(decode_revert_reason(&[0u8; 36]), None);
	}
}
