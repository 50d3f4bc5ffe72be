//! Document-level helpers: deploy a contract from a call document and call
//! one of its methods, with JSON arguments and a JSON result.

use crate::abi::Abi;
use crate::address::parse_address;
use crate::backend::{ApplyBackend, Backend};
use crate::machine::{CallContext, CreateOutcome, Machine};
use crate::Error;
use log::debug;
use primitive_types::{H160, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A call document:
///
/// ```json
/// {
///   "address": "0x...",
///   "bytecode": "6080...",
///   "initParam": [100],
///   "method": "transfer",
///   "params": ["0x1111111111111111111111111111111111111111", 1]
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallDocument {
	/// Sender of the create and the call.
	#[serde(default)]
	pub address: String,
	/// Hex creation code, without constructor arguments.
	#[serde(default)]
	pub bytecode: String,
	/// Constructor arguments.
	#[serde(default)]
	pub init_param: Vec<Value>,
	#[serde(default)]
	pub method: String,
	#[serde(default)]
	pub params: Vec<Value>,
}

impl CallDocument {
	pub fn parse(json: &str) -> Result<Self, Error> {
		serde_json::from_str(json).map_err(|e| Error::InvalidDocument(e.to_string()))
	}

	pub fn sender(&self) -> Result<H160, Error> {
		parse_address(&self.address)
	}
}

/// Creation code followed by the packed constructor arguments.
pub fn create_contract_data(abi: &Abi, bytecode: &str, args: &[Value]) -> Result<Vec<u8>, Error> {
	let bytecode = bytecode.trim();
	let bytecode = bytecode.strip_prefix("0x").unwrap_or(bytecode);
	let mut data = hex::decode(bytecode).map_err(|e| Error::InvalidBytecode(e.to_string()))?;
	data.extend_from_slice(&abi.pack_constructor(args)?);
	Ok(data)
}

/// Selector followed by the packed method arguments.
pub fn call_contract_data(abi: &Abi, method: &str, args: &[Value]) -> Result<Vec<u8>, Error> {
	Ok(abi.pack(method, args)?)
}

/// Decode the output of `method` into a JSON object.
pub fn unpack_result(abi: &Abi, method: &str, output: &[u8]) -> Result<Value, Error> {
	Ok(abi.unpack(method, output)?)
}

/// Deploy the document's bytecode with its constructor arguments, and persist
/// the changes into `backend`.
pub fn create_contract<B>(
	machine: &Machine,
	backend: &mut B,
	abi: &Abi,
	document: &CallDocument,
	nonce: U256,
) -> Result<CreateOutcome, Error>
where
	B: Backend + ApplyBackend,
{
	if document.bytecode.trim().is_empty() {
		return Err(Error::InvalidBytecode("please give me the contract's bytecode".into()));
	}

	let sender = document.sender()?;
	let data = create_contract_data(abi, &document.bytecode, &document.init_param)?;
	let context = CallContext::new(sender, machine.config().gas_limit);

	let outcome = machine.create(&*backend, &context, nonce, data)?;
	backend.apply(outcome.changes.clone(), outcome.logs.clone());
	debug!("contract address: {:?}", outcome.address);
	Ok(outcome)
}

/// Deploy the document's contract, then call the document's method on it and
/// return the decoded result.
pub fn call_contract<B>(
	machine: &Machine,
	backend: &mut B,
	abi: &Abi,
	document: &CallDocument,
	nonce: U256,
) -> Result<Value, Error>
where
	B: Backend + ApplyBackend,
{
	let created = create_contract(machine, backend, abi, document, nonce)?;
	let input = call_contract_data(abi, &document.method, &document.params)?;
	let context = CallContext::new(document.sender()?, machine.config().gas_limit);

	let outcome = machine.call(&*backend, &context, created.address, input, created.code)?;
	backend.apply(outcome.changes, outcome.logs);
	unpack_result(abi, &document.method, &outcome.output)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn parses_call_document() {
		let document = CallDocument::parse(
			r#"{"address":"0x0102030405060708090a0b0c0d0e0f1011121314","bytecode":"00","initParam":[1],"method":"get","params":[]}"#,
		)
		.unwrap();
		assert_eq!(document.init_param, vec![json!(1)]);
		assert_eq!(document.method, "get");
		assert_eq!(
			document.sender().unwrap(),
			parse_address("0102030405060708090a0b0c0d0e0f1011121314").unwrap()
		);
		assert!(CallDocument::parse("[").is_err());
	}

	#[test]
	fn create_data_appends_constructor_args() {
		let abi = Abi::load(r#"[{"type":"constructor","inputs":[{"name":"x","type":"uint8"}]}]"#).unwrap();
		let data = create_contract_data(&abi, "0x6001", &[json!(5)]).unwrap();
		assert_eq!(data.len(), 2 + 32);
		assert_eq!(&data[..2], &[0x60, 0x01]);
		assert_eq!(data[33], 5);

		assert!(matches!(
			create_contract_data(&abi, "zz", &[json!(5)]),
			Err(Error::InvalidBytecode(_))
		));
		assert!(matches!(
			create_contract_data(&abi, "6001", &[]),
			Err(Error::Abi(crate::abi::Error::ArityMismatch { .. }))
		));
	}
}
