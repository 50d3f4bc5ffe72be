use crate::{Context, CreateScheme};
use alloc::vec::Vec;
use annvm_core::{ExitError, ExitReason, Memory, Opcode, Operation, Stack};
use primitive_types::{H160, H256, U256};

/// EVM context handler. Supplies host state to system opcodes and runs
/// nested frames.
///
/// Sub-calls are synchronous: `create` and `call` return only after the
/// child frame has finished.
pub trait Handler {
	/// Get code size of address.
	fn code_size(&self, address: H160) -> U256;
	/// Get code hash of address.
	fn code_hash(&self, address: H160) -> H256;
	/// Get code of address.
	fn code(&self, address: H160) -> Vec<u8>;
	/// Get storage value of address at index.
	fn storage(&self, address: H160, index: H256) -> H256;
	/// Get the gas left value.
	fn gas_left(&self) -> U256;

	/// Set storage value of address at index.
	fn set_storage(&mut self, address: H160, index: H256, value: H256) -> Result<(), ExitError>;
	/// Create a log owned by address with given topics and data.
	fn log(&mut self, address: H160, topics: Vec<H256>, data: Vec<u8>) -> Result<(), ExitError>;

	/// Invoke a create operation. Returns the exit reason, the created
	/// address on success and the frame's return data.
	fn create(
		&mut self,
		caller: H160,
		scheme: CreateScheme,
		value: U256,
		init_code: Vec<u8>,
		target_gas: Option<u64>,
	) -> (ExitReason, Option<H160>, Vec<u8>);

	/// Invoke a call operation against the code stored at `code_address`.
	fn call(
		&mut self,
		code_address: H160,
		input: Vec<u8>,
		target_gas: Option<u64>,
		is_static: bool,
		context: Context,
	) -> (ExitReason, Vec<u8>);

	/// Pre-validation step for the runtime, after the descriptor's stack
	/// checks. Charges gas for the opcode.
	fn pre_validate(
		&mut self,
		context: &Context,
		opcode: Opcode,
		operation: &Operation,
		stack: &Stack,
	) -> Result<(), ExitError>;

	/// Post-validation step, after the opcode ran. Charges memory expansion.
	fn post_validate(&mut self, _memory: &Memory) -> Result<(), ExitError> {
		Ok(())
	}
}
