//! Runtime layer for annvm: system opcodes evaluated against a [`Handler`].

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod context;
mod eval;
mod handler;

pub use annvm_core::*;

pub use crate::context::{CallScheme, Context, CreateScheme};
pub use crate::handler::Handler;

use alloc::rc::Rc;
use alloc::vec::Vec;

/// Runtime configuration.
#[derive(Clone, Debug)]
pub struct Config {
	/// Gas budget of a top-level create or call.
	pub gas_limit: u64,
	/// Stack limit of every frame.
	pub stack_limit: usize,
	/// Memory limit of every frame, in bytes. Expanding past it fails with
	/// `InvalidRange` before anything is allocated.
	pub memory_limit: usize,
	/// Call stack limit.
	pub call_stack_limit: usize,
	/// Maximum size of deployed code, if any.
	pub create_contract_limit: Option<usize>,
}

impl Config {
	/// Limits of the AnnChain machine.
	pub const fn annchain() -> Config {
		Config {
			gas_limit: 100_000_000,
			stack_limit: 1024,
			memory_limit: 0x40_0000,
			call_stack_limit: 1024,
			create_contract_limit: Some(0x6000),
		}
	}
}

impl Default for Config {
	fn default() -> Self {
		Self::annchain()
	}
}

/// Bridges the core dispatch loop and a [`Handler`].
struct Hook<'a, H> {
	handler: &'a mut H,
	context: &'a Context,
	is_static: bool,
}

impl<'a, H: Handler> InterpreterHandler for Hook<'a, H> {
	fn before_bytecode(
		&mut self,
		opcode: Opcode,
		_pc: usize,
		machine: &Machine,
		operation: &Operation,
	) -> Result<(), ExitError> {
		if self.is_static && operation.is_writing() {
			return Err(ExitError::WriteProtection);
		}

		self.handler
			.pre_validate(self.context, opcode, operation, machine.stack())
	}

	fn after_bytecode(&mut self, machine: &Machine) -> Result<(), ExitError> {
		self.handler.post_validate(machine.memory())
	}
}

/// One call frame: a [`Machine`] plus the context system opcodes read.
pub struct Runtime {
	machine: Machine,
	return_data_buffer: Vec<u8>,
	context: Context,
	is_static: bool,
}

impl Runtime {
	/// Create a new runtime with given code and data.
	pub fn new(
		code: Rc<Vec<u8>>,
		data: Rc<Vec<u8>>,
		context: Context,
		is_static: bool,
		config: &Config,
	) -> Self {
		Self {
			machine: Machine::new(code, data, config.stack_limit, config.memory_limit),
			return_data_buffer: Vec::new(),
			context,
			is_static,
		}
	}

	/// Get a reference to the machine.
	pub fn machine(&self) -> &Machine {
		&self.machine
	}

	/// Get a reference to the execution context.
	pub fn context(&self) -> &Context {
		&self.context
	}

	/// Whether state changes are forbidden in this frame.
	pub fn is_static(&self) -> bool {
		self.is_static
	}

	/// Loop stepping the runtime until it exits.
	pub fn run<H: Handler>(&mut self, table: &JumpTable, handler: &mut H) -> ExitReason {
		loop {
			let mut hook = Hook {
				handler: &mut *handler,
				context: &self.context,
				is_static: self.is_static,
			};

			match self.machine.run(table, &mut hook) {
				Capture::Exit(reason) => return reason,
				Capture::Trap(opcode) => {
					let control = match eval::eval(self, opcode, handler) {
						eval::Control::Continue => handler
							.post_validate(self.machine.memory())
							.map_err(ExitReason::from),
						eval::Control::Exit(reason) => Err(reason),
					};

					if let Err(reason) = control {
						self.machine.exit(reason.clone());
						return reason;
					}
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use primitive_types::{H160, H256, U256};
	use std::collections::BTreeMap;

	#[derive(Default)]
	struct MockHandler {
		storage: BTreeMap<(H160, H256), H256>,
		logs: Vec<(H160, Vec<H256>, Vec<u8>)>,
		calls: Vec<(H160, Vec<u8>, bool)>,
		call_result: Vec<u8>,
		validated: usize,
	}

	impl Handler for MockHandler {
		fn code_size(&self, _address: H160) -> U256 {
			U256::from(3)
		}
		fn code_hash(&self, _address: H160) -> H256 {
			H256::repeat_byte(0x11)
		}
		fn code(&self, _address: H160) -> Vec<u8> {
			vec![0xaa, 0xbb, 0xcc]
		}
		fn storage(&self, address: H160, index: H256) -> H256 {
			self.storage
				.get(&(address, index))
				.cloned()
				.unwrap_or_default()
		}
		fn gas_left(&self) -> U256 {
			U256::from(5000)
		}
		fn set_storage(&mut self, address: H160, index: H256, value: H256) -> Result<(), ExitError> {
			self.storage.insert((address, index), value);
			Ok(())
		}
		fn log(&mut self, address: H160, topics: Vec<H256>, data: Vec<u8>) -> Result<(), ExitError> {
			self.logs.push((address, topics, data));
			Ok(())
		}
		fn create(
			&mut self,
			_caller: H160,
			_scheme: CreateScheme,
			_value: U256,
			_init_code: Vec<u8>,
			_target_gas: Option<u64>,
		) -> (ExitReason, Option<H160>, Vec<u8>) {
			(
				ExitSucceed::Returned.into(),
				Some(H160::repeat_byte(0x42)),
				Vec::new(),
			)
		}
		fn call(
			&mut self,
			code_address: H160,
			input: Vec<u8>,
			_target_gas: Option<u64>,
			is_static: bool,
			_context: Context,
		) -> (ExitReason, Vec<u8>) {
			self.calls.push((code_address, input, is_static));
			(ExitSucceed::Returned.into(), self.call_result.clone())
		}
		fn pre_validate(
			&mut self,
			_context: &Context,
			_opcode: Opcode,
			_operation: &Operation,
			_stack: &Stack,
		) -> Result<(), ExitError> {
			self.validated += 1;
			Ok(())
		}
	}

	fn context() -> Context {
		Context {
			address: H160::repeat_byte(0x01),
			caller: H160::repeat_byte(0x02),
			apparent_value: U256::from(7),
		}
	}

	fn run(code: &str, is_static: bool, handler: &mut MockHandler) -> (ExitReason, Runtime) {
		let mut runtime = Runtime::new(
			Rc::new(hex::decode(code).unwrap()),
			Rc::new(Vec::new()),
			context(),
			is_static,
			&Config::default(),
		);
		let reason = runtime.run(&JumpTable::new(), handler);
		(reason, runtime)
	}

	fn top(runtime: &Runtime) -> H256 {
		runtime.machine().stack().peek(0).unwrap()
	}

	#[test]
	fn context_opcodes() {
		let mut handler = MockHandler::default();
		// CALLER
		let (reason, runtime) = run("33", false, &mut handler);
		assert_eq!(reason, ExitSucceed::Stopped.into());
		assert_eq!(top(&runtime), H256::from(H160::repeat_byte(0x02)));

		// CALLVALUE
		let (_, runtime) = run("34", false, &mut handler);
		assert_eq!(top(&runtime), H256::from_low_u64_be(7));
	}

	#[test]
	fn sstore_then_sload() {
		let mut handler = MockHandler::default();
		// PUSH1 0x2a PUSH1 1 SSTORE PUSH1 1 SLOAD
		let (reason, runtime) = run("602a600155600154", false, &mut handler);
		assert_eq!(reason, ExitSucceed::Stopped.into());
		assert_eq!(top(&runtime), H256::from_low_u64_be(0x2a));
		assert_eq!(handler.validated, 5);
	}

	#[test]
	fn sha3_of_empty_input() {
		let mut handler = MockHandler::default();
		// PUSH1 0 PUSH1 0 SHA3
		let (_, runtime) = run("6000600020", false, &mut handler);
		assert_eq!(
			top(&runtime),
			H256::from_slice(
				&hex::decode("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
					.unwrap()
			)
		);
	}

	#[test]
	fn log_collects_topics_and_data() {
		let mut handler = MockHandler::default();
		// PUSH1 0xff PUSH1 0 MSTORE8 PUSH1 9 PUSH1 1 PUSH1 0 LOG1
		let (reason, _) = run("60ff600053600960016000a1", false, &mut handler);
		assert_eq!(reason, ExitSucceed::Stopped.into());
		assert_eq!(handler.logs.len(), 1);
		let (address, topics, data) = &handler.logs[0];
		assert_eq!(*address, H160::repeat_byte(0x01));
		assert_eq!(topics, &vec![H256::from_low_u64_be(9)]);
		assert_eq!(data, &vec![0xff]);
	}

	#[test]
	fn static_frames_reject_writes() {
		let mut handler = MockHandler::default();
		let (reason, _) = run("602a600155", true, &mut handler);
		assert_eq!(reason, ExitError::WriteProtection.into());
		assert!(handler.storage.is_empty());

		// PUSH1 0 PUSH1 0 PUSH1 0 PUSH1 0 PUSH1 1 PUSH1 5 PUSH1 0 CALL
		let (reason, _) = run("6000600060006000600160056000f1", true, &mut handler);
		assert_eq!(reason, ExitError::WriteProtection.into());
		assert!(handler.calls.is_empty());
	}

	#[test]
	fn call_copies_output_and_pushes_success() {
		let mut handler = MockHandler {
			call_result: vec![0xde, 0xad],
			..Default::default()
		};
		// out_len 2 at 0, in_len 0, value 0, to 5, gas 0xffff, CALL
		let (reason, runtime) = run("60026000600060006000600561fffff1", false, &mut handler);
		assert_eq!(reason, ExitSucceed::Stopped.into());
		assert_eq!(top(&runtime), H256::from_low_u64_be(1));
		assert_eq!(runtime.machine().memory().get(0, 2), vec![0xde, 0xad]);
		assert_eq!(handler.calls.len(), 1);
		assert_eq!(handler.calls[0].0, H160::from_low_u64_be(5));
		assert!(!handler.calls[0].2);
	}

	#[test]
	fn staticcall_marks_child_static() {
		let mut handler = MockHandler::default();
		// out 0, in 0, to 5, gas 0xffff, STATICCALL
		let (_, runtime) = run("6000600060006000600561fffffa", false, &mut handler);
		assert_eq!(top(&runtime), H256::from_low_u64_be(1));
		assert!(handler.calls[0].2);
	}

	#[test]
	fn returndata_is_bounds_checked() {
		let mut handler = MockHandler::default();
		// PUSH1 1 PUSH1 0 PUSH1 0 RETURNDATACOPY
		let (reason, _) = run("6001600060003e", false, &mut handler);
		assert_eq!(reason, ExitError::OutOfOffset.into());
	}

	#[test]
	fn create_pushes_address() {
		let mut handler = MockHandler::default();
		// PUSH1 0 PUSH1 0 PUSH1 0 CREATE
		let (_, runtime) = run("600060006000f0", false, &mut handler);
		assert_eq!(top(&runtime), H256::from(H160::repeat_byte(0x42)));
	}
}
