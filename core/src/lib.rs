//! Core layer for annvm: words, stack, memory and the opcode dispatch loop.

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod error;
mod eval;
mod memory;
mod opcode;
mod stack;
pub mod utils;
mod valids;

pub use crate::error::{Capture, ExitError, ExitFatal, ExitReason, ExitRevert, ExitSucceed};
pub use crate::eval::{Control, Efn, JumpTable, Operation};
pub use crate::memory::Memory;
pub use crate::opcode::Opcode;
pub use crate::stack::Stack;
pub use crate::valids::Valids;

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::ops::Range;
use primitive_types::U256;

/// Hooks invoked by the dispatch loop around every executed opcode.
pub trait InterpreterHandler {
	/// Called after the descriptor's stack checks and before execution. An
	/// error aborts execution without running the opcode.
	fn before_bytecode(
		&mut self,
		opcode: Opcode,
		pc: usize,
		machine: &Machine,
		operation: &Operation,
	) -> Result<(), ExitError>;

	/// Called after the opcode ran, including halting ones. Used to charge
	/// memory expansion.
	fn after_bytecode(&mut self, _machine: &Machine) -> Result<(), ExitError> {
		Ok(())
	}
}

/// Handler that accepts everything. Runs code without any metering.
pub struct Unmetered;

impl InterpreterHandler for Unmetered {
	fn before_bytecode(
		&mut self,
		_opcode: Opcode,
		_pc: usize,
		_machine: &Machine,
		_operation: &Operation,
	) -> Result<(), ExitError> {
		Ok(())
	}
}

/// Core execution layer.
pub struct Machine {
	/// Program data.
	data: Rc<Vec<u8>>,
	/// Program code.
	code: Rc<Vec<u8>>,
	/// Program counter.
	position: Result<usize, ExitReason>,
	/// Return value.
	return_range: Range<U256>,
	/// Code validity maps.
	valids: Valids,
	/// Memory.
	memory: Memory,
	/// Stack.
	stack: Stack,
}

impl Machine {
	/// Reference of machine stack.
	pub fn stack(&self) -> &Stack {
		&self.stack
	}
	/// Mutable reference of machine stack.
	pub fn stack_mut(&mut self) -> &mut Stack {
		&mut self.stack
	}
	/// Reference of machine memory.
	pub fn memory(&self) -> &Memory {
		&self.memory
	}
	/// Mutable reference of machine memory.
	pub fn memory_mut(&mut self) -> &mut Memory {
		&mut self.memory
	}
	/// Program code.
	pub fn code(&self) -> &[u8] {
		&self.code
	}
	/// Call data.
	pub fn data(&self) -> &[u8] {
		&self.data
	}
	/// Return a reference of the program counter.
	pub fn position(&self) -> &Result<usize, ExitReason> {
		&self.position
	}

	/// Create a new machine with given code and data.
	pub fn new(
		code: Rc<Vec<u8>>,
		data: Rc<Vec<u8>>,
		stack_limit: usize,
		memory_limit: usize,
	) -> Self {
		let valids = Valids::new(&code[..]);

		Self {
			data,
			code,
			position: Ok(0),
			return_range: U256::zero()..U256::zero(),
			valids,
			memory: Memory::new(memory_limit),
			stack: Stack::new(stack_limit),
		}
	}

	/// Explicit exit of the machine. Further step will return error.
	pub fn exit(&mut self, reason: ExitReason) {
		self.position = Err(reason);
	}

	/// Inspect the machine's next opcode and current stack.
	pub fn inspect(&self) -> Option<(Opcode, &Stack)> {
		let position = match self.position {
			Ok(position) => position,
			Err(_) => return None,
		};
		self.code.get(position).map(|v| (Opcode(*v), &self.stack))
	}

	/// Copy and get the return value of the machine, if any.
	pub fn return_value(&self) -> Vec<u8> {
		let start = self.return_range.start;
		let len = self.return_range.end - start;
		if len.is_zero() {
			return Vec::new();
		}

		// RETURN and REVERT resized memory over this range, so it is bounded
		// by the memory limit.
		self.memory.get(start.as_usize(), len.as_usize())
	}

	fn fail(&mut self, error: ExitError) -> Capture<ExitReason, Opcode> {
		let reason = ExitReason::from(error);
		self.position = Err(reason.clone());
		Capture::Exit(reason)
	}

	/// Loop stepping the machine with the given jump table, until it exits or
	/// traps on an external opcode. A trapped machine resumes after the
	/// trapping opcode on the next call.
	pub fn run<H: InterpreterHandler>(
		&mut self,
		table: &JumpTable,
		handler: &mut H,
	) -> Capture<ExitReason, Opcode> {
		let mut pc = match &self.position {
			Ok(position) => *position,
			Err(reason) => return Capture::Exit(reason.clone()),
		};

		loop {
			let opcode = match self.code.get(pc) {
				Some(v) => Opcode(*v),
				None => {
					self.position = Err(ExitSucceed::Stopped.into());
					return Capture::Exit(ExitSucceed::Stopped.into());
				}
			};
			let operation = match table.get(opcode) {
				Some(operation) => operation,
				None => return self.fail(ExitError::InvalidOpcode(opcode)),
			};

			let depth = self.stack.len();
			if depth < operation.inputs() {
				return self.fail(ExitError::StackUnderflow);
			}
			if depth - operation.inputs() + operation.outputs() > self.stack.limit() {
				return self.fail(ExitError::StackOverflow);
			}

			if let Err(e) = handler.before_bytecode(opcode, pc, self, operation) {
				return self.fail(e);
			}

			let control = operation.execute(self, opcode, pc);

			if let Err(e) = handler.after_bytecode(self) {
				return self.fail(e);
			}

			pc = match control {
				Control::Continue(bytes) => pc + bytes,
				Control::Jump(pos) => pos,
				Control::Exit(reason) => {
					self.position = Err(reason.clone());
					return Capture::Exit(reason);
				}
				Control::Trap(opcode) => {
					self.position = Ok(pc + 1);
					return Capture::Trap(opcode);
				}
			};
			self.position = Ok(pc);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn run(code: &str, data: &[u8]) -> (Capture<ExitReason, Opcode>, Machine) {
		let table = JumpTable::new();
		let mut machine = Machine::new(
			Rc::new(hex::decode(code).unwrap()),
			Rc::new(data.to_vec()),
			1024,
			usize::MAX,
		);
		let ret = machine.run(&table, &mut Unmetered);
		(ret, machine)
	}

	fn top(machine: &Machine) -> U256 {
		U256::from_big_endian(&machine.stack().peek(0).unwrap()[..])
	}

	#[test]
	fn push_push_add() {
		let (ret, machine) = run("6001600101", &[]);
		assert_eq!(ret, Capture::Exit(ExitSucceed::Stopped.into()));
		assert_eq!(machine.stack().len(), 1);
		assert_eq!(top(&machine), U256::from(2));
	}

	#[test]
	fn return_copies_memory() {
		// PUSH1 0x2a PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN
		let (ret, machine) = run("602a60005260206000f3", &[]);
		assert_eq!(ret, Capture::Exit(ExitSucceed::Returned.into()));
		let value = machine.return_value();
		assert_eq!(value.len(), 32);
		assert_eq!(value[31], 0x2a);
	}

	#[test]
	fn revert_keeps_return_data() {
		// PUSH1 0xff PUSH1 0 MSTORE8 PUSH1 1 PUSH1 0 REVERT
		let (ret, machine) = run("60ff60005360016000fd", &[]);
		assert_eq!(ret, Capture::Exit(ExitRevert::Reverted.into()));
		assert_eq!(machine.return_value(), vec![0xff]);
	}

	#[test]
	fn underflow_does_not_touch_memory() {
		// PUSH1 1 ADD
		let (ret, machine) = run("600101", &[]);
		assert_eq!(ret, Capture::Exit(ExitError::StackUnderflow.into()));
		assert_eq!(machine.stack().len(), 1);
		assert_eq!(machine.memory().effective_len(), U256::zero());
	}

	#[test]
	fn unknown_byte_is_invalid_opcode() {
		let (ret, _) = run("600c0c", &[]);
		assert_eq!(
			ret,
			Capture::Exit(ExitError::InvalidOpcode(Opcode(0x0c)).into())
		);
	}

	#[test]
	fn jumps_must_land_on_jumpdest() {
		// PUSH1 4 JUMP INVALID JUMPDEST PUSH1 7
		let (ret, machine) = run("600456fe5b6007", &[]);
		assert_eq!(ret, Capture::Exit(ExitSucceed::Stopped.into()));
		assert_eq!(top(&machine), U256::from(7));

		// PUSH1 3 JUMP
		let (ret, _) = run("600356", &[]);
		assert_eq!(ret, Capture::Exit(ExitError::InvalidJump.into()));
	}

	#[test]
	fn calldata_is_right_padded() {
		let (_, machine) = run("600035", &[0xab]);
		let word = machine.stack().peek(0).unwrap();
		assert_eq!(word[0], 0xab);
		assert!(word[1..].iter().all(|b| *b == 0));
	}

	#[test]
	fn stack_limit_is_enforced_before_push() {
		let table = JumpTable::new();
		let mut machine = Machine::new(
			Rc::new(hex::decode("600160016001").unwrap()),
			Rc::new(Vec::new()),
			2,
			usize::MAX,
		);
		let ret = machine.run(&table, &mut Unmetered);
		assert_eq!(ret, Capture::Exit(ExitError::StackOverflow.into()));
		assert_eq!(machine.stack().len(), 2);
	}

	#[test]
	fn external_opcode_traps_and_resumes() {
		let table = JumpTable::new();
		// CALLER PUSH1 1
		let mut machine = Machine::new(
			Rc::new(hex::decode("336001").unwrap()),
			Rc::new(Vec::new()),
			1024,
			usize::MAX,
		);
		assert_eq!(machine.run(&table, &mut Unmetered), Capture::Trap(Opcode::CALLER));
		assert_eq!(machine.position(), &Ok(1));
		machine.stack_mut().push_u256(U256::from(9)).unwrap();
		assert_eq!(
			machine.run(&table, &mut Unmetered),
			Capture::Exit(ExitSucceed::Stopped.into())
		);
		assert_eq!(machine.stack().len(), 2);
	}
}
