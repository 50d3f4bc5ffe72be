#[macro_use]
mod macros;
mod arithmetic;
mod bitwise;
mod misc;

use crate::{ExitError, ExitReason, ExitSucceed, Machine, Opcode};
use core::fmt;
use core::ops::{BitAnd, BitOr, BitXor};
use primitive_types::U256;

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Control {
	Continue(usize),
	Exit(ExitReason),
	Jump(usize),
	Trap(Opcode),
}

/// Execute function of an operation. Receives the machine, the opcode being
/// executed and its position in code.
pub type Efn = fn(state: &mut Machine, opcode: Opcode, position: usize) -> Control;

/// Operation descriptor: stack arity, side-effect flags and the execute
/// function of one opcode.
#[derive(Clone, Copy)]
pub struct Operation {
	execute: Efn,
	inputs: usize,
	outputs: usize,
	halts: bool,
	reverts: bool,
	jumps: bool,
	writes: bool,
}

impl Operation {
	pub fn new(execute: Efn, inputs: usize, outputs: usize) -> Self {
		Self {
			execute,
			inputs,
			outputs,
			halts: false,
			reverts: false,
			jumps: false,
			writes: false,
		}
	}

	/// Mark the operation as stopping execution successfully.
	pub fn halts(mut self) -> Self {
		self.halts = true;
		self
	}

	/// Mark the operation as stopping execution with a revert.
	pub fn reverts(mut self) -> Self {
		self.reverts = true;
		self
	}

	/// Mark the operation as setting the program counter itself.
	pub fn jumps(mut self) -> Self {
		self.jumps = true;
		self
	}

	/// Mark the operation as mutating state. Such operations are rejected in
	/// read-only calls.
	pub fn writes(mut self) -> Self {
		self.writes = true;
		self
	}

	/// Stack items the operation consumes.
	pub fn inputs(&self) -> usize {
		self.inputs
	}

	/// Stack items the operation leaves behind.
	pub fn outputs(&self) -> usize {
		self.outputs
	}

	pub fn is_halting(&self) -> bool {
		self.halts
	}

	pub fn is_reverting(&self) -> bool {
		self.reverts
	}

	pub fn is_jumping(&self) -> bool {
		self.jumps
	}

	pub fn is_writing(&self) -> bool {
		self.writes
	}

	#[inline]
	pub fn execute(&self, state: &mut Machine, opcode: Opcode, position: usize) -> Control {
		(self.execute)(state, opcode, position)
	}
}

impl fmt::Debug for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Operation")
			.field("inputs", &self.inputs)
			.field("outputs", &self.outputs)
			.field("halts", &self.halts)
			.field("reverts", &self.reverts)
			.field("jumps", &self.jumps)
			.field("writes", &self.writes)
			.finish()
	}
}

/// Opcode-indexed table of operation descriptors. Bytes without an entry are
/// invalid opcodes.
#[derive(Clone)]
pub struct JumpTable([Option<Operation>; 256]);

impl JumpTable {
	/// An empty table. Every byte decodes as an invalid opcode.
	pub fn empty() -> Self {
		Self([None; 256])
	}

	#[inline]
	pub fn get(&self, opcode: Opcode) -> Option<&Operation> {
		self.0[opcode.as_usize()].as_ref()
	}

	pub fn insert(&mut self, opcode: Opcode, operation: Operation) {
		self.0[opcode.as_usize()] = Some(operation);
	}

	/// Opcodes with an entry, in ascending order.
	pub fn opcodes(&self) -> impl Iterator<Item = Opcode> + '_ {
		self.0
			.iter()
			.enumerate()
			.filter(|(_, entry)| entry.is_some())
			.map(|(i, _)| Opcode(i as u8))
	}

	/// Build the instruction set: arithmetic, bitwise, memory, control flow
	/// and stack opcodes are executed here; system opcodes trap to the
	/// runtime after their descriptor checks.
	pub fn new() -> Self {
		// Ugly due to https://rust-lang.github.io/rfcs/1558-closure-to-fn-coercion.html
		// not being there.
		macro_rules! op {
			($operation:ident, $inputs:expr, $outputs:expr, $definition:expr) => {{
				#[allow(non_snake_case)]
				fn $operation(_state: &mut Machine, _opcode: Opcode, _position: usize) -> Control {
					$definition
				}
				Operation::new($operation, $inputs, $outputs)
			}};
			($operation:ident, $inputs:expr, $outputs:expr, $state:ident, $definition:expr) => {{
				#[allow(non_snake_case)]
				fn $operation($state: &mut Machine, _opcode: Opcode, _position: usize) -> Control {
					$definition
				}
				Operation::new($operation, $inputs, $outputs)
			}};
			($operation:ident, $inputs:expr, $outputs:expr, $state:ident, $pc:ident, $definition:expr) => {{
				#[allow(non_snake_case)]
				fn $operation($state: &mut Machine, _opcode: Opcode, $pc: usize) -> Control {
					$definition
				}
				Operation::new($operation, $inputs, $outputs)
			}};
		}

		fn eval_external(_state: &mut Machine, opcode: Opcode, _position: usize) -> Control {
			Control::Trap(opcode)
		}
		fn eval_push(state: &mut Machine, opcode: Opcode, position: usize) -> Control {
			self::misc::push(state, opcode.as_usize() - 0x5f, position)
		}
		fn eval_dup(state: &mut Machine, opcode: Opcode, _position: usize) -> Control {
			self::misc::dup(state, opcode.as_usize() - 0x7f)
		}
		fn eval_swap(state: &mut Machine, opcode: Opcode, _position: usize) -> Control {
			self::misc::swap(state, opcode.as_usize() - 0x8f)
		}
		let external = |inputs, outputs| Operation::new(eval_external, inputs, outputs);

		let mut table = Self::empty();

		table.insert(Opcode::STOP, op!(STOP, 0, 0, Control::Exit(ExitSucceed::Stopped.into())).halts());
		table.insert(Opcode::ADD, op!(ADD, 2, 1, state, op2_u256_tuple!(state, overflowing_add)));
		table.insert(Opcode::MUL, op!(MUL, 2, 1, state, op2_u256_tuple!(state, overflowing_mul)));
		table.insert(Opcode::SUB, op!(SUB, 2, 1, state, op2_u256_tuple!(state, overflowing_sub)));
		table.insert(Opcode::DIV, op!(DIV, 2, 1, state, op2_u256_fn!(state, self::arithmetic::div)));
		table.insert(Opcode::SDIV, op!(SDIV, 2, 1, state, op2_u256_fn!(state, self::arithmetic::sdiv)));
		table.insert(Opcode::MOD, op!(MOD, 2, 1, state, op2_u256_fn!(state, self::arithmetic::rem)));
		table.insert(Opcode::SMOD, op!(SMOD, 2, 1, state, op2_u256_fn!(state, self::arithmetic::srem)));
		table.insert(Opcode::ADDMOD, op!(ADDMOD, 3, 1, state, op3_u256_fn!(state, self::arithmetic::addmod)));
		table.insert(Opcode::MULMOD, op!(MULMOD, 3, 1, state, op3_u256_fn!(state, self::arithmetic::mulmod)));
		table.insert(Opcode::EXP, op!(EXP, 2, 1, state, op2_u256_fn!(state, self::arithmetic::exp)));
		table.insert(
			Opcode::SIGNEXTEND,
			op!(SIGNEXTEND, 2, 1, state, op2_u256_fn!(state, self::arithmetic::signextend)),
		);

		table.insert(Opcode::LT, op!(LT, 2, 1, state, op2_u256_bool_ref!(state, lt)));
		table.insert(Opcode::GT, op!(GT, 2, 1, state, op2_u256_bool_ref!(state, gt)));
		table.insert(Opcode::SLT, op!(SLT, 2, 1, state, op2_u256_fn!(state, self::bitwise::slt)));
		table.insert(Opcode::SGT, op!(SGT, 2, 1, state, op2_u256_fn!(state, self::bitwise::sgt)));
		table.insert(Opcode::EQ, op!(EQ, 2, 1, state, op2_u256_bool_ref!(state, eq)));
		table.insert(Opcode::ISZERO, op!(ISZERO, 1, 1, state, op1_u256_fn!(state, self::bitwise::iszero)));
		table.insert(Opcode::AND, op!(AND, 2, 1, state, op2_u256!(state, bitand)));
		table.insert(Opcode::OR, op!(OR, 2, 1, state, op2_u256!(state, bitor)));
		table.insert(Opcode::XOR, op!(XOR, 2, 1, state, op2_u256!(state, bitxor)));
		table.insert(Opcode::NOT, op!(NOT, 1, 1, state, op1_u256_fn!(state, self::bitwise::not)));
		table.insert(Opcode::BYTE, op!(BYTE, 2, 1, state, op2_u256_fn!(state, self::bitwise::byte)));
		table.insert(Opcode::SHL, op!(SHL, 2, 1, state, op2_u256_fn!(state, self::bitwise::shl)));
		table.insert(Opcode::SHR, op!(SHR, 2, 1, state, op2_u256_fn!(state, self::bitwise::shr)));
		table.insert(Opcode::SAR, op!(SAR, 2, 1, state, op2_u256_fn!(state, self::bitwise::sar)));

		table.insert(Opcode::CALLDATALOAD, op!(CALLDATALOAD, 1, 1, state, self::misc::calldataload(state)));
		table.insert(Opcode::CALLDATASIZE, op!(CALLDATASIZE, 0, 1, state, self::misc::calldatasize(state)));
		table.insert(Opcode::CALLDATACOPY, op!(CALLDATACOPY, 3, 0, state, self::misc::calldatacopy(state)));
		table.insert(Opcode::CODESIZE, op!(CODESIZE, 0, 1, state, self::misc::codesize(state)));
		table.insert(Opcode::CODECOPY, op!(CODECOPY, 3, 0, state, self::misc::codecopy(state)));

		table.insert(Opcode::POP, op!(POP, 1, 0, state, self::misc::pop(state)));
		table.insert(Opcode::MLOAD, op!(MLOAD, 1, 1, state, self::misc::mload(state)));
		table.insert(Opcode::MSTORE, op!(MSTORE, 2, 0, state, self::misc::mstore(state)));
		table.insert(Opcode::MSTORE8, op!(MSTORE8, 2, 0, state, self::misc::mstore8(state)));
		table.insert(Opcode::JUMP, op!(JUMP, 1, 0, state, self::misc::jump(state)).jumps());
		table.insert(Opcode::JUMPI, op!(JUMPI, 2, 0, state, self::misc::jumpi(state)).jumps());
		table.insert(Opcode::PC, op!(PC, 0, 1, state, position, self::misc::pc(state, position)));
		table.insert(Opcode::MSIZE, op!(MSIZE, 0, 1, state, self::misc::msize(state)));
		table.insert(Opcode::JUMPDEST, op!(JUMPDEST, 0, 0, Control::Continue(1)));

		for n in 1..=32u8 {
			table.insert(Opcode(0x5f + n), Operation::new(eval_push, 0, 1));
		}
		for n in 1..=16u8 {
			let depth = n as usize;
			table.insert(Opcode(0x7f + n), Operation::new(eval_dup, depth, depth + 1));
			table.insert(Opcode(0x8f + n), Operation::new(eval_swap, depth + 1, depth + 1));
		}

		table.insert(Opcode::RETURN, op!(RETURN, 2, 0, state, self::misc::ret(state)).halts());
		table.insert(Opcode::REVERT, op!(REVERT, 2, 0, state, self::misc::revert(state)).reverts());
		table.insert(
			Opcode::INVALID,
			op!(INVALID, 0, 0, Control::Exit(ExitError::DesignatedInvalid.into())),
		);

		table.insert(Opcode::SHA3, external(2, 1));
		table.insert(Opcode::ADDRESS, external(0, 1));
		table.insert(Opcode::CALLER, external(0, 1));
		table.insert(Opcode::CALLVALUE, external(0, 1));
		table.insert(Opcode::EXTCODESIZE, external(1, 1));
		table.insert(Opcode::EXTCODECOPY, external(4, 0));
		table.insert(Opcode::RETURNDATASIZE, external(0, 1));
		table.insert(Opcode::RETURNDATACOPY, external(3, 0));
		table.insert(Opcode::EXTCODEHASH, external(1, 1));
		table.insert(Opcode::SLOAD, external(1, 1));
		table.insert(Opcode::SSTORE, external(2, 0).writes());
		table.insert(Opcode::GAS, external(0, 1));
		for n in 0..=4u8 {
			table.insert(Opcode(0xa0 + n), external(n as usize + 2, 0).writes());
		}
		table.insert(Opcode::CREATE, external(3, 1).writes());
		table.insert(Opcode::CREATE2, external(4, 1).writes());
		// A value-bearing CALL is rejected by the runtime in read-only calls.
		table.insert(Opcode::CALL, external(7, 1));
		table.insert(Opcode::DELEGATECALL, external(6, 1));
		table.insert(Opcode::STATICCALL, external(6, 1));

		table
	}
}

impl Default for JumpTable {
	fn default() -> Self {
		Self::new()
	}
}
