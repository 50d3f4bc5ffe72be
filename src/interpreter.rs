//! Interpreter selection.

use crate::{Config, Context, ExitReason, ExitSucceed, Handler, JumpTable, Runtime};
use log::debug;
use primitive_types::{H160, H256, U256};
use std::rc::Rc;

/// Executable unit of one invocation.
#[derive(Clone, Debug)]
pub struct Contract {
	/// Address the code runs as.
	pub address: H160,
	pub code: Rc<Vec<u8>>,
	pub code_hash: H256,
	pub caller: H160,
	pub value: U256,
	/// Gas budget of the frame.
	pub gas: u64,
}

impl Contract {
	fn context(&self) -> Context {
		Context {
			address: self.address,
			caller: self.caller,
			apparent_value: self.value,
		}
	}
}

/// Result of running a contract.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Execution {
	pub reason: ExitReason,
	pub output: Vec<u8>,
	/// Final operand stack, bottom first.
	pub stack: Vec<H256>,
}

/// The closed set of interpreters, tried in order by
/// [`Interpreter::select`].
#[derive(Clone)]
pub enum Interpreter {
	/// Runs empty code: stops immediately with no output.
	Empty,
	/// Bytecode interpreter over a jump table.
	Bytecode(JumpTable),
}

impl Interpreter {
	/// The default interpreter set.
	pub fn standard() -> Vec<Interpreter> {
		vec![Interpreter::Empty, Interpreter::Bytecode(JumpTable::new())]
	}

	/// First interpreter of `interpreters` that accepts `code`.
	pub fn select<'a>(interpreters: &'a [Interpreter], code: &[u8]) -> Option<&'a Interpreter> {
		interpreters.iter().find(|interpreter| interpreter.can_run(code))
	}

	pub fn name(&self) -> &'static str {
		match self {
			Interpreter::Empty => "empty",
			Interpreter::Bytecode(_) => "bytecode",
		}
	}

	/// Whether this interpreter accepts `code`. Bytecode starting with `0xef`
	/// is reserved for other formats.
	pub fn can_run(&self, code: &[u8]) -> bool {
		match self {
			Interpreter::Empty => code.is_empty(),
			Interpreter::Bytecode(_) => code.first().map(|b| *b != 0xef).unwrap_or(false),
		}
	}

	pub fn run<H: Handler>(
		&self,
		contract: &Contract,
		input: Vec<u8>,
		is_static: bool,
		config: &Config,
		handler: &mut H,
	) -> Execution {
		debug!(
			"{} interpreter running {:?}, {} bytes of code",
			self.name(),
			contract.address,
			contract.code.len()
		);

		match self {
			Interpreter::Empty => Execution {
				reason: ExitSucceed::Stopped.into(),
				output: Vec::new(),
				stack: Vec::new(),
			},
			Interpreter::Bytecode(table) => {
				let mut runtime = Runtime::new(
					contract.code.clone(),
					Rc::new(input),
					contract.context(),
					is_static,
					config,
				);
				let reason = runtime.run(table, handler);
				Execution {
					reason,
					output: runtime.machine().return_value(),
					stack: runtime.machine().stack().data().clone(),
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn selection_order() {
		let interpreters = Interpreter::standard();
		assert_eq!(Interpreter::select(&interpreters, &[]).unwrap().name(), "empty");
		assert_eq!(
			Interpreter::select(&interpreters, &[0x60, 0x01]).unwrap().name(),
			"bytecode"
		);
		assert!(Interpreter::select(&interpreters, &[0xef, 0x00]).is_none());
		assert!(Interpreter::select(&interpreters[1..], &[]).is_none());
	}
}
