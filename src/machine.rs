use crate::address::create_address;
use crate::backend::{Apply, Backend, Log};
use crate::executor::Executor;
use crate::gasometer::CostTable;
use crate::interpreter::Interpreter;
use crate::precompile::Precompiles;
use crate::{Config, Context, CreateScheme, Error};
use log::debug;
use primitive_types::{H160, H256, U256};
use std::collections::BTreeMap;

/// Sender side of a top-level invocation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CallContext {
	pub sender: H160,
	pub value: U256,
	pub gas_limit: u64,
	/// Reject state-mutating opcodes.
	pub read_only: bool,
}

impl CallContext {
	pub fn new(sender: H160, gas_limit: u64) -> Self {
		Self {
			sender,
			value: U256::zero(),
			gas_limit,
			read_only: false,
		}
	}

	pub fn with_value(mut self, value: U256) -> Self {
		self.value = value;
		self
	}

	pub fn read_only(mut self) -> Self {
		self.read_only = true;
		self
	}
}

/// Result of a successful create.
#[derive(Clone, Debug)]
pub struct CreateOutcome {
	pub address: H160,
	/// Deployed code: the output of the init code.
	pub code: Vec<u8>,
	/// Operand stack of the init code when it halted, bottom first.
	pub stack: Vec<H256>,
	pub gas_used: u64,
	pub changes: Vec<Apply<BTreeMap<H256, H256>>>,
	pub logs: Vec<Log>,
}

/// Result of a successful call.
#[derive(Clone, Debug)]
pub struct CallOutcome {
	pub output: Vec<u8>,
	/// Operand stack of the called code when it halted, bottom first.
	pub stack: Vec<H256>,
	pub gas_used: u64,
	pub changes: Vec<Apply<BTreeMap<H256, H256>>>,
	pub logs: Vec<Log>,
}

/// The machine: limits, gas prices, precompiles and interpreters, fixed at
/// construction and shared by every invocation.
pub struct Machine {
	config: Config,
	cost_table: CostTable,
	precompiles: Precompiles,
	interpreters: Vec<Interpreter>,
}

impl Machine {
	/// A machine with the Byzantium precompiles and the standard interpreters.
	pub fn new(config: Config, cost_table: CostTable) -> Self {
		Self {
			config,
			cost_table,
			precompiles: Precompiles::byzantium(),
			interpreters: Interpreter::standard(),
		}
	}

	/// A machine with the AnnChain limits and the metered default cost table.
	pub fn annchain() -> Self {
		Self::new(Config::annchain(), CostTable::annchain())
	}

	pub fn with_precompiles(mut self, precompiles: Precompiles) -> Self {
		self.precompiles = precompiles;
		self
	}

	pub fn with_interpreters(mut self, interpreters: Vec<Interpreter>) -> Self {
		self.interpreters = interpreters;
		self
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn cost_table(&self) -> &CostTable {
		&self.cost_table
	}

	pub fn precompiles(&self) -> &Precompiles {
		&self.precompiles
	}

	fn executor<B: Backend>(&self, backend: B, gas_limit: u64) -> Executor<'_, B> {
		Executor::new(
			backend,
			&self.config,
			&self.cost_table,
			&self.precompiles,
			&self.interpreters,
			gas_limit,
		)
	}

	/// Run `init_code` on behalf of `context.sender`. The new contract lives at
	/// `create_address(sender, nonce)`, with `nonce` supplied by the host.
	pub fn create<B: Backend>(
		&self,
		backend: B,
		context: &CallContext,
		nonce: U256,
		init_code: Vec<u8>,
	) -> Result<CreateOutcome, Error> {
		if context.read_only {
			return Err(Error::WriteProtection);
		}

		let address = create_address(context.sender, nonce);
		debug!(
			"create {:?} from {:?} nonce {}, {} bytes of init code",
			address,
			context.sender,
			nonce,
			init_code.len()
		);

		let mut executor = self.executor(backend, context.gas_limit);
		let (execution, _) = executor.create_inner(
			context.sender,
			CreateScheme::Fixed(address),
			context.value,
			init_code,
			None,
		);
		Error::check(execution.reason, &execution.output)?;

		let gas_used = executor.used_gas();
		let (changes, logs) = executor.into_changes();
		Ok(CreateOutcome {
			address,
			code: execution.output,
			stack: execution.stack,
			gas_used,
			changes,
			logs,
		})
	}

	/// Call `target` with `input`. A target in the precompile registry runs
	/// natively; any other target runs the supplied `code`.
	pub fn call<B: Backend>(
		&self,
		backend: B,
		context: &CallContext,
		target: H160,
		input: Vec<u8>,
		code: Vec<u8>,
	) -> Result<CallOutcome, Error> {
		debug!(
			"call {:?} from {:?}, {} bytes of input",
			target,
			context.sender,
			input.len()
		);

		let mut executor = self.executor(backend, context.gas_limit);
		let execution = executor.call_inner(
			target,
			code,
			input,
			None,
			context.read_only,
			Context {
				address: target,
				caller: context.sender,
				apparent_value: context.value,
			},
		);
		Error::check(execution.reason, &execution.output)?;

		let gas_used = executor.used_gas();
		let (changes, logs) = executor.into_changes();
		Ok(CallOutcome {
			output: execution.output,
			stack: execution.stack,
			gas_used,
			changes,
			logs,
		})
	}
}

impl Default for Machine {
	fn default() -> Self {
		Self::annchain()
	}
}
