//! Journaled executor. Runs frames against a read-only [`Backend`], keeping
//! every change in per-frame substates until the top-level execution ends.

mod substate;

use self::substate::Substate;
use crate::address::{create2_address, create_address};
use crate::backend::{Apply, Backend, Log};
use crate::gasometer::{CostTable, Gasometer};
use crate::interpreter::{Contract, Execution, Interpreter};
use crate::precompile::Precompiles;
use crate::{
	Config, Context, CreateScheme, ExitError, ExitReason, ExitSucceed, Handler, Memory, Opcode,
	Operation, Stack,
};
use log::{debug, trace, warn};
use primitive_types::{H160, H256, U256};
use sha3::{Digest, Keccak256};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

fn keccak(data: &[u8]) -> H256 {
	H256::from_slice(Keccak256::digest(data).as_slice())
}

fn failed(error: ExitError) -> Execution {
	Execution {
		reason: error.into(),
		output: Vec::new(),
		stack: Vec::new(),
	}
}

/// Changes of a finished execution, ready for [`crate::backend::ApplyBackend`].
pub type Changes = (Vec<Apply<BTreeMap<H256, H256>>>, Vec<Log>);

pub struct Executor<'config, B> {
	backend: B,
	config: &'config Config,
	precompiles: &'config Precompiles,
	interpreters: &'config [Interpreter],
	root: Substate<'config>,
	frames: Vec<Substate<'config>>,
}

impl<'config, B: Backend> Executor<'config, B> {
	pub fn new(
		backend: B,
		config: &'config Config,
		cost_table: &'config CostTable,
		precompiles: &'config Precompiles,
		interpreters: &'config [Interpreter],
		gas_limit: u64,
	) -> Self {
		Self {
			backend,
			config,
			precompiles,
			interpreters,
			root: Substate::new(Gasometer::new(gas_limit, cost_table)),
			frames: Vec::new(),
		}
	}

	/// Number of active frames.
	pub fn depth(&self) -> usize {
		self.frames.len()
	}

	/// Gas used by the frames run so far.
	pub fn used_gas(&self) -> u64 {
		self.root.gasometer.total_used_gas()
	}

	fn top(&self) -> &Substate<'config> {
		self.frames.last().unwrap_or(&self.root)
	}

	fn top_mut(&mut self) -> &mut Substate<'config> {
		match self.frames.last_mut() {
			Some(frame) => frame,
			None => &mut self.root,
		}
	}

	fn substates(&self) -> impl Iterator<Item = &Substate<'config>> {
		self.frames.iter().rev().chain(Some(&self.root))
	}

	pub fn nonce(&self, address: H160) -> U256 {
		self.substates()
			.find_map(|s| s.nonces.get(&address).cloned())
			.unwrap_or_else(|| self.backend.nonce(address))
	}

	pub fn exists(&self, address: H160) -> bool {
		self.substates()
			.any(|s| s.nonces.contains_key(&address) || s.codes.contains_key(&address))
			|| self.backend.exists(address)
	}

	/// Open a frame for a sub-execution. The child receives
	/// `min(target_gas, remaining)`, taken from the parent up front.
	fn enter(&mut self, target_gas: Option<u64>) -> Result<u64, ExitError> {
		if self.frames.len() >= self.config.call_stack_limit {
			return Err(ExitError::CallTooDeep);
		}

		let parent = self.top_mut();
		let available = parent.gasometer.gas();
		let gas = target_gas.map(|g| g.min(available)).unwrap_or(available);
		parent.gasometer.record_cost(gas)?;
		let table = parent.gasometer.cost_table();

		self.frames.push(Substate::new(Gasometer::new(gas, table)));
		Ok(gas)
	}

	/// Close the current frame. Success commits its changes; success and
	/// revert give its unused gas back.
	fn exit(&mut self, reason: &ExitReason) {
		let frame = match self.frames.pop() {
			Some(frame) => frame,
			None => return,
		};
		let parent = self.top_mut();

		match reason {
			ExitReason::Succeed(_) => {
				parent.gasometer.record_stipend(frame.gasometer.gas());
				parent.merge(frame);
			}
			ExitReason::Revert(_) => {
				parent.gasometer.record_stipend(frame.gasometer.gas());
			}
			ExitReason::Error(_) => (),
			ExitReason::Fatal(e) => {
				warn!("frame at depth {} failed fatally: {:?}", self.frames.len() + 1, e);
			}
		}
	}

	fn run_contract(&mut self, contract: &Contract, input: Vec<u8>, is_static: bool) -> Execution {
		let interpreters = self.interpreters;
		let config = self.config;

		match Interpreter::select(interpreters, &contract.code) {
			Some(interpreter) => interpreter.run(contract, input, is_static, config, self),
			None => {
				debug!("no interpreter accepts code at {:?}", contract.address);
				failed(ExitError::NoCompatibleInterpreter)
			}
		}
	}

	/// Run `code` as `context.address`, or the precompile registered at
	/// `code_address`.
	pub fn call_inner(
		&mut self,
		code_address: H160,
		code: Vec<u8>,
		input: Vec<u8>,
		target_gas: Option<u64>,
		is_static: bool,
		context: Context,
	) -> Execution {
		debug!(
			"call {:?} -> {:?} (code at {:?}), depth {}",
			context.caller,
			context.address,
			code_address,
			self.frames.len()
		);

		let precompiles = self.precompiles;
		if let Some(precompile) = precompiles.get(code_address) {
			debug!("precompile {:?} with {} bytes of input", code_address, input.len());
			if let Err(e) = self.enter(target_gas) {
				return failed(e);
			}

			let cost = precompile.required_gas(&input);
			let (reason, output) = match self.top_mut().gasometer.record_cost(cost) {
				Ok(()) => match precompile.run(&input) {
					Ok(output) => (ExitSucceed::Returned.into(), output),
					Err(e) => (e.into(), Vec::new()),
				},
				Err(e) => (e.into(), Vec::new()),
			};
			self.exit(&reason);

			return Execution {
				reason,
				output,
				stack: Vec::new(),
			};
		}

		let gas = match self.enter(target_gas) {
			Ok(gas) => gas,
			Err(e) => return failed(e),
		};
		let contract = Contract {
			address: context.address,
			code_hash: keccak(&code),
			code: Rc::new(code),
			caller: context.caller,
			value: context.apparent_value,
			gas,
		};

		let execution = self.run_contract(&contract, input, is_static);
		self.exit(&execution.reason);
		debug!("call to {:?} exited: {:?}", context.address, execution.reason);
		execution
	}

	/// Run `init_code` and deploy its output. On success the execution output
	/// is the deployed code.
	pub fn create_inner(
		&mut self,
		caller: H160,
		scheme: CreateScheme,
		value: U256,
		init_code: Vec<u8>,
		target_gas: Option<u64>,
	) -> (Execution, Option<H160>) {
		if self.frames.len() >= self.config.call_stack_limit {
			return (failed(ExitError::CallTooDeep), None);
		}

		let address = match scheme {
			CreateScheme::Legacy { caller } => {
				let nonce = self.nonce(caller);
				self.top_mut().nonces.insert(caller, nonce + U256::one());
				create_address(caller, nonce)
			}
			CreateScheme::Create2 {
				caller,
				code_hash,
				salt,
			} => create2_address(caller, salt, code_hash),
			CreateScheme::Fixed(address) => address,
		};
		debug!("create {:?} by {:?}, depth {}", address, caller, self.frames.len());

		if !self.code(address).is_empty() || !self.nonce(address).is_zero() {
			return (failed(ExitError::CreateCollision), None);
		}

		let gas = match self.enter(target_gas) {
			Ok(gas) => gas,
			Err(e) => return (failed(e), None),
		};
		{
			let frame = self.top_mut();
			frame.nonces.insert(address, U256::one());
			frame.created.insert(address);
		}

		let contract = Contract {
			address,
			code_hash: keccak(&init_code),
			code: Rc::new(init_code),
			caller,
			value,
			gas,
		};
		let mut execution = self.run_contract(&contract, Vec::new(), false);

		if execution.reason.is_succeed() {
			match self.config.create_contract_limit {
				Some(limit) if execution.output.len() > limit => {
					execution.reason = ExitError::CreateContractLimit.into();
				}
				_ => {
					let code = execution.output.clone();
					self.top_mut().codes.insert(address, code);
				}
			}
		}

		self.exit(&execution.reason);
		debug!("create {:?} exited: {:?}", address, execution.reason);

		let created = if execution.reason.is_succeed() {
			Some(address)
		} else {
			None
		};
		(execution, created)
	}

	/// Consume the executor, returning the committed account changes and logs.
	pub fn into_changes(self) -> Changes {
		let root = &self.root;
		let mut addresses: BTreeSet<H160> = root.created.clone();
		addresses.extend(root.codes.keys().cloned());
		addresses.extend(root.nonces.keys().cloned());
		addresses.extend(root.storages.keys().map(|(address, _)| *address));

		let applies = addresses
			.into_iter()
			.map(|address| Apply {
				address,
				nonce: self.nonce(address),
				code: root.codes.get(&address).cloned(),
				storage: root
					.storages
					.iter()
					.filter(|((a, _), _)| *a == address)
					.map(|((_, index), value)| (*index, *value))
					.collect(),
				reset_storage: root.created.contains(&address),
			})
			.collect();

		(applies, root.logs.clone())
	}
}

impl<'config, B: Backend> Handler for Executor<'config, B> {
	fn code_size(&self, address: H160) -> U256 {
		U256::from(self.code(address).len())
	}

	fn code_hash(&self, address: H160) -> H256 {
		if !self.exists(address) {
			return H256::default();
		}
		keccak(&self.code(address))
	}

	fn code(&self, address: H160) -> Vec<u8> {
		self.substates()
			.find_map(|s| s.codes.get(&address).cloned())
			.unwrap_or_else(|| self.backend.code(address))
	}

	fn storage(&self, address: H160, index: H256) -> H256 {
		self.substates()
			.find_map(|s| s.known_storage(address, index))
			.unwrap_or_else(|| self.backend.storage(address, index))
	}

	fn gas_left(&self) -> U256 {
		U256::from(self.top().gasometer.gas())
	}

	fn set_storage(&mut self, address: H160, index: H256, value: H256) -> Result<(), ExitError> {
		self.top_mut().storages.insert((address, index), value);
		Ok(())
	}

	fn log(&mut self, address: H160, topics: Vec<H256>, data: Vec<u8>) -> Result<(), ExitError> {
		self.top_mut().logs.push(Log {
			address,
			topics,
			data,
		});
		Ok(())
	}

	fn create(
		&mut self,
		caller: H160,
		scheme: CreateScheme,
		value: U256,
		init_code: Vec<u8>,
		target_gas: Option<u64>,
	) -> (ExitReason, Option<H160>, Vec<u8>) {
		let (execution, address) = self.create_inner(caller, scheme, value, init_code, target_gas);
		match execution.reason {
			ExitReason::Revert(_) => (execution.reason, None, execution.output),
			reason => (reason, address, Vec::new()),
		}
	}

	fn call(
		&mut self,
		code_address: H160,
		input: Vec<u8>,
		target_gas: Option<u64>,
		is_static: bool,
		context: Context,
	) -> (ExitReason, Vec<u8>) {
		let code = self.code(code_address);
		let execution = self.call_inner(code_address, code, input, target_gas, is_static, context);
		(execution.reason, execution.output)
	}

	fn pre_validate(
		&mut self,
		context: &Context,
		opcode: Opcode,
		operation: &Operation,
		stack: &Stack,
	) -> Result<(), ExitError> {
		trace!(
			"{:?} {:?} in={} out={} depth={}",
			context.address,
			opcode,
			operation.inputs(),
			operation.outputs(),
			stack.len()
		);
		self.top_mut().gasometer.record_opcode(opcode)
	}

	fn post_validate(&mut self, memory: &Memory) -> Result<(), ExitError> {
		self.top_mut().gasometer.record_memory(memory.effective_len())
	}
}
