//! Gas accounting for annvm.
//!
//! The per-opcode prices are not fixed here: hosts install a versioned
//! [`CostTable`] and the [`Gasometer`] only enforces the budget.

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

use annvm_core::{ExitError, Opcode};
use primitive_types::U256;

/// Versioned gas price list. Every opcode has a flat cost; memory expansion is
/// charged as `words * memory_word + words^2 / memory_quad_divisor` on the
/// high-water mark.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CostTable {
	version: u32,
	opcodes: [u64; 256],
	memory_word: u64,
	memory_quad_divisor: u64,
}

impl CostTable {
	/// Version `1`, the default: every opcode costs 1, memory costs 3 per word
	/// plus `words^2 / 512`.
	pub const fn annchain() -> Self {
		Self {
			version: 1,
			opcodes: [1; 256],
			memory_word: 3,
			memory_quad_divisor: 512,
		}
	}

	/// Version `0`: every opcode and memory word is free. Only precompiles and
	/// explicit charges consume gas, so code that loops runs until the host
	/// stops it.
	pub const fn unmetered() -> Self {
		Self {
			version: 0,
			opcodes: [0; 256],
			memory_word: 0,
			memory_quad_divisor: 0,
		}
	}

	/// Empty table tagged with `version`.
	pub const fn new(version: u32) -> Self {
		Self {
			version,
			opcodes: [0; 256],
			memory_word: 0,
			memory_quad_divisor: 0,
		}
	}

	pub fn version(&self) -> u32 {
		self.version
	}

	/// Set the cost of a single opcode.
	pub fn with_opcode_cost(mut self, opcode: Opcode, cost: u64) -> Self {
		self.opcodes[opcode.as_usize()] = cost;
		self
	}

	/// Set the same cost for every opcode.
	pub fn with_uniform_cost(mut self, cost: u64) -> Self {
		self.opcodes = [cost; 256];
		self
	}

	/// Set memory expansion prices. A zero `quad_divisor` disables the
	/// quadratic term.
	pub fn with_memory_cost(mut self, word: u64, quad_divisor: u64) -> Self {
		self.memory_word = word;
		self.memory_quad_divisor = quad_divisor;
		self
	}

	#[inline]
	pub fn opcode_cost(&self, opcode: Opcode) -> u64 {
		self.opcodes[opcode.as_usize()]
	}

	/// Total cost of holding `len` bytes of memory.
	pub fn memory_cost(&self, len: U256) -> Result<u64, ExitError> {
		let words = len / U256::from(32) + if (len % U256::from(32)).is_zero() { 0 } else { 1 };
		if words > U256::from(u64::MAX) {
			return Err(ExitError::OutOfGas);
		}
		let words = words.as_u64();

		let linear = words
			.checked_mul(self.memory_word)
			.ok_or(ExitError::OutOfGas)?;
		let quad = if self.memory_quad_divisor == 0 {
			0
		} else {
			words.checked_mul(words).ok_or(ExitError::OutOfGas)? / self.memory_quad_divisor
		};

		linear.checked_add(quad).ok_or(ExitError::OutOfGas)
	}
}

impl Default for CostTable {
	fn default() -> Self {
		Self::annchain()
	}
}

/// Gasometer of one call frame. The remaining budget never increases except
/// through [`Gasometer::record_stipend`], which returns gas a sub-call did
/// not use.
#[derive(Clone, Debug)]
pub struct Gasometer<'config> {
	gas_limit: u64,
	used_gas: u64,
	memory_gas: u64,
	table: &'config CostTable,
}

impl<'config> Gasometer<'config> {
	pub fn new(gas_limit: u64, table: &'config CostTable) -> Self {
		Self {
			gas_limit,
			used_gas: 0,
			memory_gas: 0,
			table,
		}
	}

	#[inline]
	pub fn gas_limit(&self) -> u64 {
		self.gas_limit
	}

	/// Remaining gas.
	#[inline]
	pub fn gas(&self) -> u64 {
		self.gas_limit - self.used_gas - self.memory_gas
	}

	/// Total used gas, including memory expansion.
	#[inline]
	pub fn total_used_gas(&self) -> u64 {
		self.used_gas + self.memory_gas
	}

	#[inline]
	pub fn cost_table(&self) -> &'config CostTable {
		self.table
	}

	/// Consume all remaining gas.
	pub fn fail(&mut self) -> ExitError {
		self.used_gas = self.gas_limit - self.memory_gas;
		ExitError::OutOfGas
	}

	/// Record an explicit cost.
	pub fn record_cost(&mut self, cost: u64) -> Result<(), ExitError> {
		if cfg!(feature = "noop-gas") {
			return Ok(());
		}

		if cost > self.gas() {
			return Err(self.fail());
		}

		self.used_gas += cost;
		Ok(())
	}

	/// Record the flat cost of an opcode from the cost table.
	pub fn record_opcode(&mut self, opcode: Opcode) -> Result<(), ExitError> {
		self.record_cost(self.table.opcode_cost(opcode))
	}

	/// Record memory expansion up to `effective_len` bytes. Only growth of the
	/// high-water mark costs gas.
	pub fn record_memory(&mut self, effective_len: U256) -> Result<(), ExitError> {
		if cfg!(feature = "noop-gas") {
			return Ok(());
		}

		let memory_gas = match self.table.memory_cost(effective_len) {
			Ok(cost) => cost,
			Err(e) => {
				self.fail();
				return Err(e);
			}
		};

		if memory_gas > self.memory_gas {
			match self.used_gas.checked_add(memory_gas) {
				Some(total) if total <= self.gas_limit => (),
				_ => return Err(self.fail()),
			}
			self.memory_gas = memory_gas;
		}

		Ok(())
	}

	/// Return gas to this frame, typically what a sub-call left unused.
	pub fn record_stipend(&mut self, stipend: u64) {
		self.used_gas = self.used_gas.saturating_sub(stipend);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn budget_is_never_exceeded() {
		let table = CostTable::new(1).with_opcode_cost(Opcode::ADD, 3);
		let mut gasometer = Gasometer::new(7, &table);

		gasometer.record_opcode(Opcode::ADD).unwrap();
		gasometer.record_opcode(Opcode::ADD).unwrap();
		assert_eq!(gasometer.gas(), 1);
		assert_eq!(gasometer.record_opcode(Opcode::ADD), Err(ExitError::OutOfGas));
		assert_eq!(gasometer.gas(), 0);
		assert_eq!(gasometer.total_used_gas(), 7);
	}

	#[test]
	fn free_opcodes_cost_nothing() {
		let table = CostTable::unmetered();
		let mut gasometer = Gasometer::new(0, &table);
		gasometer.record_opcode(Opcode::MSTORE).unwrap();
		gasometer.record_memory(U256::from(1024)).unwrap();
		assert_eq!(gasometer.total_used_gas(), 0);
	}

	#[test]
	fn memory_is_charged_on_growth_only() {
		let table = CostTable::new(1).with_memory_cost(3, 512);
		let mut gasometer = Gasometer::new(1_000, &table);

		gasometer.record_memory(U256::from(64)).unwrap();
		assert_eq!(gasometer.total_used_gas(), 6);

		gasometer.record_memory(U256::from(32)).unwrap();
		assert_eq!(gasometer.total_used_gas(), 6);

		// 1024 words: 3 * 1024 + 1024^2 / 512 = 5120
		assert_eq!(gasometer.record_memory(U256::from(32 * 1024)), Err(ExitError::OutOfGas));
		assert_eq!(gasometer.gas(), 0);
	}

	#[test]
	fn default_table_charges_every_opcode() {
		let table = CostTable::default();
		assert_eq!(table.version(), 1);
		assert_eq!(table.opcode_cost(Opcode::JUMPDEST), 1);
		assert_eq!(table.opcode_cost(Opcode::STOP), 1);

		let mut gasometer = Gasometer::new(2, &table);
		gasometer.record_opcode(Opcode::JUMPDEST).unwrap();
		gasometer.record_opcode(Opcode::JUMP).unwrap();
		assert_eq!(gasometer.record_opcode(Opcode::JUMPDEST), Err(ExitError::OutOfGas));
	}

	#[test]
	fn memory_cost_overflow_runs_out_of_gas() {
		let table = CostTable::new(1).with_memory_cost(u64::MAX, 0);
		let mut gasometer = Gasometer::new(100, &table);
		gasometer.record_cost(10).unwrap();

		assert_eq!(gasometer.record_memory(U256::from(32)), Err(ExitError::OutOfGas));
		assert_eq!(gasometer.gas(), 0);
	}

	#[test]
	fn stipend_returns_unused_gas() {
		let table = CostTable::unmetered();
		let mut gasometer = Gasometer::new(100, &table);
		gasometer.record_cost(60).unwrap();
		gasometer.record_stipend(45);
		assert_eq!(gasometer.gas(), 85);
	}
}
