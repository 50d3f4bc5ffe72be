//! Precompiled contracts: native operations at well-known addresses that
//! bypass bytecode interpretation.

mod crypto;
mod modexp;

pub use self::crypto::{ECRecover, Identity, Ripemd160, Sha256};
pub use self::modexp::ModExp;

use crate::ExitError;
use auto_impl::auto_impl;
use primitive_types::H160;
use std::collections::BTreeMap;
use std::fmt;

/// A native operation.
#[auto_impl(&, Box, Arc)]
pub trait PrecompiledContract {
	/// Gas charged before running on `input`.
	fn required_gas(&self, input: &[u8]) -> u64;
	/// Run on `input`.
	fn run(&self, input: &[u8]) -> Result<Vec<u8>, ExitError>;
}

/// Gas of `base + per_word * words(len)`, saturating.
pub(crate) fn linear_cost(len: usize, base: u64, per_word: u64) -> u64 {
	let words = (len as u64).saturating_add(31) / 32;
	base.saturating_add(per_word.saturating_mul(words))
}

/// Fixed registry of precompiled contracts. Built once and never mutated
/// while a machine uses it.
#[derive(Default)]
pub struct Precompiles {
	contracts: BTreeMap<H160, Box<dyn PrecompiledContract + Send + Sync>>,
}

impl Precompiles {
	/// An empty registry.
	pub fn empty() -> Self {
		Self::default()
	}

	/// The Byzantium set at `0x01`..`0x05`: ecrecover, sha256, ripemd160,
	/// identity and modexp.
	pub fn byzantium() -> Self {
		let mut precompiles = Self::empty();
		precompiles.insert(H160::from_low_u64_be(1), ECRecover);
		precompiles.insert(H160::from_low_u64_be(2), Sha256);
		precompiles.insert(H160::from_low_u64_be(3), Ripemd160);
		precompiles.insert(H160::from_low_u64_be(4), Identity);
		precompiles.insert(H160::from_low_u64_be(5), ModExp);
		precompiles
	}

	pub fn insert<P>(&mut self, address: H160, contract: P)
	where
		P: PrecompiledContract + Send + Sync + 'static,
	{
		self.contracts.insert(address, Box::new(contract));
	}

	pub fn get(&self, address: H160) -> Option<&(dyn PrecompiledContract + Send + Sync)> {
		self.contracts.get(&address).map(|contract| &**contract)
	}

	pub fn contains(&self, address: H160) -> bool {
		self.contracts.contains_key(&address)
	}

	/// Registered addresses, in ascending order.
	pub fn addresses(&self) -> impl Iterator<Item = &H160> {
		self.contracts.keys()
	}
}

impl fmt::Debug for Precompiles {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_set().entries(self.contracts.keys()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn byzantium_addresses() {
		let precompiles = Precompiles::byzantium();
		let addresses: Vec<H160> = precompiles.addresses().cloned().collect();
		assert_eq!(
			addresses,
			(1..=5).map(H160::from_low_u64_be).collect::<Vec<_>>()
		);
		assert!(!precompiles.contains(H160::from_low_u64_be(6)));
	}

	#[test]
	fn identity_gas() {
		let precompiles = Precompiles::byzantium();
		let identity = precompiles.get(H160::from_low_u64_be(4)).unwrap();
		assert_eq!(identity.required_gas(&[]), 15);
		assert_eq!(identity.required_gas(&[0; 33]), 21);
		assert_eq!(identity.run(&[1, 2, 3]).unwrap(), vec![1, 2, 3]);
	}
}
