use crate::backend::Log;
use crate::gasometer::Gasometer;
use primitive_types::{H160, H256, U256};
use std::collections::{BTreeMap, BTreeSet};

/// Changes made by one frame, on top of its parent's view of state. A frame
/// that succeeds is merged into its parent; a frame that fails is dropped.
pub struct Substate<'config> {
	pub gasometer: Gasometer<'config>,
	pub storages: BTreeMap<(H160, H256), H256>,
	pub codes: BTreeMap<H160, Vec<u8>>,
	pub nonces: BTreeMap<H160, U256>,
	/// Accounts created in this frame. Their storage starts empty.
	pub created: BTreeSet<H160>,
	pub logs: Vec<Log>,
}

impl<'config> Substate<'config> {
	pub fn new(gasometer: Gasometer<'config>) -> Self {
		Self {
			gasometer,
			storages: BTreeMap::new(),
			codes: BTreeMap::new(),
			nonces: BTreeMap::new(),
			created: BTreeSet::new(),
			logs: Vec::new(),
		}
	}

	pub fn merge(&mut self, child: Substate<'config>) {
		for address in &child.created {
			self.storages.retain(|(a, _), _| a != address);
		}

		self.created.extend(child.created);
		self.storages.extend(child.storages);
		self.codes.extend(child.codes);
		self.nonces.extend(child.nonces);
		self.logs.extend(child.logs);
	}

	/// Whether this frame knows the storage value of `address` at `index`.
	/// Created accounts answer zero for anything they did not write.
	pub fn known_storage(&self, address: H160, index: H256) -> Option<H256> {
		if let Some(value) = self.storages.get(&(address, index)) {
			return Some(*value);
		}
		if self.created.contains(&address) {
			return Some(H256::default());
		}
		None
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::gasometer::CostTable;

	#[test]
	fn merge_resets_storage_of_created_accounts() {
		let table = CostTable::unmetered();
		let address = H160::repeat_byte(1);
		let mut parent = Substate::new(Gasometer::new(0, &table));
		parent
			.storages
			.insert((address, H256::from_low_u64_be(1)), H256::from_low_u64_be(9));

		let mut child = Substate::new(Gasometer::new(0, &table));
		child.created.insert(address);
		child
			.storages
			.insert((address, H256::from_low_u64_be(2)), H256::from_low_u64_be(3));

		parent.merge(child);
		assert_eq!(
			parent.known_storage(address, H256::from_low_u64_be(1)),
			Some(H256::zero())
		);
		assert_eq!(
			parent.known_storage(address, H256::from_low_u64_be(2)),
			Some(H256::from_low_u64_be(3))
		);
		assert_eq!(parent.known_storage(H160::zero(), H256::zero()), None);
	}
}
