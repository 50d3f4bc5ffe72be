use super::{Apply, ApplyBackend, Backend, Log};
use primitive_types::{H160, H256, U256};
use std::collections::BTreeMap;

/// Account stored in a [`MemoryBackend`].
#[derive(Default, Clone, Debug, Eq, PartialEq)]
pub struct MemoryAccount {
	pub nonce: U256,
	pub storage: BTreeMap<H256, H256>,
	pub code: Vec<u8>,
}

/// In-memory backend, for tests and one-shot tools.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
	state: BTreeMap<H160, MemoryAccount>,
	logs: Vec<Log>,
}

impl MemoryBackend {
	pub fn new(state: BTreeMap<H160, MemoryAccount>) -> Self {
		Self {
			state,
			logs: Vec::new(),
		}
	}

	pub fn state(&self) -> &BTreeMap<H160, MemoryAccount> {
		&self.state
	}

	pub fn state_mut(&mut self) -> &mut BTreeMap<H160, MemoryAccount> {
		&mut self.state
	}

	/// Logs applied so far, oldest first.
	pub fn logs(&self) -> &[Log] {
		&self.logs
	}
}

impl Backend for MemoryBackend {
	fn exists(&self, address: H160) -> bool {
		self.state.contains_key(&address)
	}

	fn nonce(&self, address: H160) -> U256 {
		self.state
			.get(&address)
			.map(|a| a.nonce)
			.unwrap_or_default()
	}

	fn code(&self, address: H160) -> Vec<u8> {
		self.state
			.get(&address)
			.map(|a| a.code.clone())
			.unwrap_or_default()
	}

	fn storage(&self, address: H160, index: H256) -> H256 {
		self.state
			.get(&address)
			.and_then(|a| a.storage.get(&index).cloned())
			.unwrap_or_default()
	}
}

impl ApplyBackend for MemoryBackend {
	fn apply<A, I, L>(&mut self, values: A, logs: L)
	where
		A: IntoIterator<Item = Apply<I>>,
		I: IntoIterator<Item = (H256, H256)>,
		L: IntoIterator<Item = Log>,
	{
		for apply in values {
			let account = self.state.entry(apply.address).or_default();
			account.nonce = apply.nonce;
			if let Some(code) = apply.code {
				account.code = code;
			}
			if apply.reset_storage {
				account.storage = BTreeMap::new();
			}

			for (index, value) in apply.storage {
				if value == H256::default() {
					account.storage.remove(&index);
				} else {
					account.storage.insert(index, value);
				}
			}
		}

		self.logs.extend(logs);
	}
}
