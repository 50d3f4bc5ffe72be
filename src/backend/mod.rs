//! # Host backends
//!
//! The machine never persists anything itself. It reads account state
//! through [`Backend`] and hands the changes of a successful execution back as
//! [`Apply`] values, which a host may feed into an [`ApplyBackend`].

mod memory;

pub use self::memory::{MemoryAccount, MemoryBackend};

use auto_impl::auto_impl;
use primitive_types::{H160, H256, U256};

/// A log emitted by a contract.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Log {
	pub address: H160,
	pub topics: Vec<H256>,
	pub data: Vec<u8>,
}

/// Changes of one account after an execution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Apply<I> {
	/// Address of the account.
	pub address: H160,
	/// Nonce of the account.
	pub nonce: U256,
	/// Newly deployed code, if any.
	pub code: Option<Vec<u8>>,
	/// Storage entries to write. A zero value clears the entry.
	pub storage: I,
	/// Whether existing storage is wiped before writing, as for a freshly
	/// created account.
	pub reset_storage: bool,
}

/// Read access to account state.
#[auto_impl(&, Box, Arc)]
pub trait Backend {
	/// Whether the account exists.
	fn exists(&self, address: H160) -> bool;
	/// Nonce of the account.
	fn nonce(&self, address: H160) -> U256;
	/// Code of the account.
	fn code(&self, address: H160) -> Vec<u8>;
	/// Storage value of the account at index.
	fn storage(&self, address: H160, index: H256) -> H256;
}

/// A backend that can persist changes.
pub trait ApplyBackend {
	fn apply<A, I, L>(&mut self, values: A, logs: L)
	where
		A: IntoIterator<Item = Apply<I>>,
		I: IntoIterator<Item = (H256, H256)>,
		L: IntoIterator<Item = Log>;
}
