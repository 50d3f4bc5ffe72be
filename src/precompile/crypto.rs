use super::{linear_cost, PrecompiledContract};
use crate::ExitError;
use primitive_types::H256;
use sha2::Digest;

/// `0x01`: recover the signer address of a hash.
///
/// Input is `hash ++ v ++ r ++ s`, each a 32-byte word, with `v` in
/// `{27, 28}`. A bad signature yields empty output rather than an error.
pub struct ECRecover;

impl PrecompiledContract for ECRecover {
	fn required_gas(&self, _input: &[u8]) -> u64 {
		3000
	}

	fn run(&self, input: &[u8]) -> Result<Vec<u8>, ExitError> {
		let mut padded = [0u8; 128];
		let len = input.len().min(128);
		padded[..len].copy_from_slice(&input[..len]);

		let v = &padded[32..64];
		if v[..31].iter().any(|b| *b != 0) || !(v[31] == 27 || v[31] == 28) {
			return Ok(Vec::new());
		}

		let hash = H256::from_slice(&padded[..32]);
		let mut signature = [0u8; 65];
		signature[..64].copy_from_slice(&padded[64..128]);
		signature[64] = v[31] - 27;

		match crate::signature::recover(hash, &signature) {
			Ok(address) => {
				let mut out = vec![0u8; 12];
				out.extend_from_slice(address.as_bytes());
				Ok(out)
			}
			Err(_) => Ok(Vec::new()),
		}
	}
}

/// `0x02`: SHA-256.
pub struct Sha256;

impl PrecompiledContract for Sha256 {
	fn required_gas(&self, input: &[u8]) -> u64 {
		linear_cost(input.len(), 60, 12)
	}

	fn run(&self, input: &[u8]) -> Result<Vec<u8>, ExitError> {
		Ok(sha2::Sha256::digest(input).to_vec())
	}
}

/// `0x03`: RIPEMD-160, left-padded to a word.
pub struct Ripemd160;

impl PrecompiledContract for Ripemd160 {
	fn required_gas(&self, input: &[u8]) -> u64 {
		linear_cost(input.len(), 600, 120)
	}

	fn run(&self, input: &[u8]) -> Result<Vec<u8>, ExitError> {
		let mut out = vec![0u8; 12];
		out.extend_from_slice(&ripemd::Ripemd160::digest(input));
		Ok(out)
	}
}

/// `0x04`: returns its input.
pub struct Identity;

impl PrecompiledContract for Identity {
	fn required_gas(&self, input: &[u8]) -> u64 {
		linear_cost(input.len(), 15, 3)
	}

	fn run(&self, input: &[u8]) -> Result<Vec<u8>, ExitError> {
		Ok(input.to_vec())
	}
}
