//! Account address derivation.

use crate::Error;
use primitive_types::{H160, H256, U256};
use rlp::RlpStream;
use sha3::{Digest, Keccak256};

fn keccak(data: &[u8]) -> H256 {
	H256::from_slice(Keccak256::digest(data).as_slice())
}

/// Address of a contract created by `sender` at `nonce`: the last 20 bytes of
/// `keccak(rlp([sender, nonce]))`.
pub fn create_address(sender: H160, nonce: U256) -> H160 {
	let mut stream = RlpStream::new_list(2);
	stream.append(&sender);
	stream.append(&nonce);
	let encoded = stream.out();
	keccak(&encoded[..]).into()
}

/// Address of a contract created through `CREATE2`:
/// `keccak(0xff ++ caller ++ salt ++ keccak(init_code))[12..]`.
pub fn create2_address(caller: H160, salt: H256, code_hash: H256) -> H160 {
	let mut preimage = Vec::with_capacity(1 + 20 + 32 + 32);
	preimage.push(0xff);
	preimage.extend_from_slice(caller.as_bytes());
	preimage.extend_from_slice(salt.as_bytes());
	preimage.extend_from_slice(code_hash.as_bytes());
	keccak(&preimage).into()
}

/// Parse a hex address, with or without `0x`. Short input is left-padded and
/// long input keeps its last 20 bytes.
pub fn parse_address(s: &str) -> Result<H160, Error> {
	let digits = s.trim();
	let digits = digits.strip_prefix("0x").unwrap_or(digits);
	let bytes = hex::decode(digits).map_err(|_| Error::InvalidAddress(s.to_string()))?;

	let mut address = H160::zero();
	if bytes.len() >= 20 {
		address.assign_from_slice(&bytes[bytes.len() - 20..]);
	} else {
		address[20 - bytes.len()..].copy_from_slice(&bytes);
	}
	Ok(address)
}

/// Lowercase `0x`-prefixed hex form of an address.
pub fn format_address(address: &H160) -> String {
	format!("0x{}", hex::encode(address))
}
