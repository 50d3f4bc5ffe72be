//! Signatures over multisig wallet operations.
//!
//! A wallet contract authorizes a transfer when it is presented a signature
//! of [`operation_hash`] by one of its owners. Signatures are 65 bytes,
//! `r ++ s ++ v` with the recovery id `v` in `{0, 1}`; the `ecrecover`
//! precompile expects `v + 27`.

use crate::Error;
use libsecp256k1::{Message, PublicKey, RecoveryId, SecretKey, Signature};
use primitive_types::{H160, H256, U256};
use sha3::{Digest, Keccak256};

/// `keccak(contract ++ from ++ to ++ value)`, with `value` as a 32-byte
/// big-endian word.
pub fn operation_hash(contract: H160, from: H160, to: H160, value: U256) -> H256 {
	let mut word = [0u8; 32];
	value.to_big_endian(&mut word);

	let mut hasher = Keccak256::new();
	hasher.update(contract.as_bytes());
	hasher.update(from.as_bytes());
	hasher.update(to.as_bytes());
	hasher.update(word);
	H256::from_slice(hasher.finalize().as_slice())
}

/// Sign a 32-byte hash with a raw secp256k1 secret key.
pub fn sign(hash: H256, secret: &[u8]) -> Result<[u8; 65], Error> {
	let secret = SecretKey::parse_slice(secret).map_err(|_| Error::InvalidKey)?;
	let (signature, recovery_id) = libsecp256k1::sign(&Message::parse(hash.as_fixed_bytes()), &secret);

	let mut out = [0u8; 65];
	out[..64].copy_from_slice(&signature.serialize());
	out[64] = recovery_id.serialize();
	Ok(out)
}

/// Address of a public key: the last 20 bytes of the Keccak-256 of its
/// uncompressed form, without the `0x04` tag.
pub fn public_to_address(public: &PublicKey) -> H160 {
	let serialized = public.serialize();
	H256::from_slice(Keccak256::digest(&serialized[1..]).as_slice()).into()
}

/// Address owning a secret key.
pub fn secret_to_address(secret: &[u8]) -> Result<H160, Error> {
	let secret = SecretKey::parse_slice(secret).map_err(|_| Error::InvalidKey)?;
	Ok(public_to_address(&PublicKey::from_secret_key(&secret)))
}

/// Recover the signer address of `hash` from a 65-byte signature.
pub fn recover(hash: H256, signature: &[u8; 65]) -> Result<H160, Error> {
	let recovery_id = RecoveryId::parse(signature[64]).map_err(|_| Error::InvalidKey)?;
	let signature = Signature::parse_standard_slice(&signature[..64]).map_err(|_| Error::InvalidKey)?;
	let public = libsecp256k1::recover(&Message::parse(hash.as_fixed_bytes()), &signature, &recovery_id)
		.map_err(|_| Error::InvalidKey)?;
	Ok(public_to_address(&public))
}
