use super::PrecompiledContract;
use crate::ExitError;
use num_bigint::BigUint;
use primitive_types::U256;
use std::borrow::Cow;

/// `0x05`: modular exponentiation of arbitrary-length big-endian integers.
///
/// Input is `len(base) ++ len(exp) ++ len(mod) ++ base ++ exp ++ mod`, with
/// the three lengths as 32-byte words and missing bytes read as zero.
pub struct ModExp;

const QUAD_DIVISOR: u64 = 20;

/// Bytes of `input` at `offset..offset + len`, zero-padded past its end.
fn read_padded(input: &[u8], offset: usize, len: usize) -> Vec<u8> {
	let mut out = vec![0u8; len];
	if offset < input.len() {
		let available = (input.len() - offset).min(len);
		out[..available].copy_from_slice(&input[offset..offset + available]);
	}
	out
}

fn read_len(input: &[u8], word: usize) -> U256 {
	U256::from_big_endian(&read_padded(input, word * 32, 32))
}

fn saturating_u64(value: U256) -> u64 {
	if value > U256::from(u64::MAX) {
		u64::MAX
	} else {
		value.as_u64()
	}
}

fn mult_complexity(x: u64) -> u64 {
	let x = x as u128;
	let complexity = if x <= 64 {
		x * x
	} else if x <= 1024 {
		x * x / 4 + 96 * x - 3072
	} else {
		x * x / 16 + 480 * x - 199_680
	};
	complexity.min(u64::MAX as u128) as u64
}

/// Index of the highest set bit of the first word of the exponent, plus
/// eight bits per byte past that word.
fn adjusted_exp_len(input: &[u8], base_len: u64, exp_len: u64) -> u64 {
	let head_len = exp_len.min(32) as usize;
	let head = match 96u64.checked_add(base_len) {
		Some(offset) if offset <= input.len() as u64 => {
			U256::from_big_endian(&read_padded(input, offset as usize, head_len))
		}
		_ => U256::zero(),
	};
	let head_bits = if head.is_zero() {
		0
	} else {
		head.bits() as u64 - 1
	};

	if exp_len <= 32 {
		head_bits
	} else {
		8u64.saturating_mul(exp_len - 32).saturating_add(head_bits)
	}
}

impl PrecompiledContract for ModExp {
	fn required_gas(&self, input: &[u8]) -> u64 {
		let base_len = saturating_u64(read_len(input, 0));
		let exp_len = saturating_u64(read_len(input, 1));
		let mod_len = saturating_u64(read_len(input, 2));

		let complexity = mult_complexity(base_len.max(mod_len));
		let adjusted = adjusted_exp_len(input, base_len, exp_len).max(1);
		(complexity as u128 * adjusted as u128 / QUAD_DIVISOR as u128).min(u64::MAX as u128)
			as u64
	}

	fn run(&self, input: &[u8]) -> Result<Vec<u8>, ExitError> {
		let too_large = || ExitError::PrecompileFailure(Cow::Borrowed("modexp input too large"));
		let limit = U256::from(u32::MAX);
		let (base_len, exp_len, mod_len) = (read_len(input, 0), read_len(input, 1), read_len(input, 2));
		if base_len > limit || exp_len > limit || mod_len > limit {
			return Err(too_large());
		}
		let (base_len, exp_len, mod_len) =
			(base_len.as_usize(), exp_len.as_usize(), mod_len.as_usize());

		if base_len == 0 && mod_len == 0 {
			return Ok(Vec::new());
		}

		let base = BigUint::from_bytes_be(&read_padded(input, 96, base_len));
		let exp = BigUint::from_bytes_be(&read_padded(input, 96 + base_len, exp_len));
		let modulus = BigUint::from_bytes_be(&read_padded(input, 96 + base_len + exp_len, mod_len));

		let mut out = vec![0u8; mod_len];
		if modulus == BigUint::from(0u32) {
			return Ok(out);
		}

		let result = base.modpow(&exp, &modulus).to_bytes_be();
		// The result is below the modulus, so it fits in `mod_len` bytes.
		out[mod_len - result.len()..].copy_from_slice(&result);
		Ok(out)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn input(base: &[u8], exp: &[u8], modulus: &[u8]) -> Vec<u8> {
		let mut data = Vec::new();
		for len in &[base.len(), exp.len(), modulus.len()] {
			let mut word = [0u8; 32];
			U256::from(*len).to_big_endian(&mut word);
			data.extend_from_slice(&word);
		}
		data.extend_from_slice(base);
		data.extend_from_slice(exp);
		data.extend_from_slice(modulus);
		data
	}

	#[test]
	fn small_exponentiation() {
		// 3^5 mod 7 = 5
		let data = input(&[3], &[5], &[0, 7]);
		assert_eq!(ModExp.run(&data).unwrap(), vec![0, 5]);
		// 2^2 * (bits(5) - 1) / 20
		assert_eq!(ModExp.required_gas(&data), 0);
	}

	#[test]
	fn zero_modulus_yields_zeros() {
		let data = input(&[3], &[5], &[0, 0]);
		assert_eq!(ModExp.run(&data).unwrap(), vec![0, 0]);
	}

	#[test]
	fn fermat_gas() {
		// base 32 bytes, exp 32 bytes with top bit set, mod 32 bytes:
		// 32^2 * 255 / 20 = 13056
		let mut data = input(&[1; 32], &[0xff; 32], &[0xfe; 32]);
		assert_eq!(ModExp.required_gas(&data), 13056);
		data.truncate(96);
		assert_eq!(ModExp.run(&data).unwrap(), vec![0u8; 32]);
	}

	#[test]
	fn huge_lengths_are_rejected() {
		let mut data = vec![0u8; 96];
		data[0] = 0xff;
		assert!(ModExp.required_gas(&data) > 100_000_000);
		assert!(ModExp.run(&data).is_err());
	}
}
