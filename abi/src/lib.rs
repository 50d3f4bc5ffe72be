//! Call codec for annvm.
//!
//! Packs JSON arguments into the canonical head/tail byte layout of a
//! constructor or method call, and unpacks return data back into typed
//! values rendered as JSON.

#![forbid(unsafe_code)]

mod coerce;
mod decode;
mod definition;
mod encode;
mod error;
mod param_type;
mod token;

pub use crate::coerce::coerce;
pub use crate::decode::decode;
pub use crate::definition::{
	decode_revert_reason, selector, Abi, AbiJsonArg, AbiJsonEntry, Constructor, Function, Param,
	REVERT_SELECTOR,
};
pub use crate::encode::encode;
pub use crate::error::{Error, Result};
pub use crate::param_type::ParamType;
pub use crate::token::Token;

#[cfg(test)]
mod tests {
	use super::{decode, encode, ParamType, Token};
	use primitive_types::{H160, U256};
	use proptest::prelude::*;

	fn static_token() -> impl Strategy<Value = (ParamType, Token)> {
		prop_oneof![
			any::<[u8; 20]>().prop_map(|b| (ParamType::Address, Token::Address(H160::from(b)))),
			any::<[u64; 4]>().prop_map(|w| (ParamType::Uint(256), Token::Uint(U256(w)))),
			any::<[u64; 4]>().prop_map(|w| (ParamType::Int(256), Token::Int(U256(w)))),
			any::<bool>().prop_map(|b| (ParamType::Bool, Token::Bool(b))),
			any::<[u8; 32]>().prop_map(|b| (ParamType::FixedBytes(32), Token::FixedBytes(b.to_vec()))),
		]
	}

	proptest! {
		#[test]
		fn static_round_trip_is_exact(values in proptest::collection::vec(static_token(), 0..8)) {
			let (kinds, tokens): (Vec<_>, Vec<_>) = values.into_iter().unzip();
			let encoded = encode(&tokens);
			prop_assert_eq!(encoded.len(), 32 * tokens.len());
			let decoded = decode(&kinds, &encoded).unwrap();
			prop_assert_eq!(&encode(&decoded), &encoded);
			prop_assert_eq!(decoded, tokens);
		}
	}
}
