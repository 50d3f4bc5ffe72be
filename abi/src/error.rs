use thiserror::Error;

/// Codec errors. Every failure of packing or unpacking is reported through
/// one of these kinds; the codec never panics on user input.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum Error {
	#[error("no such method: {0}")]
	UnknownMethod(String),
	#[error("unmatched params: expected {expected} arguments, got {got}")]
	ArityMismatch { expected: usize, got: usize },
	#[error("cannot use {found} as {expected}")]
	TypeCoercion { expected: String, found: String },
	#[error("malformed return data: {0}")]
	MalformedReturnData(String),
	#[error("invalid type: {0}")]
	InvalidType(String),
	#[error("invalid abi definition: {0}")]
	InvalidDefinition(String),
}

pub type Result<T> = std::result::Result<T, Error>;
