use crate::{ExitError, ExitFatal, ExitReason, Opcode};
use thiserror::Error;

/// Failure of a top-level create or call, or of the client helpers around
/// them.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum Error {
	#[error("invalid opcode {0:?}")]
	InvalidOpcode(Opcode),
	#[error("stack underflow")]
	StackUnderflow,
	#[error("stack overflow")]
	StackOverflow,
	#[error("out of gas")]
	OutOfGas,
	#[error("invalid jump destination")]
	InvalidJumpDestination,
	#[error("write protection")]
	WriteProtection,
	#[error("execution reverted")]
	ExecutionReverted(Vec<u8>),
	#[error("no compatible interpreter")]
	NoCompatibleInterpreter,
	#[error("max call depth exceeded")]
	CallDepthExceeded,
	#[error("invalid address: {0}")]
	InvalidAddress(String),
	#[error("invalid bytecode: {0}")]
	InvalidBytecode(String),
	#[error("invalid call document: {0}")]
	InvalidDocument(String),
	#[error("invalid signing key")]
	InvalidKey,
	#[error("execution failed: {0:?}")]
	Exit(ExitError),
	#[error("fatal error: {0:?}")]
	Fatal(ExitFatal),
	#[error(transparent)]
	Abi(#[from] annvm_abi::Error),
}

impl From<ExitError> for Error {
	fn from(error: ExitError) -> Self {
		match error {
			ExitError::InvalidOpcode(opcode) => Error::InvalidOpcode(opcode),
			ExitError::StackUnderflow => Error::StackUnderflow,
			ExitError::StackOverflow => Error::StackOverflow,
			ExitError::OutOfGas => Error::OutOfGas,
			ExitError::InvalidJump => Error::InvalidJumpDestination,
			ExitError::WriteProtection => Error::WriteProtection,
			ExitError::NoCompatibleInterpreter => Error::NoCompatibleInterpreter,
			ExitError::CallTooDeep => Error::CallDepthExceeded,
			other => Error::Exit(other),
		}
	}
}

impl Error {
	/// Map a frame's exit reason to a result. Reverts carry the frame output.
	pub fn check(reason: ExitReason, output: &[u8]) -> Result<(), Error> {
		match reason {
			ExitReason::Succeed(_) => Ok(()),
			ExitReason::Revert(_) => Err(Error::ExecutionReverted(output.to_vec())),
			ExitReason::Error(e) => Err(e.into()),
			ExitReason::Fatal(e) => Err(Error::Fatal(e)),
		}
	}

	/// Reason string of a reverted execution, if the output is an
	/// `Error(string)` payload.
	pub fn revert_reason(&self) -> Option<String> {
		match self {
			Error::ExecutionReverted(data) => annvm_abi::decode_revert_reason(data),
			_ => None,
		}
	}
}
