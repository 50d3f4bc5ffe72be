//! annvm: a deterministic contract machine.
//!
//! A [`Machine`] runs creation and call requests against a read-only
//! [`backend::Backend`], dispatching precompiled contracts natively and
//! everything else through the first compatible [`interpreter::Interpreter`].
//! The [`abi`] codec and the [`client`] helpers translate JSON arguments and
//! results to and from call data.

#![forbid(unsafe_code)]

extern crate alloc;

pub use annvm_abi as abi;
pub use annvm_gasometer as gasometer;
pub use annvm_runtime::*;

pub mod address;
pub mod backend;
pub mod client;
pub mod executor;
pub mod interpreter;
pub mod precompile;
pub mod signature;

mod error;
mod machine;

pub use crate::error::Error;
pub use crate::machine::{CallContext, CallOutcome, CreateOutcome, Machine};
