use super::Control;
use crate::{CallScheme, Context, CreateScheme, Handler, Runtime};
use alloc::vec::Vec;
use annvm_core::{ExitError, ExitFatal, ExitReason};
use core::cmp::min;
use log::trace;
use primitive_types::{H256, U256};
use sha3::{Digest, Keccak256};

pub fn sha3(runtime: &mut Runtime) -> Control {
	pop_u256!(runtime.machine, from, len);

	try_or_fail!(runtime.machine.memory_mut().resize_offset(from, len));
	let data = if len == U256::zero() {
		Vec::new()
	} else {
		let from = as_usize_or_fail!(from);
		let len = as_usize_or_fail!(len);

		runtime.machine.memory_mut().get(from, len)
	};

	let ret = Keccak256::digest(data.as_slice());
	push_h256!(runtime.machine, H256::from_slice(ret.as_slice()));

	Control::Continue
}

pub fn address(runtime: &mut Runtime) -> Control {
	let ret = H256::from(runtime.context.address);
	push_h256!(runtime.machine, ret);

	Control::Continue
}

pub fn caller(runtime: &mut Runtime) -> Control {
	let ret = H256::from(runtime.context.caller);
	push_h256!(runtime.machine, ret);

	Control::Continue
}

pub fn callvalue(runtime: &mut Runtime) -> Control {
	let value = runtime.context.apparent_value;
	push_u256!(runtime.machine, value);

	Control::Continue
}

pub fn extcodesize<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control {
	pop_h256!(runtime.machine, address);
	push_u256!(runtime.machine, handler.code_size(address.into()));

	Control::Continue
}

pub fn extcodehash<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control {
	pop_h256!(runtime.machine, address);
	push_h256!(runtime.machine, handler.code_hash(address.into()));

	Control::Continue
}

pub fn extcodecopy<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control {
	pop_h256!(runtime.machine, address);
	pop_u256!(runtime.machine, memory_offset, code_offset, len);

	try_or_fail!(runtime
		.machine
		.memory_mut()
		.resize_offset(memory_offset, len));
	match runtime.machine.memory_mut().copy_large(
		memory_offset,
		code_offset,
		len,
		&handler.code(address.into()),
	) {
		Ok(()) => (),
		Err(e) => return Control::Exit(e.into()),
	};

	Control::Continue
}

pub fn returndatasize(runtime: &mut Runtime) -> Control {
	let size = U256::from(runtime.return_data_buffer.len());
	push_u256!(runtime.machine, size);

	Control::Continue
}

pub fn returndatacopy(runtime: &mut Runtime) -> Control {
	pop_u256!(runtime.machine, memory_offset, data_offset, len);

	try_or_fail!(runtime
		.machine
		.memory_mut()
		.resize_offset(memory_offset, len));
	if data_offset
		.checked_add(len)
		.map(|l| l > U256::from(runtime.return_data_buffer.len()))
		.unwrap_or(true)
	{
		return Control::Exit(ExitError::OutOfOffset.into());
	}

	match runtime.machine.memory_mut().copy_large(
		memory_offset,
		data_offset,
		len,
		&runtime.return_data_buffer,
	) {
		Ok(()) => Control::Continue,
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn sload<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control {
	pop_h256!(runtime.machine, index);
	let value = handler.storage(runtime.context.address, index);
	push_h256!(runtime.machine, value);

	trace!(
		"SLOAD {:?} [{:?}] = {:?}",
		runtime.context.address,
		index,
		value
	);

	Control::Continue
}

pub fn sstore<H: Handler>(runtime: &mut Runtime, handler: &mut H) -> Control {
	pop_h256!(runtime.machine, index, value);

	trace!(
		"SSTORE {:?} [{:?}] = {:?}",
		runtime.context.address,
		index,
		value
	);

	match handler.set_storage(runtime.context.address, index, value) {
		Ok(()) => Control::Continue,
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn gas<H: Handler>(runtime: &mut Runtime, handler: &H) -> Control {
	push_u256!(runtime.machine, handler.gas_left());

	Control::Continue
}

pub fn log<H: Handler>(runtime: &mut Runtime, n: u8, handler: &mut H) -> Control {
	pop_u256!(runtime.machine, offset, len);

	try_or_fail!(runtime.machine.memory_mut().resize_offset(offset, len));
	let data = if len == U256::zero() {
		Vec::new()
	} else {
		let offset = as_usize_or_fail!(offset);
		let len = as_usize_or_fail!(len);

		runtime.machine.memory().get(offset, len)
	};

	let mut topics = Vec::new();
	for _ in 0..(n as usize) {
		match runtime.machine.stack_mut().pop() {
			Ok(value) => {
				topics.push(value);
			}
			Err(e) => return Control::Exit(e.into()),
		}
	}

	match handler.log(runtime.context.address, topics, data) {
		Ok(()) => Control::Continue,
		Err(e) => Control::Exit(e.into()),
	}
}

pub fn create<H: Handler>(runtime: &mut Runtime, is_create2: bool, handler: &mut H) -> Control {
	runtime.return_data_buffer = Vec::new();

	pop_u256!(runtime.machine, value, code_offset, len);

	try_or_fail!(runtime.machine.memory_mut().resize_offset(code_offset, len));
	let code = if len == U256::zero() {
		Vec::new()
	} else {
		let code_offset = as_usize_or_fail!(code_offset);
		let len = as_usize_or_fail!(len);

		runtime.machine.memory().get(code_offset, len)
	};

	let scheme = if is_create2 {
		pop_h256!(runtime.machine, salt);
		let code_hash = H256::from_slice(Keccak256::digest(&code).as_slice());
		CreateScheme::Create2 {
			caller: runtime.context.address,
			salt,
			code_hash,
		}
	} else {
		CreateScheme::Legacy {
			caller: runtime.context.address,
		}
	};

	let (reason, address, return_data) =
		handler.create(runtime.context.address, scheme, value, code, None);
	runtime.return_data_buffer = return_data;
	let create_address: H256 = address.map(|a| a.into()).unwrap_or_default();

	match reason {
		ExitReason::Succeed(_) => {
			push_h256!(runtime.machine, create_address);
			Control::Continue
		}
		ExitReason::Revert(_) | ExitReason::Error(_) => {
			push_h256!(runtime.machine, H256::default());
			Control::Continue
		}
		ExitReason::Fatal(e) => {
			push_h256!(runtime.machine, H256::default());
			Control::Exit(e.into())
		}
	}
}

pub fn call<H: Handler>(runtime: &mut Runtime, scheme: CallScheme, handler: &mut H) -> Control {
	// Transferring value is a state change; reject it before touching the
	// stack.
	if scheme == CallScheme::Call && runtime.is_static {
		let value = try_or_fail!(runtime.machine.stack().peek(2));
		if value != H256::zero() {
			return Control::Exit(ExitError::WriteProtection.into());
		}
	}

	runtime.return_data_buffer = Vec::new();

	pop_u256!(runtime.machine, gas);
	pop_h256!(runtime.machine, to);
	let gas = if gas > U256::from(u64::MAX) {
		None
	} else {
		Some(gas.as_u64())
	};

	let value = match scheme {
		CallScheme::Call => {
			pop_u256!(runtime.machine, value);
			value
		}
		CallScheme::DelegateCall | CallScheme::StaticCall => U256::zero(),
	};

	pop_u256!(runtime.machine, in_offset, in_len, out_offset, out_len);

	try_or_fail!(runtime
		.machine
		.memory_mut()
		.resize_offset(in_offset, in_len));
	try_or_fail!(runtime
		.machine
		.memory_mut()
		.resize_offset(out_offset, out_len));

	let input = if in_len == U256::zero() {
		Vec::new()
	} else {
		let in_offset = as_usize_or_fail!(in_offset);
		let in_len = as_usize_or_fail!(in_len);

		runtime.machine.memory().get(in_offset, in_len)
	};

	let context = match scheme {
		CallScheme::Call | CallScheme::StaticCall => Context {
			address: to.into(),
			caller: runtime.context.address,
			apparent_value: value,
		},
		CallScheme::DelegateCall => Context {
			address: runtime.context.address,
			caller: runtime.context.caller,
			apparent_value: runtime.context.apparent_value,
		},
	};

	let is_static = runtime.is_static || scheme == CallScheme::StaticCall;
	let (reason, return_data) = handler.call(to.into(), input, gas, is_static, context);
	runtime.return_data_buffer = return_data;
	let target_len = min(out_len, U256::from(runtime.return_data_buffer.len()));

	match reason {
		ExitReason::Succeed(_) => {
			match runtime.machine.memory_mut().copy_large(
				out_offset,
				U256::zero(),
				target_len,
				&runtime.return_data_buffer[..],
			) {
				Ok(()) => {
					push_u256!(runtime.machine, U256::one());
					Control::Continue
				}
				Err(_) => {
					push_u256!(runtime.machine, U256::zero());
					Control::Continue
				}
			}
		}
		ExitReason::Revert(_) => {
			push_u256!(runtime.machine, U256::zero());

			let _ = runtime.machine.memory_mut().copy_large(
				out_offset,
				U256::zero(),
				target_len,
				&runtime.return_data_buffer[..],
			);

			Control::Continue
		}
		ExitReason::Error(_) => {
			push_u256!(runtime.machine, U256::zero());

			Control::Continue
		}
		ExitReason::Fatal(e) => {
			push_u256!(runtime.machine, U256::zero());

			Control::Exit(e.into())
		}
	}
}
