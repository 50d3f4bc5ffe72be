use annvm::backend::MemoryBackend;
use annvm::gasometer::CostTable;
use annvm::{CallContext, Config, Machine};
use criterion::{criterion_group, criterion_main, Criterion};
use primitive_types::H160;

// PUSH2 0x0fff JUMPDEST PUSH1 1 SWAP1 SUB DUP1 PUSH1 3 JUMPI STOP
const LOOP: &str = "610fff5b600190038060035700";

fn run_loop(machine: &Machine, backend: &MemoryBackend, code: &[u8]) {
	let context = CallContext::new(H160::from_low_u64_be(1), machine.config().gas_limit);
	let outcome = machine
		.call(backend, &context, H160::from_low_u64_be(2), Vec::new(), code.to_vec())
		.unwrap();
	assert!(outcome.output.is_empty());
}

fn criterion_benchmark(c: &mut Criterion) {
	let code = hex::decode(LOOP).unwrap();
	let backend = MemoryBackend::default();

	let unmetered = Machine::new(Config::annchain(), CostTable::unmetered());
	c.bench_function("loop unmetered", |b| {
		b.iter(|| run_loop(&unmetered, &backend, &code))
	});

	let metered = Machine::new(Config::annchain(), CostTable::new(1).with_uniform_cost(3));
	c.bench_function("loop metered", |b| {
		b.iter(|| run_loop(&metered, &backend, &code))
	});
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
