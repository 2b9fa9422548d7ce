use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use movetpl_bytecode::{deserialize, serialize, update_constants, update_identifiers, Module};

const FIXTURES: [(&str, &str); 3] = [
    ("pokemon", include_str!("../tests/fixtures/pokemon.hex")),
    ("coin_template", include_str!("../tests/fixtures/coin_template.hex")),
    ("u64_module", include_str!("../tests/fixtures/u64_module.hex")),
];

fn fixtures() -> Vec<(&'static str, Vec<u8>)> {
    FIXTURES
        .iter()
        .map(|(name, text)| (*name, hex::decode(text.trim()).unwrap()))
        .collect()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for (name, bytes) in fixtures() {
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &bytes, |b, bytes| {
            b.iter(|| Module::decode(black_box(bytes)).unwrap());
        });
    }

    group.finish();
}

fn bench_decode_verified(c: &mut Criterion) {
    let mut group = c.benchmark_group("deserialize");

    for (name, bytes) in fixtures() {
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &bytes, |b, bytes| {
            b.iter(|| deserialize(black_box(bytes)).unwrap());
        });
    }

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for (name, bytes) in fixtures() {
        let module = Module::decode(&bytes).unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::new("raw", name), &module, |b, module| {
            b.iter(|| black_box(module).encode());
        });
        group.bench_with_input(BenchmarkId::new("verified", name), &module, |b, module| {
            b.iter(|| serialize(black_box(module)).unwrap());
        });
    }

    group.finish();
}

fn bench_patch_coin_template(c: &mut Criterion) {
    let bytes = hex::decode(FIXTURES[1].1.trim()).unwrap();

    c.bench_function("rename_coin_template", |b| {
        b.iter(|| {
            update_identifiers(black_box(&bytes), [("TEMPLATE", "MCN"), ("template", "mcn")])
                .unwrap()
        });
    });

    c.bench_function("patch_coin_symbol", |b| {
        b.iter(|| {
            update_constants(black_box(&bytes), b"\x03MCN", b"\x04TMPL", "Vector(U8)").unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_decode,
    bench_decode_verified,
    bench_encode,
    bench_patch_coin_template
);
criterion_main!(benches);
