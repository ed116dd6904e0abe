use criterion::{black_box, criterion_group, criterion_main, Criterion};
use restnet::codec::registry::CodecRegistry;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct Payload {
    id: u64,
    name: String,
    tags: Vec<String>,
}

fn sample() -> Payload {
    Payload {
        id: 42,
        name: "benchmark payload".to_string(),
        tags: vec!["alpha".into(), "beta".into(), "gamma".into()],
    }
}

fn benchmark_registry_lookup(c: &mut Criterion) {
    let registry = CodecRegistry::with_defaults();
    c.bench_function("codec_registry_lookup", |b| {
        b.iter(|| black_box(registry.get(black_box("application/json"))))
    });
}

fn benchmark_json_roundtrip(c: &mut Criterion) {
    let registry = CodecRegistry::with_defaults();
    let payload = sample();
    let encoded = registry.encode_body("application/json", &payload).unwrap();

    c.bench_function("json_encode", |b| {
        b.iter(|| black_box(registry.encode_body("application/json", &payload).unwrap()))
    });
    c.bench_function("json_decode", |b| {
        b.iter(|| {
            let decoded: Payload = registry
                .decode_body("application/json", black_box(&encoded))
                .unwrap();
            black_box(decoded)
        })
    });
}

fn benchmark_xml_decode(c: &mut Criterion) {
    let registry = CodecRegistry::with_defaults();
    let encoded = registry.encode_body("application/xml", &sample()).unwrap();

    c.bench_function("xml_decode", |b| {
        b.iter(|| {
            let decoded: Payload = registry
                .decode_body("application/xml", black_box(&encoded))
                .unwrap();
            black_box(decoded)
        })
    });
}

criterion_group!(
    benches,
    benchmark_registry_lookup,
    benchmark_json_roundtrip,
    benchmark_xml_decode
);
criterion_main!(benches);
