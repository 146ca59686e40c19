//! Benchmarks for the hot paths of a generation run: the four-layer
//! variable merge and the compose fragment merger.

use criterion::{criterion_group, criterion_main, Criterion};
use serde_yaml::{Mapping, Value};

use homelabctl::compose::merge_compose_files;
use homelabctl::stacks::variables::merge_variables;

fn layer(prefix: &str, keys: usize) -> Mapping {
    let mut mapping = Mapping::new();
    for i in 0..keys {
        let mut service = Mapping::new();
        service.insert(Value::from("image"), Value::from(format!("{prefix}{i}:latest")));
        service.insert(Value::from("port"), Value::from(8000 + i as u64));
        mapping.insert(Value::from(format!("svc{i}")), Value::Mapping(service));
    }
    mapping
}

fn bench_variable_merge(c: &mut Criterion) {
    let defaults = layer("default", 4);
    let stack = layer("stack", 32);
    let inventory = layer("inventory", 16);
    let secrets = layer("secret", 8);

    c.bench_function("merge_variables_32_services", |b| {
        b.iter(|| merge_variables(&defaults, &stack, &inventory, &secrets))
    });
}

fn bench_compose_merge(c: &mut Criterion) {
    let dir = tempfile::TempDir::new().unwrap();
    let files: Vec<_> = (0..16)
        .map(|i| {
            let path = dir.path().join(format!("{i}-compose.yml"));
            std::fs::write(
                &path,
                format!(
                    "services:\n  svc{i}:\n    image: app{i}:latest\n\
                     volumes:\n  shared: {{}}\nnetworks:\n  proxy:\n    external: true\n"
                ),
            )
            .unwrap();
            path
        })
        .collect();

    c.bench_function("merge_compose_16_fragments", |b| {
        b.iter(|| merge_compose_files(&files).unwrap())
    });
}

criterion_group!(benches, bench_variable_merge, bench_compose_merge);
criterion_main!(benches);
