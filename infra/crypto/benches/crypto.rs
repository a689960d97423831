use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use passio_crypto::prelude::*;
use passio_crypto::Keyring;

fn bench_key_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive_keys");

    for backend in [Backend::Provider, Backend::Portable] {
        group.bench_with_input(BenchmarkId::new("pbkdf2_1000", backend), &backend, |b, &be| {
            b.iter(|| Keyring::derive(be, b"bench master password", 1000).unwrap());
        });
    }

    group.finish();
}

fn bench_encrypt_decrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope");
    let runtime = tokio::runtime::Runtime::new().unwrap();

    for backend in [BackendPreference::Provider, BackendPreference::Portable] {
        let service = EncryptionService::builder()
            .password("bench master password")
            .backend(backend)
            .build()
            .unwrap();
        runtime.block_on(service.init()).unwrap();

        for (label, count) in [("10_entries", 10usize), ("1000_entries", 1000)] {
            let document: Vec<String> = (0..count).map(|i| format!("entry-{i:05}")).collect();
            let envelope = service.encrypt(&document).unwrap();
            group.throughput(Throughput::Bytes(envelope.len() as u64));

            let id = format!("{backend:?}/{label}");
            group.bench_with_input(BenchmarkId::new("encrypt", &id), &document, |b, d| {
                b.iter(|| service.encrypt(d).unwrap());
            });
            group.bench_with_input(BenchmarkId::new("decrypt", &id), &envelope, |b, e| {
                b.iter(|| service.decrypt::<Vec<String>>(e).unwrap());
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_key_derivation, bench_encrypt_decrypt);
criterion_main!(benches);
