use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use engine::{Engine, OpenOption};
use tempfile::tempdir;

const N_KEYS: usize = 1_000;
const VALUE_SIZE: usize = 100;

fn populated_engine() -> (tempfile::TempDir, Engine) {
    let dir = tempdir().unwrap();
    let engine = Engine::open(dir.path().join("store"), &[OpenOption::ReadWrite]).unwrap();
    for i in 0..N_KEYS {
        let key = format!("key{i}");
        engine.put(key.as_bytes(), &vec![b'x'; VALUE_SIZE]).unwrap();
    }
    (dir, engine)
}

fn put_benchmark(c: &mut Criterion) {
    c.bench_function("put_1k_keys", |b| {
        b.iter_batched(
            || {
                let dir = tempdir().unwrap();
                let engine =
                    Engine::open(dir.path().join("store"), &[OpenOption::ReadWrite]).unwrap();
                (dir, engine)
            },
            |(_dir, engine)| {
                for i in 0..N_KEYS {
                    let key = format!("key{i}");
                    engine.put(key.as_bytes(), &vec![b'x'; VALUE_SIZE]).unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn get_benchmark(c: &mut Criterion) {
    c.bench_function("get_hit_1k", |b| {
        b.iter_batched(
            populated_engine,
            |(_dir, engine)| {
                for i in 0..N_KEYS {
                    let key = format!("key{i}");
                    engine.get(key.as_bytes()).unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn merge_benchmark(c: &mut Criterion) {
    c.bench_function("merge_1k_keys", |b| {
        b.iter_batched(
            populated_engine,
            |(_dir, engine)| {
                engine.merge().unwrap();
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, put_benchmark, get_benchmark, merge_benchmark);
criterion_main!(benches);
