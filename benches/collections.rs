//! Container benchmarks
//!
//! Insert and lookup throughput for both containers on both strategies.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use zatar::{Allocator, HashTable, OrderedMap};

const SIZES: [u64; 3] = [100, 1_000, 10_000];

fn allocators() -> [(&'static str, Allocator); 2] {
    [
        ("heap", Allocator::heap()),
        ("region", Allocator::region(256 << 20).expect("region")),
    ]
}

fn bench_map_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("ordered_map_insert");

    for (name, mut alloc) in allocators() {
        for n in SIZES {
            group.bench_with_input(BenchmarkId::new(name, n), &n, |b, &n| {
                b.iter(|| {
                    {
                        let mut map = OrderedMap::new(&alloc);
                        for i in 0..n {
                            map.put(i.wrapping_mul(0x9E37_79B9), i).expect("put");
                        }
                        black_box(map.height());
                    }
                    alloc.reset();
                });
            });
        }
    }

    group.finish();
}

fn bench_table_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash_table_insert");

    for (name, mut alloc) in allocators() {
        for n in SIZES {
            group.bench_with_input(BenchmarkId::new(name, n), &n, |b, &n| {
                b.iter(|| {
                    {
                        let mut table = HashTable::new(&alloc);
                        for i in 0..n {
                            table.put(i, i).expect("put");
                        }
                        black_box(table.capacity());
                    }
                    alloc.reset();
                });
            });
        }
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let alloc = Allocator::heap();
    let n = 10_000u64;

    let mut map = OrderedMap::new(&alloc);
    let mut table = HashTable::new(&alloc);
    for i in 0..n {
        map.put(i, i).expect("put");
        table.put(i, i).expect("put");
    }

    c.bench_function("ordered_map_get_10k", |b| {
        b.iter(|| {
            for i in 0..n {
                black_box(map.get(&i));
            }
        });
    });

    c.bench_function("hash_table_get_10k", |b| {
        b.iter(|| {
            for i in 0..n {
                black_box(table.get(&i));
            }
        });
    });
}

criterion_group!(benches, bench_map_insert, bench_table_insert, bench_lookup);
criterion_main!(benches);
