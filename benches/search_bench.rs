//! Performance benchmarks

use std::sync::atomic::{AtomicUsize, Ordering};

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use permsearch::algebra::{FieldBuilder, PolyRing, ONE};
use permsearch::search::{closure, is_permutation, ShiftClosure};
use permsearch::{Search, SearchConfig, SearchOptions};

static RUN: AtomicUsize = AtomicUsize::new(0);

fn benchmark_field(c: &mut Criterion) {
    c.bench_function("build_gf_256", |b| {
        b.iter(|| FieldBuilder::new(2, 8).seed(black_box(1)).build().unwrap());
    });

    let field = FieldBuilder::new(2, 8).seed(1).build().unwrap();
    let ring = PolyRing::new(&field);
    let ones = vec![ONE; field.order() as usize];
    let f = vec![1, 0, 3, 17, 0, 9, 0, 0];
    c.bench_function("is_permutation_gf_256_deg7", |b| {
        b.iter(|| is_permutation(&ring, black_box(&f), &ones).unwrap());
    });
    c.bench_function("closure_gf_256_deg7", |b| {
        b.iter(|| closure(&ring, black_box(&f), &[ONE], ShiftClosure::Polynomial).unwrap());
    });
}

fn benchmark_search(c: &mut Criterion) {
    let root = std::env::temp_dir().join(format!("permsearch-bench-{}", std::process::id()));
    c.bench_function("search_gf_4_frac_5_4", |b| {
        b.iter(|| {
            let dir = root.join(RUN.fetch_add(1, Ordering::Relaxed).to_string());
            std::fs::create_dir_all(&dir).unwrap();
            let mut config = SearchConfig::new(2, 2, 5, 4);
            config.seed = Some(1);
            let options = SearchOptions {
                output_dir: dir,
                ..SearchOptions::default()
            };
            Search::new(config, options).unwrap().run().unwrap()
        });
    });
    let _ = std::fs::remove_dir_all(&root);
}

criterion_group!(benches, benchmark_field, benchmark_search);
criterion_main!(benches);
