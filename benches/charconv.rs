//! Integer formatting and parsing throughput across the table-driven
//! bases.
//!
//! Run with:
//!   cargo bench --bench charconv

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use plinth::charconv::{from_chars, to_chars};

fn bench_to_chars(c: &mut Criterion) {
    let values: Vec<u64> = (0..4096u64).map(|i| i.wrapping_mul(0x9e3779b97f4a7c15)).collect();
    let mut group = c.benchmark_group("to_chars");
    group.throughput(Throughput::Elements(values.len() as u64));
    for &base in &[2u32, 8, 10, 16, 36] {
        group.bench_with_input(BenchmarkId::new("u64", base), &values, |b, values| {
            let mut buf = [0u8; 72];
            b.iter(|| {
                let mut total = 0usize;
                for &v in values {
                    total += to_chars(&mut buf, v, base);
                }
                total
            })
        });
    }
    group.finish();
}

fn bench_from_chars(c: &mut Criterion) {
    let mut group = c.benchmark_group("from_chars");
    for &base in &[2u32, 10, 16] {
        // pre-render the inputs
        let strings: Vec<Vec<u8>> = (0..4096u64)
            .map(|i| {
                let mut buf = [0u8; 72];
                let v = i.wrapping_mul(0x9e3779b97f4a7c15);
                let n = to_chars(&mut buf, v, base);
                buf[..n].to_vec()
            })
            .collect();
        group.throughput(Throughput::Elements(strings.len() as u64));
        group.bench_with_input(BenchmarkId::new("u64", base), &strings, |b, strings| {
            b.iter(|| {
                let mut sum = 0u64;
                for s in strings {
                    let mut v = 0u64;
                    let res = from_chars(s, &mut v, base);
                    assert!(res.ok);
                    sum = sum.wrapping_add(v);
                }
                sum
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_to_chars, bench_from_chars);
criterion_main!(benches);
