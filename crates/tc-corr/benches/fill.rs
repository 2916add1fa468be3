use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use tc_core::{Candidate, CorrelatorConfig};
use tc_corr::{CorrelationPair, assemble};
use tc_hist::BinEdges;

fn new_pair() -> CorrelationPair {
    CorrelationPair::new(
        "bench",
        CorrelatorConfig::default(),
        BinEdges::new(vec![0.0, 20.0, 40.0, 60.0, 80.0, 100.0]).unwrap(),
        BinEdges::new(vec![-10.0, -5.0, 0.0, 5.0, 10.0]).unwrap(),
    )
    .unwrap()
}

fn candidates(n: usize) -> Vec<Candidate> {
    (0..n)
        .map(|i| {
            let f = i as f64;
            Candidate::track(3.0 + f % 5.0, (f * 0.7) % 3.0, (f * 0.11) % 1.4 - 0.7)
        })
        .collect()
}

fn bench_fill(c: &mut Criterion) {
    let assoc = candidates(1_000);
    let trigger = Candidate::track(10.0, 0.3, 0.2);

    c.bench_function("triplet_fill_1k", |b| {
        let mut pair = new_pair();
        pair.same.set_mult_vz(45.0, 2.0).unwrap();
        b.iter(|| {
            for w in assoc.windows(2) {
                pair.same
                    .fill_triplet(Some(&trigger), Some(&w[0]), Some(&w[1]), 1.0)
                    .unwrap();
            }
            black_box(pair.same.registry().misfills())
        })
    });

    c.bench_function("trigger_check_1k", |b| {
        let mut pair = new_pair();
        pair.same.set_mult_vz(45.0, 2.0).unwrap();
        b.iter(|| {
            let mut accepted = 0usize;
            for cand in &assoc {
                if pair.same.check_trigger(cand, false).unwrap() {
                    accepted += 1;
                }
            }
            black_box(accepted)
        })
    });
}

fn bench_assemble(c: &mut Criterion) {
    let mut pair = new_pair();
    for i in 0..200usize {
        let f = i as f64;
        let half = if i % 3 == 0 {
            &mut pair.mixed
        } else {
            &mut pair.same
        };
        half.set_mult_vz((f * 37.0) % 100.0, (f * 53.0) % 20.0 - 10.0)
            .unwrap();
        let t = Candidate::track(10.0, (f * 0.7) % 3.0, (f * 0.11) % 1.4 - 0.7);
        half.fill_trigger(&t).unwrap();
        let a1 = Candidate::track(4.0, t.phi - 0.6, t.eta * 0.5 + 0.1);
        let a2 = Candidate::track(5.0, t.phi + 0.4, -t.eta * 0.5 - 0.15);
        half.fill_triplet(Some(&t), Some(&a1), Some(&a2), 1.0).unwrap();
    }

    c.bench_function("assemble_5x4_bins", |b| {
        b.iter(|| black_box(assemble(&pair, "floor").unwrap()))
    });
}

criterion_group!(benches, bench_fill, bench_assemble);
criterion_main!(benches);
