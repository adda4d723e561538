use criterion::{black_box, criterion_group, criterion_main, Criterion};

use quizrun_core::aggregate::{score_percent, CelebrationPolicy, Tally};
use quizrun_core::scoring::score_answer;

fn bench_score_answer(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_answer");

    group.bench_function("correct_with_streak", |b| {
        b.iter(|| score_answer(black_box(true), black_box(4), black_box(17)))
    });

    group.bench_function("incorrect", |b| {
        b.iter(|| score_answer(black_box(false), black_box(4), black_box(17)))
    });

    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for size in [10u32, 100, 1000] {
        group.bench_function(format!("{size}_answers"), |b| {
            b.iter(|| {
                let mut tally = Tally::new();
                for i in 0..size {
                    let score = score_answer(i % 3 != 0, tally.streak, i % 30);
                    tally.record(&score);
                }
                tally.summarize(size, 70, CelebrationPolicy::OnPassWithSeventyPercentCorrect)
            })
        });
    }

    group.bench_function("score_percent", |b| {
        b.iter(|| {
            let mut acc = 0u32;
            for total in 1..=200u32 {
                for correct in 0..=total {
                    acc += u32::from(score_percent(black_box(correct), total));
                }
            }
            acc
        })
    });

    group.finish();
}

criterion_group!(benches, bench_score_answer, bench_aggregate);
criterion_main!(benches);
