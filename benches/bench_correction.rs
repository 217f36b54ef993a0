use criterion::{criterion_group, criterion_main, Criterion};

use kcorrect::collect::collect_all;
use kcorrect::oracle::naive_index::NaiveIndex;
use kcorrect::oracle::{IndexOracle, Interval};
use kcorrect::quality::QualityTables;
use kcorrect::read::EcSeq;
use kcorrect::search::{correct_read, SearchAux};
use kcorrect::store::KmerStore;
use kcorrect::CorrectOptions;

struct PatternOracle<'a> {
    inner: &'a NaiveIndex,
}

impl<'a> IndexOracle for PatternOracle<'a> {
    fn root(&self) -> Interval {
        self.inner.root()
    }
    fn extend(&self, interval: Interval, forward: bool) -> [Interval; 6] {
        self.inner.extend(interval, forward)
    }
    fn total_count(&self) -> u64 {
        self.inner.total_count()
    }
}

fn bench_collect(c: &mut Criterion) {
    let seqs: Vec<&str> = vec!["ACGTACGTACGTACGTACGT"; 64];
    let idx = NaiveIndex::new(&seqs);
    let oracle = PatternOracle { inner: &idx };
    let tables = QualityTables::build(0.01, 0.05, 10.0, 0.99);
    c.bench_function("collect_all k=17 suf_len=1", |b| {
        b.iter(|| collect_all(&oracle, &tables, 17, 1, 2))
    });
}

fn bench_correct_read(c: &mut Criterion) {
    let seqs: Vec<&str> = vec!["ACGTACGTACGTACGTACGT"; 64];
    let idx = NaiveIndex::new(&seqs);
    let oracle = PatternOracle { inner: &idx };
    let tables = QualityTables::build(0.01, 0.05, 10.0, 0.99);
    let shards = collect_all(&oracle, &tables, 9, 1, 2);
    let store = KmerStore::build(9, 1, shards);
    let opt = CorrectOptions { k: 9, suf_len: 1, gap_penalty: 40, max_penalty_diff: 60, ..CorrectOptions::default() };
    let mut aux = SearchAux::new();

    c.bench_function("correct_read single substitution", |b| {
        b.iter(|| {
            let mut seq = EcSeq::convert(b"ACGTACCTACGTACGTACGT", Some(b"IIIIIIIIIIIIIIIIIIII"), 20);
            correct_read(&opt, &store, &mut aux, &mut seq, 1);
            seq
        })
    });
}

criterion_group!(benches, bench_collect, bench_correct_read);
criterion_main!(benches);
