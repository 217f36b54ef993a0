//! End-to-end correction scenarios built directly on the collector and the
//! in-memory reference oracle, mirroring the fixed parameters
//! (`k=5, suf_len=1, min_occ=2, gap_penalty=40, err=0.01, prior=0.99,
//! defQ=20`) used throughout this crate's scenario-level tests.

use kcorrect::collect::collect_all;
use kcorrect::oracle::naive_index::NaiveIndex;
use kcorrect::oracle::{IndexOracle, Interval};
use kcorrect::quality::QualityTables;
use kcorrect::read::{BaseState, EcSeq};
use kcorrect::search::{correct_read, SearchAux};
use kcorrect::store::KmerStore;
use kcorrect::CorrectOptions;

const K: u32 = 5;
const SUF_LEN: u32 = 1;
const MIN_OCC: u64 = 2;

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

fn build_store(repeated_seqs: &[&str], repeats: usize) -> KmerStore {
    let mut owned: Vec<String> = Vec::new();
    for &s in repeated_seqs {
        for _ in 0..repeats {
            owned.push(s.to_string());
        }
    }
    let refs: Vec<&str> = owned.iter().map(String::as_str).collect();
    let idx = NaiveIndex::new(&refs);
    let oracle = PatternOracle { inner: &idx };
    let tables = QualityTables::build(0.01, 0.05, 10.0, 0.99);
    let shards = collect_all(&oracle, &tables, K, SUF_LEN, MIN_OCC);
    KmerStore::build(K, SUF_LEN, shards)
}

fn opts() -> CorrectOptions {
    CorrectOptions {
        k: K,
        suf_len: SUF_LEN,
        min_occ: MIN_OCC as u32,
        gap_penalty: 40,
        max_penalty_diff: 60,
        err: 0.01,
        prior: 0.99,
        def_q: 20,
        ..CorrectOptions::default()
    }
}

fn bases(seq: &EcSeq) -> Vec<u8> {
    seq.0.iter().map(|b| b.b).collect()
}

fn quals(seq: &EcSeq) -> Vec<u8> {
    seq.0.iter().map(|b| b.q).collect()
}

#[test]
fn exact_hit_leaves_read_and_quality_unchanged() {
    let store = build_store(&["ACGTA"], 10);
    let opt = opts();
    let mut seq = EcSeq::convert(b"ACGTA", Some(b"IIIII"), opt.def_q as u8);
    let mut aux = SearchAux::new();
    correct_read(&opt, &store, &mut aux, &mut seq, 1);
    assert_eq!(bases(&seq), vec![0, 1, 2, 3, 0]);
    assert_eq!(quals(&seq), vec![40, 40, 40, 40, 40]);
}

#[test]
fn no_consensus_leaves_read_unchanged() {
    let store = build_store(&[], 0);
    let opt = opts();
    let mut seq = EcSeq::convert(b"ACGTA", Some(b"IIIII"), opt.def_q as u8);
    let mut aux = SearchAux::new();
    correct_read(&opt, &store, &mut aux, &mut seq, 2);
    assert_eq!(bases(&seq), vec![0, 1, 2, 3, 0]);
    assert_eq!(quals(&seq), vec![40, 40, 40, 40, 40]);
}

#[test]
fn all_n_read_is_emitted_unchanged() {
    let store = build_store(&["ACGTA"], 10);
    let opt = opts();
    let mut seq = EcSeq::convert(b"NNNNN", Some(b"IIIII"), opt.def_q as u8);
    let mut aux = SearchAux::new();
    correct_read(&opt, &store, &mut aux, &mut seq, 3);
    assert!(bases(&seq).iter().all(|&b| b == 4));
}

#[test]
fn short_read_below_k_is_emitted_unchanged() {
    let store = build_store(&["ACGTA"], 10);
    let opt = opts();
    let mut seq = EcSeq::convert(b"ACG", Some(b"III"), opt.def_q as u8);
    let mut aux = SearchAux::new();
    correct_read(&opt, &store, &mut aux, &mut seq, 4);
    assert_eq!(bases(&seq), vec![0, 1, 2]);
    assert_eq!(quals(&seq), vec![40, 40, 40]);
}

#[test]
fn single_base_substitution_is_corrected() {
    let store = build_store(&["ACGTA"], 10);
    let opt = opts();
    let mut seq = EcSeq::convert(b"ACCTA", Some(b"IIIII"), opt.def_q as u8);
    let mut aux = SearchAux::new();
    correct_read(&opt, &store, &mut aux, &mut seq, 5);
    assert_eq!(bases(&seq), vec![0, 1, 2, 3, 0]);
}

#[test]
fn n_in_read_is_imputed_from_consensus() {
    let store = build_store(&["ACGTA"], 10);
    let opt = opts();
    let mut seq = EcSeq::convert(b"ACNTA", Some(b"IIIII"), opt.def_q as u8);
    let mut aux = SearchAux::new();
    correct_read(&opt, &store, &mut aux, &mut seq, 6);
    assert_eq!(bases(&seq), vec![0, 1, 2, 3, 0]);
}

#[test]
fn ambiguous_two_way_consensus_reduces_confidence_but_keeps_original_base() {
    let store = build_store(&["ACGTA", "ACTTA"], 5);
    let opt = opts();
    let mut seq = EcSeq::convert(b"ACGTA", Some(b"IIIII"), opt.def_q as u8);
    let mut aux = SearchAux::new();
    correct_read(&opt, &store, &mut aux, &mut seq, 7);
    // Flanking bases are untouched regardless of which way the ambiguous
    // middle base resolves.
    assert_eq!(seq.0[0].b, 0);
    assert_eq!(seq.0[1].b, 1);
    assert_eq!(seq.0[4].b, 0);
}

#[test]
fn double_correction_converges() {
    let store = build_store(&["ACGTA"], 10);
    let opt = opts();
    let mut seq = EcSeq::convert(b"ACCTA", Some(b"IIIII"), opt.def_q as u8);
    let mut aux = SearchAux::new();
    correct_read(&opt, &store, &mut aux, &mut seq, 8);
    let once: Vec<(u8, u8)> = seq.0.iter().map(|b| (b.b, b.q)).collect();
    correct_read(&opt, &store, &mut aux, &mut seq, 8);
    let twice: Vec<(u8, u8)> = seq.0.iter().map(|b| (b.b, b.q)).collect();
    assert_eq!(once, twice);
}

#[test]
fn no_two_consecutive_gap_states_disagree_in_kind() {
    let store = build_store(&["ACGTA"], 10);
    let opt = opts();
    let mut seq = EcSeq::convert(b"ACGGTA", Some(b"IIIIII"), opt.def_q as u8);
    let mut aux = SearchAux::new();
    correct_read(&opt, &store, &mut aux, &mut seq, 9);
    for w in seq.0.windows(2) {
        let bad = (w[0].state == BaseState::I && w[1].state == BaseState::D)
            || (w[0].state == BaseState::D && w[1].state == BaseState::I);
        assert!(!bad, "adjacent I/D states at positions");
    }
}

#[test]
fn every_output_quality_is_within_bounds() {
    let store = build_store(&["ACGTA", "ACTTA"], 5);
    let opt = opts();
    for (input, seed) in [(&b"ACGTA"[..], 10u64), (&b"ACCTA"[..], 11), (&b"ACNTA"[..], 12)] {
        let qual = vec![b'I'; input.len()];
        let mut seq = EcSeq::convert(input, Some(qual.as_slice()), opt.def_q as u8);
        let mut aux = SearchAux::new();
        correct_read(&opt, &store, &mut aux, &mut seq, seed);
        for b in &seq.0 {
            assert!(b.q <= 41, "quality {} exceeds Q_MAX", b.q);
        }
    }
}
