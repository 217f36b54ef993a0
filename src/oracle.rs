//! The substring-index oracle: the one external collaborator this crate
//! treats as an opaque capability (§1, §9 "Dynamic dispatch").
//!
//! A production FMD-index plugs in by implementing [`IndexOracle`] directly
//! against its suffix-array intervals (no extra bookkeeping needed — a
//! bidirectional BWT interval is self-contained under LF-mapping). The
//! `naive_index` submodule ships a simple in-memory reference oracle used
//! only by tests and doctests: it is not meant to scale to real datasets,
//! and tracks the accumulated pattern out of band since a linear scan needs
//! the literal bytes rather than suffix-array coordinates.

/// A bidirectional substring-index interval, carrying the match count.
/// Implementations are free to interpret `lo`/`hi` however their underlying
/// structure requires (e.g. forward/reverse suffix-array bounds); the
/// collector only ever inspects `count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interval {
    pub lo: u64,
    pub hi: u64,
    pub count: u64,
}

impl Interval {
    pub fn empty() -> Self {
        Interval::default()
    }
}

/// The single primitive the core needs from a substring index: extend an
/// interval by one base in either direction, and report total size.
///
/// `extend` returns six child intervals: `[0]` unused, `[1..=4]` the
/// extension by base `A,C,G,T` (one-indexed so `t[c]` for `c in 1..=4` lines
/// up with the reference collector's convention), `[5]` reserved for a
/// terminator/ambiguity symbol. `forward` selects which side of the
/// bidirectional index is extended (`true` = append on the right, `false` =
/// prepend on the left).
pub trait IndexOracle: Sync {
    fn root(&self) -> Interval;
    fn extend(&self, interval: Interval, forward: bool) -> [Interval; 6];
    fn total_count(&self) -> u64;
}

/// A small, fully in-memory oracle over an explicit set of strings, useful
/// for tests and as documentation of the trait's contract. It performs a
/// linear scan per extension and is not intended for production-scale
/// indices (those are provided externally); the accumulated pattern is kept
/// in a side table indexed by `Interval::lo`.
pub mod naive_index {
    use super::*;
    use std::cell::RefCell;

    pub struct NaiveIndex {
        texts: Vec<Vec<u8>>,
        patterns: RefCell<Vec<Vec<u8>>>,
    }

    impl NaiveIndex {
        pub fn new(sequences: &[&str]) -> Self {
            NaiveIndex {
                texts: sequences.iter().map(|s| s.as_bytes().to_vec()).collect(),
                patterns: RefCell::new(vec![Vec::new()]),
            }
        }

        fn count_occurrences(&self, pattern: &[u8]) -> u64 {
            if pattern.is_empty() {
                return self.texts.iter().map(|t| t.len() as u64 + 1).sum();
            }
            let mut n = 0u64;
            for t in &self.texts {
                if t.len() < pattern.len() {
                    continue;
                }
                n += t.windows(pattern.len()).filter(|w| *w == pattern).count() as u64;
            }
            n
        }
    }

    impl IndexOracle for NaiveIndex {
        fn root(&self) -> Interval {
            let count = self.count_occurrences(&[]);
            Interval { lo: 0, hi: 0, count }
        }

        fn extend(&self, interval: Interval, forward: bool) -> [Interval; 6] {
            let base_pattern = self.patterns.borrow()[interval.lo as usize].clone();
            let mut out = [Interval::empty(); 6];
            for (slot, &base) in [b'A', b'C', b'G', b'T'].iter().enumerate() {
                let mut candidate = Vec::with_capacity(base_pattern.len() + 1);
                if forward {
                    candidate.extend_from_slice(&base_pattern);
                    candidate.push(base);
                } else {
                    candidate.push(base);
                    candidate.extend_from_slice(&base_pattern);
                }
                let count = self.count_occurrences(&candidate);
                let idx = {
                    let mut patterns = self.patterns.borrow_mut();
                    patterns.push(candidate);
                    patterns.len() as u64 - 1
                };
                out[slot + 1] = Interval { lo: idx, hi: 0, count };
            }
            out
        }

        fn total_count(&self) -> u64 {
            self.texts.iter().map(|t| t.len() as u64).sum()
        }
    }
}
