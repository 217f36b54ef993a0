//! K-mer collector (C3): DFS the index oracle to depth `k`, emitting packed
//! cells for every k-mer occurring at least `min_occ` times.
//!
//! The traversal is split into two phases, mirroring the parallelism unit
//! used by the reference implementation:
//!
//! 1. **Shard-seed enumeration**: extend the oracle's root interval rightward
//!    (`forward = true`) for `suf_len` steps, visiting every possible
//!    `suf_len`-length suffix. This produces `4^suf_len` seed intervals,
//!    indexed by the bits chosen along the way (built via the same
//!    left-to-right rolling convention as [`crate::kmer::append_to_kmer`]):
//!    this index is exactly the canonical k-mer's low `2*suf_len` bits, i.e.
//!    its *shard*.
//! 2. **Per-seed continuation**: starting from a shard seed, prepend
//!    (`forward = false`) the remaining `k - suf_len` bases one at a time,
//!    pruning any branch whose count drops below `min_occ`. Each prepended
//!    base is placed at a step-indexed bit slot (not rolled), which is what
//!    makes the *first*-prepended bases (adjacent to the shard) land in the
//!    *low* bits of the resulting key and the *last*-prepended base
//!    (position 0 of the k-mer) land in the high bits — exactly the
//!    complement of the shard's bit range, so concatenating the two
//!    reproduces what a single rolling `append_to_kmer` pass over the whole
//!    k-mer would have produced.
//!
//! At the absolute depth equal to `k / 2` (the position that will become the
//! k-mer's middle base), the continuation only explores bases `{A, C}`
//! rather than all four — this is the canonicalization pruning described in
//! §4.2: every canonical k-mer (middle base `< 2`) is visited through
//! exactly one path, and its reverse complement is never generated.

use crate::cell::{counts_to_tip, Cell};
use crate::oracle::{IndexOracle, Interval};
use crate::quality::QualityTables;
use rayon::prelude::*;

/// Child counts `[_, count(A), count(C), count(G), count(T)]`, indexed to
/// match [`IndexOracle::extend`]'s one-indexed convention.
fn children_counts(children: &[Interval; 6]) -> [u64; 5] {
    [0, children[1].count, children[2].count, children[3].count, children[4].count]
}

struct SeedFrame {
    interval: Interval,
    depth: u32,
    code: u32,
}

/// Enumerate all `4^suf_len` shard seeds. Seeds whose interval never occurs
/// in the index (count stays 0 along the way) are left as an empty
/// [`Interval`] (count 0); callers should skip those — they contribute no
/// k-mers regardless of `min_occ`.
pub fn enumerate_shard_seeds(oracle: &dyn IndexOracle, suf_len: u32) -> Vec<Interval> {
    let n = 1usize << (suf_len * 2);
    let mut seeds = vec![Interval::empty(); n];
    let mut stack = vec![SeedFrame { interval: oracle.root(), depth: 0, code: 0 }];
    while let Some(top) = stack.pop() {
        if top.depth == suf_len {
            seeds[top.code as usize] = top.interval;
            continue;
        }
        let children = oracle.extend(top.interval, true);
        for c in 1..=4u8 {
            let child = children[c as usize];
            if child.count == 0 {
                continue;
            }
            stack.push(SeedFrame {
                interval: child,
                depth: top.depth + 1,
                code: (top.code << 2) | (c as u32 - 1),
            });
        }
    }
    seeds
}

struct ContFrame {
    interval: Interval,
    depth: u32,
    key_code: u64,
}

/// Collect the packed cells reachable from one shard seed, to depth
/// `k - suf_len` beyond it. Returns the raw `u64` cells for this shard only
/// (a full cell list is built, then handed to [`crate::store`] for hash-set
/// construction).
pub fn collect_shard(
    oracle: &dyn IndexOracle,
    tables: &QualityTables,
    k: u32,
    suf_len: u32,
    min_occ: u64,
    seed: Interval,
) -> Vec<u64> {
    if seed.count == 0 {
        return Vec::new();
    }
    let depth_target = k - suf_len;
    let mid_abs_depth = k / 2;
    let mut out = Vec::new();
    let mut stack = vec![ContFrame { interval: seed, depth: 0, key_code: 0 }];
    while let Some(top) = stack.pop() {
        if top.depth == depth_target {
            let right = children_counts(&oracle.extend(top.interval, true));
            let right_tip = counts_to_tip(&tables.sym, &tables.asym, right);
            let left = children_counts(&oracle.extend(top.interval, false));
            let left_tip = counts_to_tip(&tables.sym, &tables.asym, left);
            out.push(Cell::pack(top.key_code, left_tip, right_tip).raw());
            continue;
        }
        let abs_depth_before = suf_len + top.depth;
        let max_base = if abs_depth_before == mid_abs_depth { 2 } else { 4 };
        let children = oracle.extend(top.interval, false);
        for c in 1..=max_base {
            let child = children[c as usize];
            if child.count < min_occ {
                continue;
            }
            let step = top.depth + 1;
            let key_code = top.key_code | (((c - 1) as u64) << ((step - 1) * 2));
            stack.push(ContFrame { interval: child, depth: step, key_code });
        }
    }
    out
}

/// Collect every shard's cell list in parallel, one `rayon` task per shard
/// seed (§5: "Collection: one task per shard seed"). The quality tables are
/// shared read-only across tasks.
pub fn collect_all(
    oracle: &dyn IndexOracle,
    tables: &QualityTables,
    k: u32,
    suf_len: u32,
    min_occ: u64,
) -> Vec<Vec<u64>> {
    let seeds = enumerate_shard_seeds(oracle, suf_len);
    seeds
        .into_par_iter()
        .map(|seed| collect_shard(oracle, tables, k, suf_len, min_occ, seed))
        .collect()
}
