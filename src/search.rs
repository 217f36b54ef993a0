//! Correction search (C6) and dual-path reconciliation (C7): a best-first
//! bounded search over an edit graph scored against the k-mer consensus
//! table, producing a corrected sequence and per-base quality.

use ahash::AHashMap;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::cell::{TipRecord, NOHIT_PEN, Q_MAX};
use crate::kmer::append_to_kmer;
use crate::read::{BaseState, EcBase, EcSeq};
use crate::options::CorrectOptions;
use crate::store::KmerStore;

#[derive(Debug, Clone, Copy)]
struct StackEntry {
    parent: i64,
    i: usize,
    base: u8,
    qual: u8,
    state: BaseState,
    penalty: i32,
}

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    penalty: i32,
    stack_idx: i64,
    kmer: [u64; 2],
    i: usize,
    state: BaseState,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.penalty == other.penalty
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    /// Reversed so [`BinaryHeap`] (a max-heap) pops the *smallest* penalty
    /// first, matching the reference implementation's min-heap.
    fn cmp(&self, other: &Self) -> Ordering {
        other.penalty.cmp(&self.penalty)
    }
}

/// Per-worker reusable scratch bundle: heap, stack, lookup cache, and a
/// seeded RNG. Cleared (not reallocated) between reads, per §5's memory
/// discipline.
pub struct SearchAux {
    heap: BinaryHeap<HeapEntry>,
    stack: Vec<StackEntry>,
    cache: AHashMap<u64, Option<TipRecord>>,
    tmp: [EcSeq; 2],
}

impl Default for SearchAux {
    fn default() -> Self {
        SearchAux {
            heap: BinaryHeap::new(),
            stack: Vec::new(),
            cache: AHashMap::with_capacity(4096),
            tmp: [EcSeq::default(), EcSeq::default()],
        }
    }
}

impl SearchAux {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Look up the tip record for `kmer` (a `[forward, revcomp]` 2-bit-packed
/// pair), memoizing in `cache` for the remainder of this read (§4.3).
fn cached_lookup(store: &KmerStore, k: u32, cache: &mut AHashMap<u64, Option<TipRecord>>, kmer: [u64; 2]) -> Option<TipRecord> {
    let which = if crate::kmer::is_forward_canonical(k, kmer[0]) { 0 } else { 1 };
    *cache.entry(kmer[which]).or_insert_with(|| {
        let suf_len = store.suf_len;
        let mask = (1u64 << (suf_len << 1)) - 1;
        let shard = (kmer[which] & mask) as usize;
        let key = kmer[which] >> (suf_len << 1);
        store.lookup(shard, key).map(|cell| if which == 0 { cell.right_tip() } else { cell.left_tip() })
    })
}

fn push(k: u32, aux: &mut SearchAux, parent: &HeapEntry, base: u8, state: BaseState, penalty: i32, qual: u8) {
    let cumulative = parent.penalty + penalty;
    aux.stack.push(StackEntry { parent: parent.stack_idx, i: parent.i, base, qual, state, penalty: cumulative });
    let stack_idx = aux.stack.len() as i64 - 1;
    let mut kmer = parent.kmer;
    if state != BaseState::D {
        append_to_kmer(k, &mut kmer, base);
    }
    let i = if state == BaseState::I { parent.i } else { parent.i + 1 };
    aux.heap.push(HeapEntry { penalty: cumulative, stack_idx, kmer, i, state });
}

/// One direction of the best-first search (§4.5). Operates on `seq` in
/// place; returns `true` if at least one full-length path was found and the
/// sequence was rewritten.
fn correct_one_direction(opt: &CorrectOptions, store: &KmerStore, aux: &mut SearchAux, seq: &mut EcSeq, rng: &mut ChaCha8Rng) -> bool {
    aux.heap.clear();
    aux.stack.clear();
    aux.cache.clear();

    let k = opt.k;
    let mut kmer = [0u64; 2];
    let mut run = 0u32;
    let mut i0 = seq.len();
    for (i, b) in seq.0.iter().enumerate() {
        if b.b > 3 {
            run = 0;
            kmer = [0, 0];
        } else {
            run += 1;
            append_to_kmer(k, &mut kmer, b.b);
            if run == k {
                i0 = i + 1;
                break;
            }
        }
    }
    if i0 == seq.len() && run < k {
        return false;
    }

    aux.heap.push(HeapEntry { penalty: 0, stack_idx: -1, kmer, i: i0, state: BaseState::M });

    let mut path_end = [-1i64, -1i64];
    let mut max_i = 0usize;

    while let Some(z) = aux.heap.pop() {
        if path_end[0] >= 0 {
            let p_star = aux.stack[path_end[0] as usize].penalty;
            if z.penalty > p_star + opt.max_penalty_diff {
                break;
            }
        }
        if z.i == seq.len() {
            if path_end[0] < 0 {
                path_end[0] = z.stack_idx;
                continue;
            } else {
                path_end[1] = z.stack_idx;
                break;
            }
        }

        let c = seq.0[z.i];
        max_i = max_i.max(z.i);
        let is_excessive = aux.heap.len() >= max_i * if opt.gap_penalty > 0 { 5 } else { 2 };

        let tip = cached_lookup(store, k, &mut aux.cache, z.kmer);
        match tip {
            None => {
                let base = if c.b < 4 { c.b } else { rng.gen_range(0..4) };
                push(k, aux, &z, base, BaseState::N, NOHIT_PEN, c.q);
            }
            Some(tip) => {
                let b1 = tip.b1();
                let b2 = tip.b2_or_absent();
                let q1 = tip.q1();
                let q2 = tip.q2();
                if c.b == b1 {
                    push(k, aux, &z, b1, BaseState::M, 0, (c.q as i32 + q1 as i32).min(Q_MAX as i32) as u8);
                } else if c.b > 3 {
                    push(k, aux, &z, b1, BaseState::M, 3, q1);
                    if b2 < 4 && !is_excessive {
                        push(k, aux, &z, b2, BaseState::M, q1 as i32, 0);
                    }
                } else if b2 >= 4 || b2 == c.b {
                    let diff = c.q as i32 - q1 as i32;
                    if !is_excessive || q1 as i32 <= c.q as i32 {
                        push(k, aux, &z, c.b, BaseState::M, q1 as i32, diff.max(0) as u8);
                    }
                    if !is_excessive || q1 as i32 >= c.q as i32 {
                        push(k, aux, &z, b1, BaseState::M, c.q as i32, if diff > 0 { 0 } else { (-diff) as u8 });
                    }
                    if opt.gap_penalty > 0 && z.i < seq.len() - 1 && !is_excessive {
                        let gap_qual = if diff > 0 { 0 } else { (-diff) as u8 };
                        if z.state != BaseState::D {
                            push(k, aux, &z, b1, BaseState::I, opt.gap_penalty, gap_qual);
                        }
                        if z.state != BaseState::I {
                            push(k, aux, &z, b1, BaseState::D, opt.gap_penalty, gap_qual);
                        }
                    }
                } else {
                    let diff = c.q as i32 - (q1 as i32 + q2 as i32);
                    if !is_excessive || (q1 as i32 + q2 as i32) <= c.q as i32 {
                        push(k, aux, &z, c.b, BaseState::M, q1 as i32 + q2 as i32, diff.max(0) as u8);
                    }
                    if !is_excessive || (q1 as i32 + q2 as i32) >= c.q as i32 {
                        let qual = if diff > 0 { 0 } else { (-diff).min(q1 as i32) as u8 };
                        push(k, aux, &z, b1, BaseState::M, c.q as i32, qual);
                    }
                    if !is_excessive {
                        push(k, aux, &z, b2, BaseState::M, c.q.max(q1) as i32, 0);
                    }
                    if opt.gap_penalty > 0 && z.i < seq.len() - 1 && !is_excessive {
                        let qual = if diff > 0 { 0 } else { (-diff).min(q1 as i32) as u8 };
                        if z.state != BaseState::D {
                            push(k, aux, &z, b1, BaseState::I, opt.gap_penalty, qual);
                        }
                        if z.state != BaseState::I {
                            push(k, aux, &z, b1, BaseState::D, opt.gap_penalty, qual);
                        }
                    }
                }
            }
        }
    }

    if path_end[0] < 0 {
        return false;
    }
    let (tmp0, tmp1) = aux.tmp.split_at_mut(1);
    backtrack(&aux.stack, path_end[0], seq, &mut tmp0[0]);
    if path_end[1] >= 0 {
        backtrack(&aux.stack, path_end[1], seq, &mut tmp1[0]);
        let diff = aux.stack[path_end[1] as usize].penalty - aux.stack[path_end[0] as usize].penalty;
        reconcile(diff, &mut tmp0[0], &tmp1[0]);
    }
    seq.0.clear();
    seq.0.extend_from_slice(&tmp0[0].0);
    true
}

/// Walk the stack from `start` back to the (virtual) root, emitting a base
/// record for every step whose state isn't `D`, then prepend the untouched
/// input prefix before the first consensus-anchored position and reverse
/// into forward order (§4.5 "Backtrack").
fn backtrack(stack: &[StackEntry], start: i64, original: &EcSeq, out: &mut EcSeq) {
    out.0.clear();
    let mut idx = start;
    let mut last = 0usize;
    while idx >= 0 {
        let p = stack[idx as usize];
        if p.state != BaseState::D {
            out.0.push(EcBase {
                b: p.base,
                q: p.qual.min(Q_MAX),
                state: p.state,
                origin_index: original.0[p.i].origin_index,
            });
        }
        last = p.i;
        idx = p.parent;
    }
    for i in (0..last).rev() {
        out.0.push(original.0[i]);
    }
    out.0.reverse();
}

/// Merge a best path `s1` and second-best path `s2` (§4.6): where the two
/// disagree, clamp `s1`'s quality to the margin between them.
fn reconcile(diff: i32, s1: &mut EcSeq, s2: &EcSeq) {
    let diff = diff.max(0) as u8;
    let mut i1 = 0usize;
    let mut i2 = 0usize;
    while i1 < s1.len() && i2 < s2.len() {
        let b2 = s2.0[i2];
        {
            let b1 = &mut s1.0[i1];
            if b1.b != b2.b || b1.origin_index != b2.origin_index {
                b1.q = b1.q.saturating_sub(b2.q).min(diff);
            }
        }
        let b1_is_i = s1.0[i1].state == BaseState::I;
        let b2_is_i = b2.state == BaseState::I;
        if b1_is_i && !b2_is_i {
            i1 += 1;
        } else if b2_is_i && !b1_is_i {
            i2 += 1;
        } else {
            i1 += 1;
            i2 += 1;
        }
    }
    for b1 in s1.0[i1..].iter_mut() {
        b1.q = b1.q.min(diff);
    }
}

/// Correct one read in place: forward pass, then reverse-complemented pass,
/// then flip back (§4.5 "Two-pass"). The RNG is seeded per-read from `seed`
/// (a hash of the read's name, or its batch index as a fallback) so
/// `N`-tie-breaks are deterministic and reverse-complement-symmetric
/// regardless of thread assignment (§4.5 expansion).
pub fn correct_read(opt: &CorrectOptions, store: &KmerStore, aux: &mut SearchAux, seq: &mut EcSeq, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    correct_one_direction(opt, store, aux, seq, &mut rng);
    seq.reverse_complement();
    correct_one_direction(opt, store, aux, seq, &mut rng);
    seq.reverse_complement();
}
