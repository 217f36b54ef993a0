//! Batch correction driver (C8): dispatches each read to the correction
//! search in parallel, preserving input order in the output, and renders
//! the result as FASTQ.

use std::hash::{Hash, Hasher};

use ahash::AHasher;
use rayon::prelude::*;
use tracing::debug;

use crate::diag::Diagnostics;
use crate::io::SeqRecord;
use crate::kmer::base_to_ascii;
use crate::options::CorrectOptions;
use crate::read::{BaseState, EcSeq};
use crate::search::{correct_read, SearchAux};
use crate::store::KmerStore;

/// Hash a read's name (falling back to its batch index if the name is
/// empty) into an RNG seed, so re-running the same input always makes the
/// same tie-break decisions regardless of thread scheduling (§4.5, §4.8
/// expansion).
fn seed_for(name: &str, index: usize) -> u64 {
    let mut hasher = AHasher::default();
    if name.is_empty() {
        index.hash(&mut hasher);
    } else {
        name.hash(&mut hasher);
    }
    hasher.finish()
}

/// The original read's base at `origin_index`, or `N` (unresolvable) if out
/// of range.
fn original_base(original: &[u8], origin_index: usize) -> u8 {
    original.get(origin_index).map_or(4, |&c| crate::kmer::ascii_to_base(c))
}

/// Render one corrected read as a 4-line FASTQ record. A base is lowercased
/// whenever its emitted byte value differs from the original read's base at
/// its origin index — a pure value comparison, independent of state. Quality
/// is forced to 0 only for a literal-`N` passthrough whose originating input
/// base was itself unresolvable (state `N` and the original base `>= 4`); all
/// other bases, including an untouched `N` in a read with no consensus hit,
/// keep their real (already `Q_MAX`-clamped) quality.
fn render_fastq(name: &str, seq: &EcSeq, original: &[u8]) -> String {
    let mut out = String::with_capacity(name.len() + seq.len() * 2 + 16);
    out.push('@');
    out.push_str(name);
    out.push('\n');
    for b in &seq.0 {
        let changed = original_base(original, b.origin_index) != b.b;
        if b.b == 4 {
            out.push('N');
        } else {
            out.push(base_to_ascii(b.b, changed) as char);
        }
    }
    out.push_str("\n+\n");
    for b in &seq.0 {
        let q = if b.state == BaseState::N && original_base(original, b.origin_index) >= 4 {
            0
        } else {
            b.q
        };
        out.push((q + 33) as char);
    }
    out.push('\n');
    out
}

/// Correct an entire batch of records and return the concatenated FASTQ
/// text, in the same order the records were given.
pub fn correct_batch(opt: &CorrectOptions, store: &KmerStore, diag: &Diagnostics, records: &[SeqRecord]) -> String {
    let rendered: Vec<String> = records
        .par_iter()
        .enumerate()
        .map_init(SearchAux::new, |aux, (i, rec)| {
            let mut seq = EcSeq::convert(&rec.seq, rec.qual.as_deref(), opt.def_q as u8);
            let seed = seed_for(&rec.name, i);
            correct_read(opt, store, aux, &mut seq, seed);
            diag.record_read(seq.len());
            render_fastq(&rec.name, &seq, &rec.seq)
        })
        .collect();
    debug!(reads = records.len(), "batch correction complete");
    rendered.concat()
}
