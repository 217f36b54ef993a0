//! Sharded k-mer storage (C4): one hash set per shard, keyed on the upper 36
//! bits of a [`Cell`], plus the on-disk binary format used to persist and
//! reload a built store (§4.3).
//!
//! Equality and hashing deliberately only look at [`Cell::key`] — exactly
//! one cell per key is permitted per shard (the shard-seed/middle-base
//! pruning in [`crate::collect`] guarantees this) — so a lookup can be
//! expressed as a set membership probe with the tip bits zeroed out, and the
//! full matching cell (tip bits included) is recovered from the stored
//! entry rather than the probe.

use std::hash::{Hash, Hasher};
use std::io::{Read, Write};

use ahash::AHashSet;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::cell::Cell;
use crate::error::{CorrectError, Result};
use crate::options::CorrectOptions;

#[derive(Debug, Clone, Copy)]
struct KeyedCell(Cell);

impl PartialEq for KeyedCell {
    fn eq(&self, other: &Self) -> bool {
        self.0.key() == other.0.key()
    }
}
impl Eq for KeyedCell {}

impl Hash for KeyedCell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.key().hash(state);
    }
}

/// The full set of shards built from one index pass. `shards[i]` holds every
/// distinct-keyed cell whose canonical k-mer's low `suf_len*2` bits equal
/// `i`.
pub struct KmerStore {
    pub k: u32,
    pub suf_len: u32,
    shards: Vec<AHashSet<KeyedCell>>,
}

impl KmerStore {
    /// Build a store from one raw cell list per shard (as produced by
    /// [`crate::collect::collect_all`]). Duplicate keys within a shard are
    /// collapsed, keeping the last one seen — this should never happen given
    /// correct pruning, but is not itself an error worth surfacing.
    pub fn build(k: u32, suf_len: u32, shard_cells: Vec<Vec<u64>>) -> Self {
        let shards = shard_cells
            .into_iter()
            .map(|cells| cells.into_iter().map(|raw| KeyedCell(Cell::from_raw(raw))).collect())
            .collect();
        KmerStore { k, suf_len, shards }
    }

    pub fn n_suf(&self) -> usize {
        self.shards.len()
    }

    /// Look up a cell by shard index and key, returning the stored cell (tip
    /// records included) if present.
    pub fn lookup(&self, shard: usize, key: u64) -> Option<Cell> {
        let probe = KeyedCell(Cell::pack(key, crate::cell::TipRecord(0), crate::cell::TipRecord(0)));
        self.shards.get(shard)?.get(&probe).map(|kc| kc.0)
    }

    pub fn shard_len(&self, shard: usize) -> usize {
        self.shards.get(shard).map_or(0, |s| s.len())
    }

    pub fn total_cells(&self) -> usize {
        self.shards.iter().map(|s| s.len()).sum()
    }

    /// Write the binary format: a fixed-size options header, then per-shard
    /// `count:u64` followed by `count` packed `u64` cells, all little-endian
    /// for reproducibility across machines (the reference implementation
    /// dumps its option struct and cell arrays as a raw native-endian memory
    /// image; pinning the byte order here is a deliberate improvement, noted
    /// in the design ledger). The shard count itself is not stored — it is
    /// `4^suf_len`, derived from the options header on read.
    pub fn write<W: Write>(&self, opt: &CorrectOptions, w: &mut W) -> Result<()> {
        opt.write(w)?;
        for shard in &self.shards {
            w.write_u64::<LittleEndian>(shard.len() as u64)?;
            for kc in shard {
                w.write_u64::<LittleEndian>(kc.0.raw())?;
            }
        }
        Ok(())
    }

    /// Read a store back, validating that `k`/`suf_len` in the file match
    /// `expected` (the options the caller intends to search with).
    pub fn read<R: Read>(expected: &CorrectOptions, r: &mut R) -> Result<Self> {
        let found = CorrectOptions::read(r)?;
        if found.k != expected.k || found.suf_len != expected.suf_len {
            return Err(CorrectError::FormatMismatch {
                expected_k: expected.k,
                expected_suf_len: expected.suf_len,
                found_k: found.k,
                found_suf_len: found.suf_len,
            });
        }
        let n_suf = found.n_suf();
        let mut shards = Vec::with_capacity(n_suf);
        for _ in 0..n_suf {
            let count = r.read_u64::<LittleEndian>()? as usize;
            let mut set = AHashSet::with_capacity(count);
            for _ in 0..count {
                let raw = r.read_u64::<LittleEndian>()?;
                set.insert(KeyedCell(Cell::from_raw(raw)));
            }
            shards.push(set);
        }
        Ok(KmerStore { k: found.k, suf_len: found.suf_len, shards })
    }
}
