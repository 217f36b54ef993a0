use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{CorrectError, Result};

/// The full set of tunables for k-mer collection and read correction, laid
/// out field-for-field so the binary serialization in [`crate::store`] stays
/// bit-compatible across builds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct CorrectOptions {
    pub k: u32,
    pub suf_len: u32,
    pub min_occ: u32,
    pub n_threads: u32,
    pub def_q: u32,
    pub gap_penalty: i32,
    pub max_heap_size: u32,
    pub max_penalty: i32,
    pub max_penalty_diff: i32,
    pub batch_size: u64,

    pub a1: f64,
    pub a2: f64,
    pub err: f64,
    pub prior: f64,
}

impl Default for CorrectOptions {
    fn default() -> Self {
        CorrectOptions {
            k: 17,
            suf_len: 1,
            min_occ: 3,
            n_threads: 1,
            def_q: 20,
            gap_penalty: 40,
            max_heap_size: 256,
            max_penalty: 120,
            max_penalty_diff: 60,
            batch_size: (1u64 << 30) - (1u64 << 20),
            a1: 0.05,
            a2: 10.0,
            err: 0.005,
            prior: 0.99,
        }
    }
}

impl CorrectOptions {
    /// Build options for a given `k` and `min_occ`, deriving `suf_len` and
    /// forcing `k` odd exactly the way the CLI does, so library callers and
    /// the CLI never disagree about the defaults.
    pub fn new(k: u32, min_occ: u32) -> Self {
        let mut opt = CorrectOptions {
            min_occ,
            ..CorrectOptions::default()
        };
        opt.set_k(k);
        opt
    }

    /// Set `k`, silently rounding up to the nearest odd value and
    /// re-deriving `suf_len` (matching `opt.suf_len = k > 18 ? k - 18 : 1`).
    pub fn set_k(&mut self, k: u32) {
        self.k = if k % 2 == 0 { k + 1 } else { k };
        self.suf_len = if self.k > 18 { self.k - 18 } else { 1 };
    }

    pub fn n_suf(&self) -> usize {
        1usize << (self.suf_len * 2)
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(CorrectError::Config("k must be nonzero".into()));
        }
        if self.k % 2 == 0 {
            return Err(CorrectError::Config("k must be odd".into()));
        }
        if self.suf_len == 0 {
            return Err(CorrectError::Config("suf_len must be nonzero".into()));
        }
        if self.min_occ == 0 {
            return Err(CorrectError::Config("min_occ must be nonzero".into()));
        }
        let depth = self.k as i64 - self.suf_len as i64;
        if depth <= 0 || depth > 18 {
            return Err(CorrectError::Config(format!(
                "k - suf_len must be in (0, 18], got {depth}"
            )));
        }
        Ok(())
    }
}

impl CorrectOptions {
    /// Write the fixed-size option record as a flat little-endian byte
    /// sequence (§6: "the full option record ... as a raw byte sequence").
    /// Field order and widths are fixed by this function, not by in-memory
    /// struct layout, so the format is stable across compilers/targets.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32::<LittleEndian>(self.k)?;
        w.write_u32::<LittleEndian>(self.suf_len)?;
        w.write_u32::<LittleEndian>(self.min_occ)?;
        w.write_u32::<LittleEndian>(self.n_threads)?;
        w.write_u32::<LittleEndian>(self.def_q)?;
        w.write_i32::<LittleEndian>(self.gap_penalty)?;
        w.write_u32::<LittleEndian>(self.max_heap_size)?;
        w.write_i32::<LittleEndian>(self.max_penalty)?;
        w.write_i32::<LittleEndian>(self.max_penalty_diff)?;
        w.write_u64::<LittleEndian>(self.batch_size)?;
        w.write_f64::<LittleEndian>(self.a1)?;
        w.write_f64::<LittleEndian>(self.a2)?;
        w.write_f64::<LittleEndian>(self.err)?;
        w.write_f64::<LittleEndian>(self.prior)?;
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        Ok(CorrectOptions {
            k: r.read_u32::<LittleEndian>()?,
            suf_len: r.read_u32::<LittleEndian>()?,
            min_occ: r.read_u32::<LittleEndian>()?,
            n_threads: r.read_u32::<LittleEndian>()?,
            def_q: r.read_u32::<LittleEndian>()?,
            gap_penalty: r.read_i32::<LittleEndian>()?,
            max_heap_size: r.read_u32::<LittleEndian>()?,
            max_penalty: r.read_i32::<LittleEndian>()?,
            max_penalty_diff: r.read_i32::<LittleEndian>()?,
            batch_size: r.read_u64::<LittleEndian>()?,
            a1: r.read_f64::<LittleEndian>()?,
            a2: r.read_f64::<LittleEndian>()?,
            err: r.read_f64::<LittleEndian>()?,
            prior: r.read_f64::<LittleEndian>()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_k_is_incremented() {
        let opt = CorrectOptions::new(16, 3);
        assert_eq!(opt.k, 17);
    }

    #[test]
    fn suf_len_derivation() {
        assert_eq!(CorrectOptions::new(17, 3).suf_len, 1);
        assert_eq!(CorrectOptions::new(25, 3).suf_len, 7);
    }

    #[test]
    fn defaults_match_spec() {
        let opt = CorrectOptions::default();
        assert_eq!(opt.k, 17);
        assert_eq!(opt.min_occ, 3);
        assert_eq!(opt.gap_penalty, 40);
        assert_eq!(opt.max_penalty, 120);
        assert_eq!(opt.max_penalty_diff, 60);
    }

    #[test]
    fn option_record_round_trips() {
        let opt = CorrectOptions::new(21, 5);
        let mut buf = Vec::new();
        opt.write(&mut buf).unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let restored = CorrectOptions::read(&mut cursor).unwrap();
        assert_eq!(opt, restored);
    }
}
