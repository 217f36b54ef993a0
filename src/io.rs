//! FASTA/FASTQ record reading (§3.1 expansion), built on `needletail` so
//! gzip-compressed inputs and both formats are handled transparently.

use needletail::parse_fastx_file;
use needletail::parser::FastxReader;

use crate::error::Result;

/// One input record: `qual` is `None` for FASTA input, in which case
/// [`crate::read::EcSeq::convert`] falls back to the configured default
/// quality.
#[derive(Debug, Clone)]
pub struct SeqRecord {
    pub name: String,
    pub seq: Vec<u8>,
    pub qual: Option<Vec<u8>>,
}

fn wrap_err<E: std::fmt::Display>(e: E) -> crate::error::CorrectError {
    crate::error::CorrectError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}

/// Read every record from `path` (FASTA, FASTQ, or gzip of either) into
/// memory in one shot. Used for inputs that are meant to be held in full
/// (the reference-sequence file backing [`crate::oracle::naive_index::NaiveIndex`]);
/// the correction pipeline itself uses [`BatchReader`] instead so it never
/// holds more than one `batch_size` worth of reads at a time (§4.7).
pub fn read_records(path: &str) -> Result<Vec<SeqRecord>> {
    let mut reader = parse_fastx_file(path).map_err(wrap_err)?;
    let mut out = Vec::new();
    while let Some(rec) = reader.next() {
        let rec = rec.map_err(wrap_err)?;
        let name = String::from_utf8_lossy(rec.id()).into_owned();
        let seq = rec.seq().into_owned();
        let qual = rec.qual().map(|q| q.to_vec());
        out.push(SeqRecord { name, seq, qual });
    }
    Ok(out)
}

/// Streams records off `path` and groups them into batches whose summed
/// sequence length does not exceed `batch_size`, mirroring the reference
/// implementation's `fmc_batch_read` (read records until the running byte
/// total reaches `batch_size`, then hand the batch to the correction driver
/// and start the next one). A single record longer than `batch_size` still
/// forms a batch of its own rather than being split or dropped.
pub struct BatchReader {
    reader: Box<dyn FastxReader>,
    pending: Option<SeqRecord>,
}

impl BatchReader {
    pub fn open(path: &str) -> Result<Self> {
        let reader = parse_fastx_file(path).map_err(wrap_err)?;
        Ok(BatchReader { reader, pending: None })
    }

    fn read_one(&mut self) -> Result<Option<SeqRecord>> {
        if let Some(rec) = self.pending.take() {
            return Ok(Some(rec));
        }
        match self.reader.next() {
            None => Ok(None),
            Some(rec) => {
                let rec = rec.map_err(wrap_err)?;
                let name = String::from_utf8_lossy(rec.id()).into_owned();
                let seq = rec.seq().into_owned();
                let qual = rec.qual().map(|q| q.to_vec());
                Ok(Some(SeqRecord { name, seq, qual }))
            }
        }
    }

    /// Pull the next batch of records whose total sequence length is at most
    /// `batch_size` (always at least one record, even if that record alone
    /// exceeds the limit). Returns `None` once the input is exhausted.
    pub fn next_batch(&mut self, batch_size: u64) -> Result<Option<Vec<SeqRecord>>> {
        let mut batch = Vec::new();
        let mut total = 0u64;
        while total < batch_size {
            match self.read_one()? {
                None => break,
                Some(rec) => {
                    total += rec.seq.len() as u64;
                    batch.push(rec);
                }
            }
        }
        if batch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }
}
