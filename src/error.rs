use thiserror::Error;

/// Library-wide error type for the `correct` pipeline.
///
/// Per-read "no hit" / "no full path" outcomes are not represented here:
/// those are not errors (the read is emitted unchanged).
#[derive(Debug, Error)]
pub enum CorrectError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("k-mer file mismatch: expected k={expected_k} suf_len={expected_suf_len}, found k={found_k} suf_len={found_suf_len}")]
    FormatMismatch {
        expected_k: u32,
        expected_suf_len: u32,
        found_k: u32,
        found_suf_len: u32,
    },

    #[error("invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, CorrectError>;
