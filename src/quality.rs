//! Bayesian phred-scale quality tables (C1).
//!
//! Precomputes, for every `(n, k)` with `1 <= n < 256, 0 <= k < n`, a phred
//! score derived from a mixture of two beta-binomial models: one favoring a
//! clean consensus call, one favoring a noisier/heterozygous alternative.
//! Two tables are built per run — a symmetric one (second parameter `0.5`)
//! used for the primary base, and an asymmetric one (`1/3`) used for the
//! second base — and shared read-only across collector tasks.

/// log-gamma via the classic 9-term Lanczos-style series (matches the
/// reference implementation's constants so the resulting tables agree
/// to the same rounding behavior).
fn lgamma(z: f64) -> f64 {
    const G: [f64; 8] = [
        0.1659470187408462e-06,
        0.9934937113930748e-05,
        -0.1385710331296526,
        12.50734324009056,
        -176.6150291498386,
        771.3234287757674,
        -1259.139216722289,
        676.5203681218835,
    ];
    let mut x = 0.0;
    for (i, g) in G.iter().enumerate() {
        x += g / (z + (7 - i) as f64);
    }
    x += 0.9999999999995183;
    x.ln() - 5.58106146679532777 - z + (z - 0.5) * (z + 6.5).ln()
}

/// `BetaBinomial(n, k; a, b)`, computed via log-gamma to avoid overflow for
/// large `n`.
pub fn beta_binomial(n: u32, k: u32, a: f64, b: f64) -> f64 {
    let n = n as f64;
    let k = k as f64;
    let x = lgamma(n + 1.0) - (lgamma(k + 1.0) + lgamma(n - k + 1.0));
    let y = lgamma(k + a) + lgamma(n - k + b) - lgamma(n + a + b);
    let z = lgamma(a + b) - (lgamma(a) + lgamma(b));
    (x + y + z).exp()
}

/// Side length of a [`precompute_qtab`] table: entries are indexed
/// `[n << 8 | k]` for `n, k` in `0..256`.
pub const QTAB_SIDE: usize = 256;

/// Precompute `table[n << 8 | k] = round(-10 * log10(1 - p1*prior1 / (p1*prior1 + p2*(1-prior1))))`,
/// clamped to `[0, 255]`, for the sequencing-error model `p1` (parameters
/// `a1`, `e`) against the alternative model `p2` (parameters `a2`, `e2`).
pub fn precompute_qtab(e: f64, e2: f64, a1: f64, a2: f64, prior1: f64) -> Vec<u8> {
    let b1 = a1 * (1.0 - e) / e;
    let b2 = a2 * (1.0 - e2) / e2;
    let mut table = vec![0u8; QTAB_SIDE * QTAB_SIDE];
    for n in 1..QTAB_SIDE as u32 {
        for k in 0..n {
            let p1 = beta_binomial(n, k, a1, b1);
            let p2 = beta_binomial(n, k, a2, b2);
            let ratio = p1 * prior1 / (p1 * prior1 + p2 * (1.0 - prior1));
            let q = -10.0 * (1.0 - ratio).log10();
            let q = if q.is_finite() { q.round().max(0.0) } else { 255.0 };
            table[(n as usize) << 8 | k as usize] = if q < 255.0 { q as u8 } else { 255 };
        }
    }
    table
}

/// The pair of tables used by the collector: `[symmetric, asymmetric]`.
pub struct QualityTables {
    pub sym: Vec<u8>,
    pub asym: Vec<u8>,
}

impl QualityTables {
    pub fn build(err: f64, a1: f64, a2: f64, prior: f64) -> Self {
        QualityTables {
            sym: precompute_qtab(err, 0.5, a1, a2, prior),
            asym: precompute_qtab(err, 1.0 / 3.0, a1, a2, prior),
        }
    }
}
