//! `kcorrect`: build a k-mer consensus table from a substring index, or use
//! one to correct a set of reads.
//!
//! Sibling commands for diffing, subtracting, unpacking, or counting read
//! sets against an index are out of scope; this binary's surface is the bare
//! flag set for the correction pipeline alone, not a subcommand dispatcher.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use kcorrect::collect::collect_all;
use kcorrect::diag::{Diagnostics, Stopwatch};
use kcorrect::io::{read_records, BatchReader};
use kcorrect::oracle::naive_index::NaiveIndex;
use kcorrect::quality::QualityTables;
use kcorrect::{batch, CorrectOptions, KmerStore};

/// Consensus-driven k-mer error correction for sequencing reads.
#[derive(Parser, Debug)]
#[command(name = "kcorrect", disable_help_flag = true)]
struct Cli {
    /// k-mer length; must be odd (an even value is silently incremented).
    #[arg(short = 'k', default_value_t = 17)]
    k: u32,

    /// minimum occurrence count for a k-mer to enter the consensus table.
    #[arg(short = 'o', default_value_t = 3)]
    min_occ: u32,

    /// worker thread count.
    #[arg(short = 't', default_value_t = 1)]
    n_threads: u32,

    /// path to a precomputed k-mer table; skips collection if given.
    #[arg(short = 'h')]
    kmer_file: Option<String>,

    /// gap penalty for insertion/deletion branches during correction.
    #[arg(short = 'g', default_value_t = 40)]
    gap_penalty: i32,

    /// log verbosity, passed through to the `tracing` filter (0=warn, 1=info, 2=debug).
    #[arg(short = 'v', default_value_t = 1)]
    verbosity: u8,

    /// prior probability mass assigned to the primary consensus model.
    #[arg(short = 'p', default_value_t = 0.99)]
    prior: f64,

    /// assumed per-base sequencing error rate.
    #[arg(short = 'e', default_value_t = 0.005)]
    err: f64,

    #[arg(long, action = clap::ArgAction::Help)]
    help: Option<bool>,

    /// substring-index input. With no precomputed-kmer file, this crate
    /// only ships an in-memory reference oracle (`NaiveIndex`), so `index`
    /// is read here as a FASTA/FASTQ file of reference sequences rather
    /// than a production FMD-index; a real deployment supplies its own
    /// `IndexOracle` over its own index format.
    index: String,

    /// optional reads file (FASTA/FASTQ, optionally gzipped) to correct.
    /// If omitted, the built k-mer table is written to stdout instead.
    reads: Option<String>,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    let mut opt = CorrectOptions::default();
    opt.set_k(cli.k);
    if cli.k % 2 == 0 {
        warn!(requested = cli.k, adjusted = opt.k, "-k must be odd; incrementing");
    }
    opt.min_occ = cli.min_occ;
    opt.n_threads = cli.n_threads;
    opt.gap_penalty = cli.gap_penalty;
    opt.prior = cli.prior;
    opt.err = cli.err;
    opt.validate().context("invalid options")?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(opt.n_threads as usize)
        .build_global()
        .context("starting worker pool")?;

    let diag = Diagnostics::default();

    let store = {
        let _span = tracing::info_span!("collection").entered();
        let timer = Stopwatch::start();
        let store = if let Some(kmer_path) = &cli.kmer_file {
            let mut f = File::open(kmer_path).with_context(|| format!("opening k-mer file {kmer_path}"))?;
            KmerStore::read(&opt, &mut f).context("reading k-mer table")?
        } else {
            let records = read_records(&cli.index).context("reading index sequences")?;
            let seqs: Vec<String> = records.into_iter().map(|r| String::from_utf8_lossy(&r.seq).into_owned()).collect();
            let seq_refs: Vec<&str> = seqs.iter().map(String::as_str).collect();
            let oracle = NaiveIndex::new(&seq_refs);
            let tables = QualityTables::build(opt.err, opt.a1, opt.a2, opt.prior);
            let shard_cells = collect_all(&oracle, &tables, opt.k, opt.suf_len, opt.min_occ as u64);
            diag.record_collection(shard_cells.iter().map(|s| s.len() as u64).sum());
            KmerStore::build(opt.k, opt.suf_len, shard_cells)
        };
        info!(elapsed_secs = timer.elapsed_secs(), "collection phase done");
        store
    };

    match &cli.reads {
        None => {
            let stdout = io::stdout();
            let mut w = BufWriter::new(stdout.lock());
            store.write(&opt, &mut w).context("writing k-mer table")?;
            w.flush()?;
        }
        Some(reads_path) => {
            let _span = tracing::info_span!("correction").entered();
            let timer = Stopwatch::start();
            let stdout = io::stdout();
            let mut w = BufWriter::new(stdout.lock());
            let mut reader = BatchReader::open(reads_path).context("reading reads")?;
            while let Some(records) = reader.next_batch(opt.batch_size).context("reading reads")? {
                let fastq = batch::correct_batch(&opt, &store, &diag, &records);
                w.write_all(fastq.as_bytes())?;
            }
            w.flush()?;
            info!(elapsed_secs = timer.elapsed_secs(), "correction phase done");
        }
    }

    diag.log_summary();
    Ok(())
}
