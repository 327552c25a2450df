use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{info, warn};
use needletail::{FastxReader, parse_fastx_file};
use rayon::prelude::*;
use repeat_kmer_index::*;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Instant;

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Build and query minimizer repeat indexes.
#[derive(Parser, Debug)]
#[command(name = "rkmer", author, version, about)]
struct Cli {
    /// Log progress (info level) to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an index from reference FASTA/FASTQ files
    Build {
        /// Reference files (optionally gzipped)
        #[arg(short, long, required = true)]
        reference: Vec<PathBuf>,

        /// Output index path
        #[arg(short, long)]
        output: PathBuf,

        /// Window size (k-mer starts per window)
        #[arg(short, long, default_value_t = 10)]
        window: usize,

        /// K-mer length (<= 32)
        #[arg(short = 'k', long, default_value_t = 31)]
        k: usize,

        /// Write integers big-endian (default: little-endian)
        #[arg(long, default_value_t = false)]
        big_endian: bool,
    },

    /// Screen reads for repeats against an index
    Query {
        /// Saved index (repeat sources are unavailable from a saved index)
        #[arg(long, conflicts_with = "reference", required_unless_present = "reference")]
        index: Option<PathBuf>,

        /// Build the index in memory from these references instead
        #[arg(short, long)]
        reference: Vec<PathBuf>,

        /// Reads to screen
        #[arg(short, long)]
        input: PathBuf,

        /// Window size when building from references (a saved index carries its own)
        #[arg(short, long, default_value_t = 10, conflicts_with = "index")]
        window: usize,

        /// K-mer length when building from references (a saved index carries its own)
        #[arg(short = 'k', long, default_value_t = 31, conflicts_with = "index")]
        k: usize,

        /// Saved index is big-endian
        #[arg(long, default_value_t = false)]
        big_endian: bool,

        /// Only screen the forward strand
        #[arg(long, default_value_t = false)]
        forward_only: bool,

        /// Worker threads
        #[arg(short, long)]
        threads: Option<usize>,
    },

    /// Print an index summary
    Inspect {
        /// Saved index
        index: PathBuf,

        /// Saved index is big-endian
        #[arg(long, default_value_t = false)]
        big_endian: bool,

        /// Also list every distinct minimizer as bases
        #[arg(long, default_value_t = false)]
        values: bool,
    },
}

/// Log format: `[HH:MM:SS] LEVEL: message` with time elapsed since start, to stderr.
fn init_logger(verbose: bool) {
    START_TIME.get_or_init(Instant::now);

    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            let elapsed = START_TIME.get_or_init(Instant::now).elapsed().as_secs();
            writeln!(
                buf,
                "[{:02}:{:02}:{:02}] {}: {}",
                elapsed / 3600,
                (elapsed % 3600) / 60,
                elapsed % 60,
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .init();
}

struct Record {
    id: String,
    seq: Vec<u8>,
}

fn read_records(path: &Path) -> Result<Vec<Record>> {
    let mut reader = parse_fastx_file(path)
        .with_context(|| format!("Failed to open sequence file: {}", path.display()))?;
    let mut out = Vec::new();
    while let Some(rec) = reader.next() {
        let rec = rec.with_context(|| format!("Invalid record in {}", path.display()))?;
        let id = rec
            .id()
            .split(|b| b.is_ascii_whitespace())
            .next()
            .unwrap_or_default();
        out.push(Record {
            id: String::from_utf8_lossy(id).into_owned(),
            seq: rec.seq().into_owned(),
        });
    }
    Ok(out)
}

/// Load references, dropping those too short to hold one window.
fn read_references(paths: &[PathBuf], min_len: usize) -> Result<Vec<Record>> {
    let mut refs = Vec::new();
    for path in paths {
        for rec in read_records(path)? {
            if rec.seq.len() < min_len {
                warn!(
                    "Skipping reference '{}' ({} bp < {} bp needed for one window)",
                    rec.id,
                    rec.seq.len(),
                    min_len
                );
                continue;
            }
            refs.push(rec);
        }
    }
    info!("Loaded {} reference sequences", refs.len());
    Ok(refs)
}

fn build_from_references(paths: &[PathBuf], cfg: &IndexConfig) -> Result<(KmerIndex, Vec<String>)> {
    cfg.validate()?;
    let refs = read_references(paths, cfg.min_seq_len())?;
    let seqs: Vec<&[u8]> = refs.iter().map(|r| r.seq.as_slice()).collect();
    let mut index = KmerIndex::new();
    index.build(&seqs, cfg.window(), cfg.k());
    info!(
        "Built index: w={}, k={}, {} entries, {} distinct minimizers",
        index.w(),
        index.k(),
        index.entries().len(),
        index.values().len()
    );
    Ok((index, refs.into_iter().map(|r| r.id).collect()))
}

/// A loaded index with no `w`/`k` cannot screen anything.
fn ensure_screenable(index: &KmerIndex, path: &Path) -> Result<()> {
    if !index.is_built() {
        bail!(
            "Index {} is empty (w={}, k={}); rebuild it from references",
            path.display(),
            index.w(),
            index.k()
        );
    }
    Ok(())
}

#[derive(Default)]
struct Scratch {
    minimizers: Vec<Minimizer>,
    ids: Vec<SeqId>,
    rc_ids: Vec<SeqId>,
}

/// One TSV line: `read_id \t is_repeat \t sources`.
fn classify(
    index: &KmerIndex,
    names: &[String],
    both_strands: bool,
    rec: &Record,
    s: &mut Scratch,
) -> String {
    if rec.seq.len() < index.min_query_len() {
        return format!("{}\tfalse\t-", rec.id);
    }
    let rc = both_strands.then(|| reverse_complement(&rec.seq, index.lookup()));
    let repeat = match &rc {
        Some(rc) => index.is_repeat_either_strand(&rec.seq, rc, &mut s.minimizers),
        None => index.is_repeat(&rec.seq, &mut s.minimizers),
    };

    if !index.has_sources() {
        return format!("{}\t{}\t-", rec.id, repeat);
    }
    index.find_repeats(&rec.seq, &mut s.minimizers, &mut s.ids);
    if let Some(rc) = &rc {
        index.find_repeats(rc, &mut s.minimizers, &mut s.rc_ids);
        s.ids.extend_from_slice(&s.rc_ids);
        s.ids.sort_unstable();
        s.ids.dedup();
    }
    let sources = if s.ids.is_empty() {
        "-".to_string()
    } else {
        s.ids
            .iter()
            .map(|&id| names[id as usize].as_str())
            .collect::<Vec<_>>()
            .join(",")
    };
    format!("{}\t{}\t{}", rec.id, repeat, sources)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    match cli.command {
        Command::Build {
            reference,
            output,
            window,
            k,
            big_endian,
        } => {
            let cfg = IndexConfig::default()
                .with_window(window)
                .with_k(k)
                .with_endianness(Endianness::from_big_endian(big_endian));
            let (index, _) = build_from_references(&reference, &cfg)?;
            index.write_to_path(&output, cfg.endianness())?;
            info!("Wrote {}", output.display());
        }

        Command::Query {
            index,
            reference,
            input,
            window,
            k,
            big_endian,
            forward_only,
            threads,
        } => {
            if let Some(n) = threads {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build_global()
                    .ok();
            }
            let cfg = IndexConfig::default()
                .with_window(window)
                .with_k(k)
                .with_endianness(Endianness::from_big_endian(big_endian))
                .with_both_strands(!forward_only);

            let (kmer_index, names) = match index {
                Some(path) => {
                    let mut idx = KmerIndex::new();
                    idx.read_from_path(&path, cfg.endianness())?;
                    ensure_screenable(&idx, &path)?;
                    info!(
                        "Loaded {}: w={}, k={}, {} distinct minimizers",
                        path.display(),
                        idx.w(),
                        idx.k(),
                        idx.values().len()
                    );
                    (idx, Vec::new())
                }
                None => build_from_references(&reference, &cfg)?,
            };

            let reads = read_records(&input)?;
            let lines: Vec<String> = reads
                .par_iter()
                .map_init(Scratch::default, |s, rec| {
                    classify(&kmer_index, &names, cfg.both_strands(), rec, s)
                })
                .collect();

            let stdout = std::io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            for line in &lines {
                writeln!(out, "{line}")?;
            }
            out.flush()?;
            info!("Screened {} reads", reads.len());
        }

        Command::Inspect {
            index,
            big_endian,
            values,
        } => {
            let mut idx = KmerIndex::new();
            idx.read_from_path(&index, Endianness::from_big_endian(big_endian))?;
            let stdout = std::io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            idx.dump(&mut out)?;
            if values {
                for &v in idx.values() {
                    writeln!(out, "{}", decode_kmer(v, idx.k()))?;
                }
            }
            out.flush()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn query_rejects_window_or_k_with_saved_index() {
        for flag in ["-w", "-k"] {
            let err = Cli::try_parse_from([
                "rkmer", "query", "--index", "refs.rki", "-i", "reads.fq", flag, "5",
            ])
            .unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
        }
    }

    #[test]
    fn query_accepts_window_and_k_with_references() {
        let cli = Cli::try_parse_from([
            "rkmer", "query", "-r", "refs.fa", "-i", "reads.fq", "-w", "5", "-k", "7",
        ])
        .unwrap();
        match cli.command {
            Command::Query { window, k, index, .. } => {
                assert_eq!((window, k), (5, 7));
                assert!(index.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn empty_saved_index_is_not_screenable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.rki");
        KmerIndex::new()
            .write_to_path(&path, Endianness::Little)
            .unwrap();

        let mut idx = KmerIndex::new();
        idx.read_from_path(&path, Endianness::Little).unwrap();
        let err = ensure_screenable(&idx, &path).unwrap_err();
        assert!(err.to_string().contains("is empty"));

        idx.build(&[b"ACGTACG"], 2, 3);
        ensure_screenable(&idx, &path).unwrap();
    }
}
