//! A binary that re-evaluates read support at every position of a polished
//! consensus, masks the positions that cannot be trusted, and annotates the
//! variant calls made against it.
//!
//! ```shell
//! cargo run --release --bin=self-qc --features=binaries -- \
//!     consensus.fa msa.fa reads.bam variants.vcf \
//!     --masked masked.fa --annotated annotated.vcf
//! ```
//!
//! It achieves this by carrying out the following:
//!
//! * Building the lookup table between the reference and the consensus from
//!   the two-record multiple sequence alignment.
//! * Expanding every primary alignment in the BAM (reads mapped to the
//!   consensus) into per-position base calls, tagged with the read strand,
//!   whether the position falls in a primer, and the amplicon the read
//!   belongs to (if an amplicon scheme is given).
//! * Masking every consensus position that fails the depth or allele-bias
//!   tests and rewriting the `FILTER` of every variant call accordingly.

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use clap::Parser;
use clap::ValueEnum;
use clap_verbosity_flag::Verbosity;
use consensus_qc::Pileup;
use consensus_qc::alignment::Alignment;
use consensus_qc::alignment::Cigar;
use consensus_qc::alignment::cigar;
use consensus_qc::liftover::System;
use consensus_qc::pileup;
use consensus_qc::pileup::policy;
use consensus_qc::primers::Scheme;
use consensus_qc::vcf;
use flate2::read::GzDecoder;
use noodles::bam;
use noodles::fasta;
use noodles::sam::alignment::record::cigar::op::Kind;
use omics::coordinate::Strand;
use tracing::debug;
use tracing::info;
use tracing::warn;
use tracing_log::AsTrace as _;
use tracing_subscriber::EnvFilter;

////////////////////////////////////////////////////////////////////////////////////////
// Inputs
////////////////////////////////////////////////////////////////////////////////////////

/// Opens a file for buffered reading, decompressing it if it ends in `.gz`.
fn open(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("gz") => Ok(Box::new(BufReader::new(GzDecoder::new(file)))),
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

/// Reads the first record of a FASTA file as a `(name, sequence)` pair.
fn read_first_record(path: &Path) -> Result<(String, Vec<u8>)> {
    let mut reader = fasta::io::Reader::new(open(path)?);

    let record = match reader.records().next() {
        Some(result) => result.with_context(|| format!("reading {}", path.display()))?,
        None => bail!("no records in {}", path.display()),
    };

    let name = String::from_utf8_lossy(record.name()).into_owned();
    let sequence = record.sequence().as_ref().to_vec();

    Ok((name, sequence))
}

/// Translates a BAM alignment operation kind.
fn kind(kind: Kind) -> cigar::Kind {
    match kind {
        Kind::Match => cigar::Kind::Match,
        Kind::Insertion => cigar::Kind::Insertion,
        Kind::Deletion => cigar::Kind::Deletion,
        Kind::Skip => cigar::Kind::Skip,
        Kind::SoftClip => cigar::Kind::SoftClip,
        Kind::HardClip => cigar::Kind::HardClip,
        Kind::Pad => cigar::Kind::Pad,
        Kind::SequenceMatch => cigar::Kind::SequenceMatch,
        Kind::SequenceMismatch => cigar::Kind::SequenceMismatch,
    }
}

/// Counts of reads by what happened to them.
#[derive(Debug, Default)]
struct Counts {
    /// Reads folded into the pileup.
    used: usize,

    /// Unmapped, secondary, or supplementary reads.
    skipped: usize,

    /// Reads whose alignment could not be interpreted.
    invalid: usize,
}

/// Folds every primary alignment in a BAM into the pileup.
fn pile_up(path: &Path, pileup: &mut Pileup, scheme: Option<&Scheme>) -> Result<Counts> {
    let mut reader = bam::io::reader::Builder
        .build_from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    reader.read_header().context("reading BAM header")?;

    let mut counts = Counts::default();

    for result in reader.records() {
        let record = result.context("reading BAM record")?;
        let flags = record.flags();

        if flags.is_unmapped() || flags.is_secondary() || flags.is_supplementary() {
            counts.skipped += 1;
            continue;
        }

        let start = match record.alignment_start() {
            Some(result) => usize::from(result.context("reading alignment start")?) - 1,
            None => {
                counts.skipped += 1;
                continue;
            }
        };

        let ops = record
            .cigar()
            .iter()
            .map(|result| result.map(|op| cigar::Op::new(kind(op.kind()), op.len())))
            .collect::<std::io::Result<Vec<_>>>()
            .context("reading CIGAR")?;

        let alignment = Alignment::new(start, 0, Cigar::from(ops));
        let query = record.sequence().iter().collect::<Vec<_>>();

        let strand = match flags.is_reverse_complemented() {
            true => Strand::Negative,
            false => Strand::Positive,
        };

        match pileup.add_read(&alignment, &query, strand, scheme) {
            Ok(()) => {}
            Err(pileup::Error::Alignment(err)) => {
                debug!("skipping read: {err}");
                counts.invalid += 1;
                continue;
            }
            Err(err) => return Err(err.into()),
        }

        counts.used += 1;
    }

    Ok(counts)
}

////////////////////////////////////////////////////////////////////////////////////////
// Outputs
////////////////////////////////////////////////////////////////////////////////////////

/// Creates a file for buffered writing.
fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .with_context(|| format!("creating {}", path.display()))
}

/// Writes the masked consensus as FASTA.
fn write_masked(path: &Path, name: &str, masked: String) -> Result<()> {
    let mut writer = fasta::io::Writer::new(create(path)?);

    let record = fasta::Record::new(
        fasta::record::Definition::new(name, None),
        fasta::record::Sequence::from(masked.into_bytes()),
    );

    writer
        .write_record(&record)
        .and_then(|_| writer.get_mut().flush())
        .with_context(|| format!("writing {}", path.display()))
}

////////////////////////////////////////////////////////////////////////////////////////
// Main
////////////////////////////////////////////////////////////////////////////////////////

/// A coordinate system.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Coordinates {
    /// The original reference.
    Reference,

    /// The polished consensus.
    Consensus,
}

impl From<Coordinates> for System {
    fn from(value: Coordinates) -> Self {
        match value {
            Coordinates::Reference => System::Reference,
            Coordinates::Consensus => System::Consensus,
        }
    }
}

/// Masks the untrustworthy positions of a polished consensus.
#[derive(Parser)]
struct Args {
    /// The polished consensus (FASTA; the first record is used).
    consensus: PathBuf,

    /// The alignment of the reference (first) against the consensus (second).
    msa: PathBuf,

    /// The reads, mapped to the consensus (BAM).
    bam: PathBuf,

    /// The variant calls (VCF).
    vcf: PathBuf,

    /// Where to write the masked consensus (FASTA).
    #[arg(long)]
    masked: PathBuf,

    /// Where to write the annotated variant calls (VCF).
    #[arg(long)]
    annotated: PathBuf,

    /// Where to write the per-position statistics (TSV).
    #[arg(long)]
    stats: Option<PathBuf>,

    /// The reference (FASTA), checked against the first aligned record.
    #[arg(short, long)]
    reference: Option<PathBuf>,

    /// The amplicon scheme (TSV).
    #[arg(short, long)]
    scheme: Option<PathBuf>,

    /// The name of the masked record (defaults to the consensus name).
    #[arg(long)]
    name: Option<String>,

    /// The minimum number of usable observations at a position.
    #[arg(long, default_value_t = policy::DEFAULT_DEPTH_THRESHOLD)]
    depth_threshold: usize,

    /// The lower edge of the failing alternate-allele band.
    #[arg(long, default_value_t = policy::DEFAULT_BIAS_THRESHOLD)]
    bias_threshold: f64,

    /// Whether to count observations inside primer-binding regions.
    #[arg(long, default_value_t = false)]
    include_primers: bool,

    /// The coordinate system of the variant calls.
    #[arg(long, value_enum, default_value_t = Coordinates::Reference)]
    vcf_coordinates: Coordinates,

    /// The coordinate system to report variant calls in.
    #[arg(long, value_enum, default_value_t = Coordinates::Reference)]
    report_coordinates: Coordinates,

    #[command(flatten)]
    verbose: Verbosity,
}

fn run(args: &Args) -> Result<()> {
    let (name, consensus) = read_first_record(&args.consensus)?;
    info!("consensus: {name} ({} bp)", consensus.len());

    let msa = consensus_qc::msa::read(open(&args.msa)?)
        .with_context(|| format!("reading {}", args.msa.display()))?;

    let config = policy::Builder::default()
        .depth_threshold(args.depth_threshold)
        .bias_threshold(args.bias_threshold)
        .exclude_primers(!args.include_primers)
        .try_build()?;

    let mut builder = pileup::Builder::default().config(config);
    if let Some(path) = &args.reference {
        let (_, reference) = read_first_record(path)?;
        builder = builder.reference(reference);
    }

    let mut pileup = builder
        .try_build(consensus, &msa)
        .context("building the pileup")?;

    let scheme = match &args.scheme {
        Some(path) => {
            let scheme = Scheme::from_tsv(open(path)?)
                .with_context(|| format!("reading {}", path.display()))?;
            info!("scheme: {} amplicons", scheme.amplicons().len());
            Some(scheme)
        }
        None => None,
    };

    info!("reads: piling up {}", args.bam.display());
    let counts = pile_up(&args.bam, &mut pileup, scheme.as_ref())?;
    info!(
        "reads: {} used, {} skipped, {} invalid",
        counts.used, counts.skipped, counts.invalid
    );

    if counts.invalid > 0 {
        warn!("{} reads could not be interpreted", counts.invalid);
    }

    let name = args.name.clone().unwrap_or(name);
    write_masked(&args.masked, &name, pileup.mask())?;

    let annotator = vcf::Annotator::new(&pileup)
        .source(args.vcf_coordinates.into())
        .report(args.report_coordinates.into());
    let mut reader = noodles::vcf::io::Reader::new(open(&args.vcf)?);
    let mut writer = noodles::vcf::io::Writer::new(create(&args.annotated)?);
    let n = annotator
        .annotate(&mut reader, &mut writer)
        .context("annotating variant calls")?;
    writer.get_mut().flush().context("writing variant calls")?;
    info!("variants: annotated {n} records");

    if let Some(path) = &args.stats {
        let mut writer = create(path)?;
        pileup
            .write_tsv(&mut writer)
            .with_context(|| format!("writing {}", path.display()))?;
        writer.flush()?;
    }

    for line in pileup.summary().to_string().lines() {
        info!("summary: {line}");
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_max_level(args.verbose.log_level_filter().as_trace())
            .init(),
    };

    run(&args)
}
