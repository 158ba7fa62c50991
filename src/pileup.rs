//! The per-position aggregation of read evidence over a consensus.
//!
//! A [`Pileup`] holds one [`Stats`] accumulator for every consensus position,
//! allocated up front, along with the [`Table`] bridging the consensus and
//! the original reference. Positions are 0-based when indexing the pileup
//! and 1-based when passed through the [`Table`].

use std::io;
use std::ops::Index;
use std::ops::IndexMut;

use omics::coordinate::Strand;
use serde::Serialize;

use crate::alignment::Alignment;
use crate::alignment::interpret;
use crate::alignment::parse_cigar;
use crate::liftover::Table;
use crate::liftover::UNMAPPED;
use crate::liftover::table;
use crate::msa::Msa;
use crate::primers::Amplicon;
use crate::primers::Scheme;

pub mod observation;
pub mod policy;
pub mod stats;
pub mod summary;

pub use observation::Observation;
pub use policy::Config;
pub use policy::Verdict;
pub use stats::Stats;
pub use summary::Summary;

/// The placeholder for an empty table cell.
const EMPTY: &str = ".";

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to a [`Pileup`].
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// The alignment could not be turned into a lookup table.
    Table(table::builder::Error),

    /// A lookup table query failed.
    Lookup(table::Error),

    /// A position beyond the end of the consensus.
    OutOfRange {
        /// The requested (0-based) position.
        position: usize,

        /// The length of the consensus.
        len: usize,
    },

    /// A read could not be interpreted against the consensus.
    Alignment(interpret::Error),

    /// Two pileups built from a different consensus, alignment, or
    /// configuration were merged.
    Incompatible,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Table(err) => write!(f, "invalid alignment: {err}"),
            Error::Lookup(err) => write!(f, "lookup error: {err}"),
            Error::OutOfRange { position, len } => write!(
                f,
                "position {position} is beyond the end of the consensus (length {len})"
            ),
            Error::Alignment(err) => write!(f, "invalid read alignment: {err}"),
            Error::Incompatible => write!(f, "cannot merge pileups that were built differently"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// One row of the table written by [`Pileup::write_tsv()`].
#[derive(Debug, Serialize)]
struct Row<'a> {
    /// The 1-based consensus position.
    cons_pos: usize,

    /// The 1-based reference position (`0` without a counterpart).
    ref_pos: usize,

    /// The consensus base.
    cons_base: char,

    /// Every observation.
    depth: usize,

    /// Observations matching the consensus base.
    ref_count: usize,

    /// Observations differing from the consensus base.
    alt_count: usize,

    /// Forward-strand observations matching the consensus base.
    fwd_ref: usize,

    /// Forward-strand observations differing from the consensus base.
    fwd_alt: usize,

    /// Reverse-strand observations matching the consensus base.
    rev_ref: usize,

    /// Reverse-strand observations differing from the consensus base.
    rev_alt: usize,

    /// Observations inside primer-binding regions.
    in_primer: usize,

    /// Observations per amplicon, as `name:count` pairs.
    amplicons: String,

    /// `PASS` or `FAIL`.
    status: &'a str,

    /// The failure reasons.
    reasons: String,
}

////////////////////////////////////////////////////////////////////////////////////////
// Builder
////////////////////////////////////////////////////////////////////////////////////////

/// A builder for a [`Pileup`].
#[derive(Debug, Default)]
pub struct Builder {
    /// The reference the first aligned record must match.
    reference: Option<Vec<u8>>,

    /// The thresholds used to judge each position.
    config: Option<Config>,
}

impl Builder {
    /// Sets the reference the first aligned record must match.
    pub fn reference(mut self, sequence: impl Into<Vec<u8>>) -> Self {
        self.reference = Some(sequence.into());
        self
    }

    /// Sets the thresholds used to judge each position.
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Consumes `self` to attempt to build an empty [`Pileup`] over
    /// `consensus`.
    ///
    /// The second record of `msa` must match the consensus, and the first
    /// must match the reference (if one was set).
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_qc::pileup::Builder;
    ///
    /// let msa = consensus_qc::msa::read(&b">ref\nACGT--A\n>cons\n-CGTTTA\n"[..])?;
    /// let pileup = Builder::default()
    ///     .reference(b"ACGTA".to_vec())
    ///     .try_build(b"CGTTTA".to_vec(), &msa)?;
    ///
    /// assert_eq!(pileup.len(), 6);
    /// assert_eq!(pileup.mask(), "NNNNNN");
    ///
    /// let err = Builder::default().try_build(b"ACGTA".to_vec(), &msa).unwrap_err();
    /// assert_eq!(
    ///     err.to_string(),
    ///     "invalid alignment: the second aligned record does not match the consensus sequence"
    /// );
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_build(self, consensus: impl Into<Vec<u8>>, msa: &Msa) -> Result<Pileup> {
        let consensus = consensus.into();

        let mut builder = table::Builder::default().consensus(consensus.clone());
        if let Some(reference) = self.reference {
            builder = builder.reference(reference);
        }

        let table = builder.try_build_from_msa(msa).map_err(Error::Table)?;
        let stats = consensus.iter().map(|base| Stats::new(*base)).collect();

        Ok(Pileup {
            consensus,
            table,
            stats,
            config: self.config.unwrap_or_default(),
        })
    }

    /// Consumes `self` to attempt to build an empty [`Pileup`] over the
    /// ungapped second record of `msa`.
    pub fn try_build_from_msa(self, msa: &Msa) -> Result<Pileup> {
        self.try_build(msa.b().ungapped(), msa)
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Pileup
////////////////////////////////////////////////////////////////////////////////////////

/// Read evidence for every position of a consensus sequence.
#[derive(Clone, Debug)]
pub struct Pileup {
    /// The consensus sequence.
    consensus: Vec<u8>,

    /// The lookup table between the reference and the consensus.
    table: Table,

    /// One accumulator per consensus position.
    stats: Vec<Stats>,

    /// The thresholds used to judge each position.
    config: Config,
}

impl Pileup {
    /// Gets the consensus sequence.
    pub fn consensus(&self) -> &[u8] {
        &self.consensus
    }

    /// Gets the lookup table between the reference and the consensus.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Gets the thresholds used to judge each position.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The length of the consensus.
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// Whether the consensus is empty.
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Translates a 1-based reference position to the consensus (`0` if it
    /// has no counterpart).
    pub fn ref_to_consensus(&self, position: usize) -> Result<usize> {
        self.table.a_to_b(position).map_err(Error::Lookup)
    }

    /// Translates a 1-based consensus position to the reference (`0` if it
    /// has no counterpart).
    pub fn consensus_to_ref(&self, position: usize) -> Result<usize> {
        self.table.b_to_a(position).map_err(Error::Lookup)
    }

    /// Gets the accumulator at a 0-based consensus position.
    pub fn get(&self, position: usize) -> Option<&Stats> {
        self.stats.get(position)
    }

    /// Gets the accumulator at a 0-based consensus position mutably.
    pub fn get_mut(&mut self, position: usize) -> Option<&mut Stats> {
        self.stats.get_mut(position)
    }

    /// Folds an observation into the accumulator at a 0-based consensus
    /// position.
    ///
    /// An out-of-range position is reported and leaves every accumulator
    /// untouched.
    pub fn update(&mut self, position: usize, observation: &Observation<'_>) -> Result<()> {
        let len = self.len();

        self.stats
            .get_mut(position)
            .ok_or(Error::OutOfRange { position, len })?
            .update(observation);

        Ok(())
    }

    /// Folds every base call of a read aligned to the consensus into the
    /// pileup.
    ///
    /// When a `scheme` is given, each call is tagged with whether its
    /// reference position lies in a primer, and the read is assigned to the
    /// smallest amplicon containing its reference span. Primer coordinates
    /// are in the reference, so both go through the lookup table first.
    ///
    /// A read that cannot be interpreted against the consensus leaves the
    /// pileup untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_qc::alignment::Alignment;
    /// use consensus_qc::pileup::Builder;
    /// use omics::coordinate::Strand;
    ///
    /// let msa = consensus_qc::msa::read(&b">ref\nACGT\n>cons\nACGT\n"[..])?;
    /// let mut pileup = Builder::default().try_build(b"ACGT".to_vec(), &msa)?;
    ///
    /// let alignment = Alignment::new(1, 0, "3M".parse()?);
    /// pileup.add_read(&alignment, b"CGA", Strand::Negative, None)?;
    ///
    /// assert_eq!(pileup[1].reverse().reference(), 1);
    /// assert_eq!(pileup[3].reverse().alternate(), 1);
    /// assert!(pileup[0].is_empty());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn add_read(
        &mut self,
        alignment: &Alignment,
        query: &[u8],
        strand: Strand,
        scheme: Option<&Scheme>,
    ) -> Result<()> {
        let calls = parse_cigar(Some(self.consensus.as_slice()), query, alignment)
            .map_err(Error::Alignment)?;

        let amplicon = scheme.and_then(|scheme| {
            let start = self.to_reference(alignment.reference_start())?;
            let last = self.to_reference(alignment.reference_end().checked_sub(1)?)?;
            scheme.assign(start, last + 1).map(Amplicon::name)
        });

        for (position, base) in calls {
            let in_primer = scheme
                .zip(self.to_reference(position))
                .map(|(scheme, position)| scheme.in_primer(position))
                .unwrap_or(false);

            let observation = Observation::new(base, strand.clone(), in_primer, amplicon);
            self.update(position, &observation)?;
        }

        Ok(())
    }

    /// Translates a 0-based consensus position into a 0-based reference
    /// position.
    fn to_reference(&self, position: usize) -> Option<usize> {
        match self.table.b_to_a(position + 1) {
            Ok(UNMAPPED) | Err(_) => None,
            Ok(position) => Some(position - 1),
        }
    }

    /// Adds all of the evidence in `other` to `self`.
    ///
    /// Both pileups must share the same consensus, lookup table, and
    /// configuration.
    pub fn merge(&mut self, other: &Pileup) -> Result<()> {
        if self.consensus != other.consensus
            || self.table != other.table
            || self.config != other.config
        {
            return Err(Error::Incompatible);
        }

        for (stats, other) in self.stats.iter_mut().zip(&other.stats) {
            stats.merge(other);
        }

        Ok(())
    }

    /// Judges a 0-based consensus position.
    pub fn verdict(&self, position: usize) -> Option<Verdict> {
        self.get(position).map(|stats| self.config.evaluate(stats))
    }

    /// Judges every consensus position, in order.
    pub fn verdicts(&self) -> impl Iterator<Item = Verdict> + '_ {
        self.stats.iter().map(|stats| self.config.evaluate(stats))
    }

    /// Produces the consensus with every failing position replaced by
    /// [`MASK`](crate::mask::MASK).
    ///
    /// Positions that were never observed fail, so an empty pileup masks
    /// every position.
    pub fn mask(&self) -> String {
        self.consensus
            .iter()
            .zip(self.verdicts())
            .map(|(base, verdict)| match verdict.is_pass() {
                true => char::from(*base),
                false => char::from(crate::mask::MASK),
            })
            .collect()
    }

    /// Summarizes the verdicts across every position.
    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();

        for stats in &self.stats {
            let verdict = self.config.evaluate(stats);
            summary.push(&verdict, self.config.usable(stats).total());
        }

        summary
    }

    /// Writes a tab-separated table of the evidence and verdict at every
    /// position, preceded by a header row.
    pub fn write_tsv<W>(&self, writer: W) -> csv::Result<()>
    where
        W: io::Write,
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);

        for (i, stats) in self.stats.iter().enumerate() {
            let verdict = self.config.evaluate(stats);

            let amplicons = match stats.amplicons().is_empty() {
                true => String::from(EMPTY),
                false => stats
                    .amplicons()
                    .iter()
                    .map(|(name, tally)| format!("{name}:{}", tally.total()))
                    .collect::<Vec<_>>()
                    .join(","),
            };

            let (status, reasons) = match verdict {
                Verdict::Pass => ("PASS", String::from(EMPTY)),
                Verdict::Fail(_) => ("FAIL", verdict.to_string()),
            };

            let total = stats.total();
            let forward = stats.forward();
            let reverse = stats.reverse();

            writer.serialize(Row {
                cons_pos: i + 1,
                ref_pos: self.table.b_to_a(i + 1).unwrap_or_default(),
                cons_base: char::from(stats.base()),
                depth: total.total(),
                ref_count: total.reference(),
                alt_count: total.alternate(),
                fwd_ref: forward.reference(),
                fwd_alt: forward.alternate(),
                rev_ref: reverse.reference(),
                rev_alt: reverse.alternate(),
                in_primer: stats.in_primers().total(),
                amplicons,
                status,
                reasons,
            })?;
        }

        writer.flush()?;

        Ok(())
    }
}

impl Index<usize> for Pileup {
    type Output = Stats;

    fn index(&self, position: usize) -> &Self::Output {
        &self.stats[position]
    }
}

impl IndexMut<usize> for Pileup {
    fn index_mut(&mut self, position: usize) -> &mut Self::Output {
        &mut self.stats[position]
    }
}
