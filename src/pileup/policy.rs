//! The per-position pass/fail test.
//!
//! A position fails if it has too few usable observations or if its
//! alternate-allele fraction falls in the ambiguous middle band
//! `[bias_threshold, 1 - bias_threshold]` (both ends inclusive). Positions
//! that are confidently one allele or the other pass. A position with no
//! usable observations always fails.

use nonempty::NonEmpty;

use crate::pileup::Stats;
use crate::pileup::stats::Tally;

/// The default minimum number of usable observations.
pub const DEFAULT_DEPTH_THRESHOLD: usize = 20;

/// The default allele-bias threshold.
pub const DEFAULT_BIAS_THRESHOLD: f64 = 0.1;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to building a [`Config`].
#[derive(Debug, PartialEq)]
pub enum Error {
    /// The bias threshold is not a fraction within `[0, 1]`.
    InvalidBiasThreshold(f64),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidBiasThreshold(value) => {
                write!(f, "invalid bias threshold: {value} is not within [0, 1]")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Verdicts
////////////////////////////////////////////////////////////////////////////////////////

/// A reason a position failed.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Reason {
    /// No usable observations were made at the position.
    NoCoverage,

    /// Fewer usable observations than the depth threshold.
    LowDepth,

    /// The alternate-allele fraction is in the ambiguous middle band.
    AlleleBias,
}

impl Reason {
    /// All reasons, in reporting order.
    pub const ALL: [Reason; 3] = [Reason::NoCoverage, Reason::LowDepth, Reason::AlleleBias];

    /// The identifier used for this reason in VCF `FILTER` fields and tables.
    pub fn id(&self) -> &'static str {
        match self {
            Reason::NoCoverage => "NO_COVERAGE",
            Reason::LowDepth => "LOW_DEPTH",
            Reason::AlleleBias => "ALLELE_BIAS",
        }
    }

    /// A human-readable description of the reason.
    pub fn description(&self) -> &'static str {
        match self {
            Reason::NoCoverage => "No read support at this position",
            Reason::LowDepth => "Read depth below the self-QC depth threshold",
            Reason::AlleleBias => "Mixed alternate-allele fraction at this position",
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// The outcome of testing one position.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// The position is trustworthy.
    Pass,

    /// The position must be masked.
    Fail(NonEmpty<Reason>),
}

impl Verdict {
    /// Whether the position passed.
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }

    /// Whether the position failed.
    pub fn is_fail(&self) -> bool {
        !self.is_pass()
    }

    /// The reasons for failure (empty for a pass).
    pub fn reasons(&self) -> impl Iterator<Item = &Reason> + '_ {
        let reasons = match self {
            Verdict::Pass => None,
            Verdict::Fail(reasons) => Some(reasons.iter()),
        };

        reasons.into_iter().flatten()
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Fail(reasons) => {
                let ids = reasons.iter().map(|r| r.id()).collect::<Vec<_>>();
                write!(f, "{}", ids.join(";"))
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Configuration
////////////////////////////////////////////////////////////////////////////////////////

/// The thresholds used to test each position.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// The minimum number of usable observations.
    depth_threshold: usize,

    /// The lower edge of the failing alternate-allele band.
    bias_threshold: f64,

    /// Whether observations inside primer-binding regions are excluded.
    exclude_primers: bool,
}

impl Config {
    /// Gets the depth threshold.
    pub fn depth_threshold(&self) -> usize {
        self.depth_threshold
    }

    /// Gets the bias threshold.
    pub fn bias_threshold(&self) -> f64 {
        self.bias_threshold
    }

    /// Whether primer-region observations are excluded.
    pub fn exclude_primers(&self) -> bool {
        self.exclude_primers
    }

    /// The observations the tests are applied to.
    pub fn usable(&self, stats: &Stats) -> Tally {
        match self.exclude_primers {
            true => stats.outside_primers(),
            false => stats.total(),
        }
    }

    /// Tests one position.
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_qc::pileup::Observation;
    /// use consensus_qc::pileup::Stats;
    /// use consensus_qc::pileup::policy::Builder;
    /// use consensus_qc::pileup::policy::Reason;
    /// use omics::coordinate::Strand;
    ///
    /// let config = Builder::default()
    ///     .depth_threshold(4)
    ///     .bias_threshold(0.3)
    ///     .try_build()?;
    ///
    /// let mut stats = Stats::new(b'A');
    /// for base in b"AAAT" {
    ///     stats.update(&Observation::new(*base, Strand::Positive, false, None));
    /// }
    /// assert!(config.evaluate(&stats).is_pass());
    ///
    /// stats.update(&Observation::new(b'T', Strand::Negative, false, None));
    /// let verdict = config.evaluate(&stats);
    /// assert_eq!(verdict.reasons().collect::<Vec<_>>(), vec![&Reason::AlleleBias]);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn evaluate(&self, stats: &Stats) -> Verdict {
        let usable = self.usable(stats);

        let fraction = match usable.alternate_fraction() {
            Some(fraction) => fraction,
            None => return Verdict::Fail(NonEmpty::new(Reason::NoCoverage)),
        };

        let mut reasons = Vec::new();

        if usable.total() < self.depth_threshold {
            reasons.push(Reason::LowDepth);
        }

        if self.bias_threshold <= fraction && fraction <= 1.0 - self.bias_threshold {
            reasons.push(Reason::AlleleBias);
        }

        match NonEmpty::from_vec(reasons) {
            Some(reasons) => Verdict::Fail(reasons),
            None => Verdict::Pass,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            depth_threshold: DEFAULT_DEPTH_THRESHOLD,
            bias_threshold: DEFAULT_BIAS_THRESHOLD,
            exclude_primers: true,
        }
    }
}

/// A builder for a [`Config`].
#[derive(Debug, Default)]
pub struct Builder {
    /// The minimum number of usable observations.
    depth_threshold: Option<usize>,

    /// The lower edge of the failing alternate-allele band.
    bias_threshold: Option<f64>,

    /// Whether observations inside primer-binding regions are excluded.
    exclude_primers: Option<bool>,
}

impl Builder {
    /// Sets the depth threshold.
    pub fn depth_threshold(mut self, value: usize) -> Self {
        self.depth_threshold = Some(value);
        self
    }

    /// Sets the bias threshold.
    pub fn bias_threshold(mut self, value: f64) -> Self {
        self.bias_threshold = Some(value);
        self
    }

    /// Sets whether primer-region observations are excluded.
    pub fn exclude_primers(mut self, value: bool) -> Self {
        self.exclude_primers = Some(value);
        self
    }

    /// Consumes `self` to attempt to build a [`Config`].
    ///
    /// Unset values take their defaults.
    pub fn try_build(self) -> Result<Config> {
        let defaults = Config::default();

        let bias_threshold = self.bias_threshold.unwrap_or(defaults.bias_threshold);
        if !(0.0..=1.0).contains(&bias_threshold) {
            return Err(Error::InvalidBiasThreshold(bias_threshold));
        }

        Ok(Config {
            depth_threshold: self.depth_threshold.unwrap_or(defaults.depth_threshold),
            bias_threshold,
            exclude_primers: self.exclude_primers.unwrap_or(defaults.exclude_primers),
        })
    }
}

/// Whether a position fails the depth or allele-bias test (primer-region
/// observations excluded).
pub fn check_for_failure(stats: &Stats, depth_threshold: usize, bias_threshold: f64) -> bool {
    let config = Config {
        depth_threshold,
        bias_threshold,
        exclude_primers: true,
    };

    config.evaluate(stats).is_fail()
}

#[cfg(test)]
mod tests {
    use omics::coordinate::Strand;

    use super::*;
    use crate::pileup::Observation;

    /// Accumulates a column of bases against a consensus base of `A`.
    fn column(bases: &[u8]) -> Stats {
        let mut stats = Stats::new(b'A');

        for base in bases {
            stats.update(&Observation::new(*base, Strand::Positive, false, Some("amp1")));
            stats.update(&Observation::new(*base, Strand::Negative, false, Some("amp2")));
        }

        stats
    }

    #[test]
    fn test_fails_positions_in_the_ambiguous_band() {
        // 20% alternate alleles.
        let stats = column(b"AACTAAAAAA");
        assert!(check_for_failure(&stats, 0, 0.2));
        assert!(check_for_failure(&stats, 0, 0.1));
        assert!(!check_for_failure(&stats, 0, 0.3));
    }

    #[test]
    fn test_passes_confident_positions() {
        // 0% and 100% alternate alleles.
        assert!(!check_for_failure(&column(b"AAAAAAAAAA"), 20, 0.1));
        assert!(!check_for_failure(&column(b"TTTGGGTGCC"), 20, 0.1));
    }

    #[test]
    fn test_fails_shallow_positions() {
        let stats = column(b"AAAAA");

        let verdict = Config::default().evaluate(&stats);
        assert_eq!(verdict, Verdict::Fail(NonEmpty::new(Reason::LowDepth)));
        assert_eq!(verdict.to_string(), "LOW_DEPTH");

        assert!(!check_for_failure(&stats, 10, 0.1));
        assert!(check_for_failure(&stats, 11, 0.1));
    }

    #[test]
    fn test_reports_every_failing_test() {
        let verdict = Config::default().evaluate(&column(b"AT"));
        assert_eq!(verdict.to_string(), "LOW_DEPTH;ALLELE_BIAS");
        assert_eq!(verdict.reasons().count(), 2);
    }

    #[test]
    fn test_always_fails_uncovered_positions() {
        let stats = Stats::new(b'A');
        assert!(check_for_failure(&stats, 0, 0.0));

        let verdict = Config::default().evaluate(&stats);
        assert_eq!(verdict, Verdict::Fail(NonEmpty::new(Reason::NoCoverage)));
    }

    #[test]
    fn test_excludes_primer_observations() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut stats = Stats::new(b'A');
        for _ in 0..30 {
            stats.update(&Observation::new(b'A', Strand::Positive, true, None));
        }

        let verdict = Config::default().evaluate(&stats);
        assert_eq!(verdict, Verdict::Fail(NonEmpty::new(Reason::NoCoverage)));

        let config = Builder::default().exclude_primers(false).try_build()?;
        assert!(config.evaluate(&stats).is_pass());

        Ok(())
    }

    #[test]
    fn test_rejects_invalid_bias_thresholds() {
        let err = Builder::default().bias_threshold(1.5).try_build().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid bias threshold: 1.5 is not within [0, 1]"
        );

        assert!(Builder::default().bias_threshold(f64::NAN).try_build().is_err());
    }
}
