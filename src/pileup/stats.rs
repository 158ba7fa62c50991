//! Per-position accumulation of read evidence.

use std::collections::BTreeMap;

use crate::pileup::Observation;

/// Counts of observations agreeing and disagreeing with the consensus base.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Tally {
    /// Observations matching the consensus base.
    reference: usize,

    /// Observations of any other base (gaps included).
    alternate: usize,
}

impl Tally {
    /// Creates a new [`Tally`].
    pub fn new(reference: usize, alternate: usize) -> Self {
        Self {
            reference,
            alternate,
        }
    }

    /// The number of observations matching the consensus base.
    pub fn reference(&self) -> usize {
        self.reference
    }

    /// The number of observations differing from the consensus base.
    pub fn alternate(&self) -> usize {
        self.alternate
    }

    /// The total number of observations.
    pub fn total(&self) -> usize {
        self.reference + self.alternate
    }

    /// The fraction of observations differing from the consensus base.
    ///
    /// Returns [`None`] when there are no observations.
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_qc::pileup::stats::Tally;
    ///
    /// assert_eq!(Tally::new(8, 2).alternate_fraction(), Some(0.2));
    /// assert_eq!(Tally::default().alternate_fraction(), None);
    /// ```
    pub fn alternate_fraction(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.alternate as f64 / total as f64),
        }
    }

    /// Records a single observation.
    fn add(&mut self, matches: bool) {
        match matches {
            true => self.reference += 1,
            false => self.alternate += 1,
        }
    }
}

impl std::ops::Add for Tally {
    type Output = Tally;

    fn add(self, rhs: Self) -> Self::Output {
        Tally::new(self.reference + rhs.reference, self.alternate + rhs.alternate)
    }
}

impl std::ops::AddAssign for Tally {
    fn add_assign(&mut self, rhs: Self) {
        self.reference += rhs.reference;
        self.alternate += rhs.alternate;
    }
}

/// A [`Tally`] for each strand.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
struct Stranded {
    /// Observations from forward-strand reads.
    forward: Tally,

    /// Observations from reverse-strand reads.
    reverse: Tally,
}

impl Stranded {
    /// Both strands combined.
    fn total(&self) -> Tally {
        self.forward + self.reverse
    }
}

/// The evidence accumulated at one consensus position.
///
/// Observations are split by whether they fall inside a primer-binding
/// region and by strand, and are additionally tallied per amplicon.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Stats {
    /// The consensus base at this position.
    base: u8,

    /// Observations outside primer-binding regions.
    outside: Stranded,

    /// Observations inside primer-binding regions.
    inside: Stranded,

    /// Observations per assigned amplicon.
    amplicons: BTreeMap<String, Tally>,
}

impl Stats {
    /// Creates an empty [`Stats`] for a position whose consensus base is
    /// `base`.
    pub fn new(base: u8) -> Self {
        Self {
            base,
            outside: Stranded::default(),
            inside: Stranded::default(),
            amplicons: BTreeMap::new(),
        }
    }

    /// Gets the consensus base at this position.
    pub fn base(&self) -> u8 {
        self.base
    }

    /// Folds one observation into the accumulator.
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_qc::pileup::Observation;
    /// use consensus_qc::pileup::Stats;
    /// use omics::coordinate::Strand;
    ///
    /// let mut stats = Stats::new(b'A');
    /// stats.update(&Observation::new(b'A', Strand::Positive, false, Some("amp1")));
    /// stats.update(&Observation::new(b'-', Strand::Negative, false, Some("amp1")));
    /// stats.update(&Observation::new(b'A', Strand::Negative, true, None));
    ///
    /// assert_eq!(stats.depth(), 3);
    /// assert_eq!(stats.total().alternate(), 1);
    /// assert_eq!(stats.in_primers().total(), 1);
    /// assert_eq!(stats.amplicons()["amp1"].total(), 2);
    /// ```
    pub fn update(&mut self, observation: &Observation<'_>) {
        let matches = observation.base().eq_ignore_ascii_case(&self.base);

        let stranded = match observation.in_primer() {
            true => &mut self.inside,
            false => &mut self.outside,
        };

        match observation.is_forward() {
            true => stranded.forward.add(matches),
            false => stranded.reverse.add(matches),
        }

        if let Some(name) = observation.amplicon() {
            match self.amplicons.get_mut(name) {
                Some(tally) => tally.add(matches),
                None => {
                    let mut tally = Tally::default();
                    tally.add(matches);
                    self.amplicons.insert(name.to_string(), tally);
                }
            }
        }
    }

    /// Adds all of the evidence in `other` to `self`.
    ///
    /// Accumulation is a sum of counters, so independently accumulated
    /// [`Stats`] may be merged in any order.
    pub fn merge(&mut self, other: &Stats) {
        self.outside.forward += other.outside.forward;
        self.outside.reverse += other.outside.reverse;
        self.inside.forward += other.inside.forward;
        self.inside.reverse += other.inside.reverse;

        for (name, tally) in &other.amplicons {
            *self.amplicons.entry(name.clone()).or_default() += *tally;
        }
    }

    /// The total number of observations.
    pub fn depth(&self) -> usize {
        self.total().total()
    }

    /// Whether no observations have been made.
    pub fn is_empty(&self) -> bool {
        self.depth() == 0
    }

    /// All observations.
    pub fn total(&self) -> Tally {
        self.outside.total() + self.inside.total()
    }

    /// Observations outside primer-binding regions.
    pub fn outside_primers(&self) -> Tally {
        self.outside.total()
    }

    /// Observations inside primer-binding regions.
    pub fn in_primers(&self) -> Tally {
        self.inside.total()
    }

    /// Observations from forward-strand reads.
    pub fn forward(&self) -> Tally {
        self.outside.forward + self.inside.forward
    }

    /// Observations from reverse-strand reads.
    pub fn reverse(&self) -> Tally {
        self.outside.reverse + self.inside.reverse
    }

    /// Observations per assigned amplicon.
    pub fn amplicons(&self) -> &BTreeMap<String, Tally> {
        &self.amplicons
    }
}

#[cfg(test)]
mod tests {
    use omics::coordinate::Strand;

    use super::*;

    #[test]
    fn test_splits_evidence_by_strand_and_primer() {
        let mut stats = Stats::new(b'C');

        stats.update(&Observation::new(b'C', Strand::Positive, false, None));
        stats.update(&Observation::new(b'c', Strand::Positive, false, None));
        stats.update(&Observation::new(b'T', Strand::Negative, false, None));
        stats.update(&Observation::new(b'C', Strand::Negative, true, None));

        assert_eq!(stats.depth(), 4);
        assert_eq!(stats.forward(), Tally::new(2, 0));
        assert_eq!(stats.reverse(), Tally::new(1, 1));
        assert_eq!(stats.outside_primers(), Tally::new(2, 1));
        assert_eq!(stats.in_primers(), Tally::new(1, 0));
        assert!(stats.amplicons().is_empty());
    }

    #[test]
    fn test_merges_in_any_order() {
        let mut a = Stats::new(b'G');
        a.update(&Observation::new(b'G', Strand::Positive, false, Some("amp1")));
        a.update(&Observation::new(b'A', Strand::Negative, true, Some("amp2")));

        let mut b = Stats::new(b'G');
        b.update(&Observation::new(b'G', Strand::Negative, false, Some("amp2")));

        let mut ab = a.clone();
        ab.merge(&b);

        let mut ba = b.clone();
        ba.merge(&a);

        assert_eq!(ab, ba);
        assert_eq!(ab.depth(), 3);
        assert_eq!(ab.amplicons()["amp2"], Tally::new(1, 1));
    }

    #[test]
    fn test_starts_empty() {
        let stats = Stats::new(b'A');
        assert!(stats.is_empty());
        assert_eq!(stats.total().alternate_fraction(), None);
    }
}
