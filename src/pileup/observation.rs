//! A single base observed by a read at one consensus position.

use omics::coordinate::Strand;

/// A base observed by one read at one position, along with the read-level
/// and position-level metadata needed to attribute it.
#[derive(Clone, Debug)]
pub struct Observation<'a> {
    /// The observed base, or [`GAP`](crate::alignment::GAP) for a deletion.
    base: u8,

    /// The strand the read aligned to.
    strand: Strand,

    /// Whether the position falls within a primer-binding region.
    in_primer: bool,

    /// The amplicon the read was assigned to, if any.
    amplicon: Option<&'a str>,
}

impl<'a> Observation<'a> {
    /// Creates a new [`Observation`].
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_qc::pileup::Observation;
    /// use omics::coordinate::Strand;
    ///
    /// let observation = Observation::new(b'A', Strand::Positive, false, Some("amp1"));
    ///
    /// assert_eq!(observation.base(), b'A');
    /// assert!(observation.is_forward());
    /// assert!(!observation.in_primer());
    /// assert_eq!(observation.amplicon(), Some("amp1"));
    /// ```
    pub fn new(base: u8, strand: Strand, in_primer: bool, amplicon: Option<&'a str>) -> Self {
        Self {
            base,
            strand,
            in_primer,
            amplicon,
        }
    }

    /// Gets the observed base.
    pub fn base(&self) -> u8 {
        self.base
    }

    /// Gets the strand of the read.
    pub fn strand(&self) -> &Strand {
        &self.strand
    }

    /// Whether the read aligned to the forward strand.
    pub fn is_forward(&self) -> bool {
        matches!(self.strand, Strand::Positive)
    }

    /// Whether the position falls within a primer-binding region.
    pub fn in_primer(&self) -> bool {
        self.in_primer
    }

    /// Gets the amplicon the read was assigned to.
    pub fn amplicon(&self) -> Option<&'a str> {
        self.amplicon
    }
}
