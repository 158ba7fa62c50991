//! A bidirectional position lookup table between two coordinate systems.

pub mod builder;

pub use builder::Builder;

/// The position returned when a position has no counterpart yet in the
/// other coordinate system.
pub const UNMAPPED: usize = 0;

/// An error related to a [`Table`] lookup.
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// The position lies beyond the ungapped length of its sequence.
    OutOfRange {
        /// The coordinate system of the requested position.
        system: System,

        /// The requested (1-based) position.
        position: usize,

        /// The ungapped length of the sequence.
        len: usize,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::OutOfRange {
                system,
                position,
                len,
            } => write!(
                f,
                "position {position} is out of range for the {system} sequence of length {len}"
            ),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// One of the two coordinate systems bridged by a [`Table`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum System {
    /// The original reference (the first aligned record).
    Reference,

    /// The polished consensus (the second aligned record).
    Consensus,
}

impl std::fmt::Display for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            System::Reference => write!(f, "reference"),
            System::Consensus => write!(f, "consensus"),
        }
    }
}

/// A pair of monotonic lookup tables translating 1-based positions between a
/// reference (system A) and a consensus (system B).
///
/// Position `0` is the sentinel [`UNMAPPED`]: looking it up returns `0`, and a
/// lookup returns `0` when the position precedes the first aligned base of
/// the other sequence. Positions inside a run inserted relative to the other
/// sequence all map to the same counterpart (the last position before the
/// run).
///
/// A [`Table`] cannot be instantiated directly. Use a [`Builder`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Table {
    /// Maps reference positions to consensus positions (index `0` is the
    /// sentinel).
    a_to_b: Vec<usize>,

    /// Maps consensus positions to reference positions (index `0` is the
    /// sentinel).
    b_to_a: Vec<usize>,
}

impl Table {
    /// The ungapped length of the reference.
    pub fn reference_len(&self) -> usize {
        self.a_to_b.len() - 1
    }

    /// The ungapped length of the consensus.
    pub fn consensus_len(&self) -> usize {
        self.b_to_a.len() - 1
    }

    /// Translates a 1-based reference position into the consensus.
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_qc::liftover::table::Builder;
    ///
    /// let table = Builder::default().try_build_from(b"ACGT--A", b"-CGTTTA")?;
    ///
    /// assert_eq!(table.a_to_b(1)?, 0);
    /// assert_eq!(table.a_to_b(2)?, 1);
    /// assert_eq!(table.a_to_b(5)?, 6);
    /// assert!(table.a_to_b(6).is_err());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn a_to_b(&self, position: usize) -> Result<usize> {
        lookup(&self.a_to_b, System::Reference, position)
    }

    /// Translates a 1-based consensus position into the reference.
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_qc::liftover::table::Builder;
    ///
    /// let table = Builder::default().try_build_from(b"ACGT--A", b"-CGTTTA")?;
    ///
    /// assert_eq!(table.b_to_a(4)?, 4);
    /// assert_eq!(table.b_to_a(5)?, 4);
    /// assert_eq!(table.b_to_a(6)?, 5);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn b_to_a(&self, position: usize) -> Result<usize> {
        lookup(&self.b_to_a, System::Consensus, position)
    }

    /// Translates a 1-based position from one coordinate system to another.
    ///
    /// Translating within the same system is the identity (after a range
    /// check).
    pub fn lift(&self, position: usize, from: System, to: System) -> Result<usize> {
        match (from, to) {
            (System::Reference, System::Consensus) => self.a_to_b(position),
            (System::Consensus, System::Reference) => self.b_to_a(position),
            (System::Reference, System::Reference) => {
                check(self.reference_len(), from, position).map(|_| position)
            }
            (System::Consensus, System::Consensus) => {
                check(self.consensus_len(), from, position).map(|_| position)
            }
        }
    }
}

/// Ensures a position lies within a sequence of length `len`.
fn check(len: usize, system: System, position: usize) -> Result<()> {
    if position > len {
        return Err(Error::OutOfRange {
            system,
            position,
            len,
        });
    }

    Ok(())
}

/// Looks up a position in a single direction of the table.
fn lookup(table: &[usize], system: System, position: usize) -> Result<usize> {
    check(table.len() - 1, system, position)?;
    Ok(table[position])
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The reference row used throughout the tests:
    ///
    /// ```text
    ///               1          2
    /// 1     7  8    3          4
    /// ACTGACT--ATCGATCGATCGATCAG
    /// ---GACTGCAGC--TCGCACG-----
    ///    1  4  7    1     1
    ///               0     6
    /// ```
    const REF_FIRST: (&[u8], &[u8]) = (b"ACTGACT--ATCGATCGATCGATCAG", b"---GACTGCAGC--TCGCACG-----");

    #[test]
    fn test_translates_between_reference_and_consensus()
    -> std::result::Result<(), Box<dyn std::error::Error>> {
        let table = Builder::default().try_build_from(REF_FIRST.0, REF_FIRST.1)?;

        assert_eq!(table.reference_len(), 24);
        assert_eq!(table.consensus_len(), 16);

        assert_eq!(table.a_to_b(1)?, UNMAPPED);
        assert_eq!(table.a_to_b(7)?, 4);
        assert_eq!(table.b_to_a(4)?, 7);
        assert_eq!(table.a_to_b(13)?, 10);
        assert_eq!(table.a_to_b(8)?, 7);
        assert_eq!(table.b_to_a(7)?, 8);
        assert_eq!(table.b_to_a(10)?, 13);
        assert_eq!(table.a_to_b(24)?, 16);
        assert_eq!(table.b_to_a(16)?, 19);

        Ok(())
    }

    #[test]
    fn test_handles_a_shorter_consensus() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let table = Builder::default()
            .reference(b"GACTGCAGCGCCCTTCGCACG".to_vec())
            .try_build_from(b"GACTGCAGCGCCCT--TCGCACG", b"----ACT--ATCGATCGATT---")?;

        assert_eq!(table.a_to_b(1)?, UNMAPPED);
        assert_eq!(table.a_to_b(3)?, UNMAPPED);
        assert_eq!(table.a_to_b(5)?, 1);
        assert_eq!(table.b_to_a(1)?, 5);
        assert_eq!(table.a_to_b(10)?, 4);
        assert_eq!(table.b_to_a(4)?, 10);
        assert_eq!(table.a_to_b(15)?, 11);
        assert_eq!(table.b_to_a(11)?, 15);

        Ok(())
    }

    #[test]
    fn test_handles_a_shorter_reference() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let table = Builder::default()
            .reference(b"ACTATCGATCGATT".to_vec())
            .try_build_from(b"----ACT--ATCGATCGATT---", b"GACTGCAGCGCCCT--TCGCACG")?;

        assert_eq!(table.b_to_a(10)?, 4);
        assert_eq!(table.a_to_b(4)?, 10);
        assert_eq!(table.b_to_a(15)?, 11);
        assert_eq!(table.a_to_b(11)?, 15);

        Ok(())
    }

    #[test]
    fn test_is_the_identity_without_gaps() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let seq = b"ACTGACTATCGATCGATCGATCAG";
        let table = Builder::default().try_build_from(seq, seq)?;

        for position in 0..=seq.len() {
            assert_eq!(table.a_to_b(position)?, position);
            assert_eq!(table.b_to_a(position)?, position);
        }

        Ok(())
    }

    #[test]
    fn test_is_monotonic() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let table = Builder::default().try_build_from(REF_FIRST.0, REF_FIRST.1)?;

        for position in 1..table.reference_len() {
            assert!(table.a_to_b(position)? <= table.a_to_b(position + 1)?);
        }

        for position in 1..table.consensus_len() {
            assert!(table.b_to_a(position)? <= table.b_to_a(position + 1)?);
        }

        Ok(())
    }

    #[test]
    fn test_rejects_positions_beyond_the_sequence() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let table = Builder::default().try_build_from(REF_FIRST.0, REF_FIRST.1)?;

        let err = table.a_to_b(25).unwrap_err();
        assert_eq!(
            err.to_string(),
            "position 25 is out of range for the reference sequence of length 24"
        );

        assert!(table.b_to_a(17).is_err());
        assert_eq!(table.b_to_a(0)?, UNMAPPED);

        Ok(())
    }

    #[test]
    fn test_lifts_between_systems() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let table = Builder::default().try_build_from(REF_FIRST.0, REF_FIRST.1)?;

        assert_eq!(table.lift(7, System::Reference, System::Consensus)?, 4);
        assert_eq!(table.lift(7, System::Consensus, System::Reference)?, 8);
        assert_eq!(table.lift(20, System::Reference, System::Reference)?, 20);
        assert!(table.lift(20, System::Consensus, System::Consensus).is_err());

        Ok(())
    }
}
