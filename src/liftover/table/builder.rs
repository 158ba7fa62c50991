//! A builder for a [`Table`].

use crate::liftover::Table;
use crate::msa;
use crate::msa::GAP;
use crate::msa::Msa;

/// An error related to building a [`Table`].
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// The two aligned rows have different widths.
    UnequalRowLengths(usize, usize),

    /// The ungapped first row does not match the expected reference.
    ReferenceMismatch,

    /// The ungapped second row does not match the expected consensus.
    ConsensusMismatch,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnequalRowLengths(a, b) => {
                write!(f, "aligned rows have unequal lengths: {a} and {b}")
            }
            Error::ReferenceMismatch => write!(
                f,
                "the first aligned record does not match the reference sequence"
            ),
            Error::ConsensusMismatch => write!(
                f,
                "the second aligned record does not match the consensus sequence"
            ),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// A builder for a [`Table`].
///
/// When an expected reference or consensus is set, the corresponding aligned
/// row must match it (ignoring gaps and case) or building fails.
#[derive(Debug, Default)]
pub struct Builder {
    /// The expected ungapped reference.
    reference: Option<Vec<u8>>,

    /// The expected ungapped consensus.
    consensus: Option<Vec<u8>>,
}

impl Builder {
    /// Sets the sequence the first aligned row must match.
    pub fn reference(mut self, sequence: impl Into<Vec<u8>>) -> Self {
        self.reference = Some(sequence.into());
        self
    }

    /// Sets the sequence the second aligned row must match.
    pub fn consensus(mut self, sequence: impl Into<Vec<u8>>) -> Self {
        self.consensus = Some(sequence.into());
        self
    }

    /// Builds a [`Table`] from an [`Msa`].
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_qc::liftover::table::Builder;
    ///
    /// let msa = consensus_qc::msa::read(&b">ref\nACGT--A\n>cons\n-CGTTTA\n"[..])?;
    /// let table = Builder::default()
    ///     .reference(b"ACGTA".to_vec())
    ///     .try_build_from_msa(&msa)?;
    ///
    /// assert_eq!(table.consensus_len(), 6);
    ///
    /// let err = Builder::default()
    ///     .reference(b"CGTTTA".to_vec())
    ///     .try_build_from_msa(&msa)
    ///     .unwrap_err();
    /// assert_eq!(
    ///     err.to_string(),
    ///     "the first aligned record does not match the reference sequence"
    /// );
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_build_from_msa(&self, msa: &Msa) -> Result<Table> {
        self.try_build_from(msa.a().sequence(), msa.b().sequence())
    }

    /// Builds a [`Table`] from two aligned rows of equal width.
    ///
    /// Each column advances the counter of every row without a gap. Whenever
    /// a row's counter advances, its table records the other row's counter as
    /// of that same column.
    pub fn try_build_from(&self, a: &[u8], b: &[u8]) -> Result<Table> {
        if a.len() != b.len() {
            return Err(Error::UnequalRowLengths(a.len(), b.len()));
        }

        validate(a, self.reference.as_deref(), Error::ReferenceMismatch)?;
        validate(b, self.consensus.as_deref(), Error::ConsensusMismatch)?;

        let mut a_to_b = vec![0];
        let mut b_to_a = vec![0];

        let mut count_a = 0;
        let mut count_b = 0;

        for (x, y) in a.iter().zip(b) {
            let advance_a = *x != GAP;
            let advance_b = *y != GAP;

            if advance_a {
                count_a += 1;
            }

            if advance_b {
                count_b += 1;
            }

            if advance_a {
                a_to_b.push(count_b);
            }

            if advance_b {
                b_to_a.push(count_a);
            }
        }

        Ok(Table { a_to_b, b_to_a })
    }
}

/// Checks that an aligned row matches an expected ungapped sequence.
fn validate(row: &[u8], expected: Option<&[u8]>, err: Error) -> Result<()> {
    let expected = match expected {
        Some(expected) => expected,
        None => return Ok(()),
    };

    let ungapped = msa::Row::new("", row).ungapped();

    if !ungapped.eq_ignore_ascii_case(expected) {
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_rows_of_unequal_length() {
        let err = Builder::default().try_build_from(b"ACGT", b"ACG").unwrap_err();
        assert_eq!(err, Error::UnequalRowLengths(4, 3));
        assert_eq!(err.to_string(), "aligned rows have unequal lengths: 4 and 3");
    }

    #[test]
    fn test_rejects_a_consensus_first_alignment() {
        let reference = b"ACTGACTATCGATCGATCGATCAG".to_vec();

        let err = Builder::default()
            .reference(reference)
            .try_build_from(b"---GACTGCAGC--TCGCACG-----", b"ACTGACT--ATCGATCGATCGATCAG")
            .unwrap_err();

        assert_eq!(err, Error::ReferenceMismatch);
    }

    #[test]
    fn test_validates_the_consensus() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let a = b"ACTGACT--ATCGATCGATCGATCAG";
        let b = b"---GACTGCAGC--TCGCACG-----";

        Builder::default()
            .reference(b"actgactatcgatcgatcgatcag".to_vec())
            .consensus(b"GACTGCAGCTCGCACG".to_vec())
            .try_build_from(a, b)?;

        let err = Builder::default()
            .consensus(b"GACTGCAGCTCGCAC".to_vec())
            .try_build_from(a, b)
            .unwrap_err();
        assert_eq!(err, Error::ConsensusMismatch);

        Ok(())
    }
}
