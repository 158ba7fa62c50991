//! A two-record multiple sequence alignment used as a coordinate bridge.
//!
//! The alignment is read from FASTA, where both records have the same width
//! and alignment columns missing from a record are marked with [`GAP`]. The
//! record order is fixed: the first record defines coordinate system A (the
//! original reference) and the second defines coordinate system B (the
//! polished consensus).

use std::io;
use std::io::BufRead;

use noodles::fasta;

/// The gap character within an aligned record.
pub const GAP: u8 = b'-';

/// The number of records an MSA must contain.
pub const NUM_RECORDS: usize = 2;

/// An error related to reading an [`Msa`].
#[derive(Debug)]
pub enum Error {
    /// An I/O error.
    Io(io::Error),

    /// The input did not contain exactly [`NUM_RECORDS`] records.
    RecordCount(usize),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::RecordCount(n) => write!(
                f,
                "invalid number of records in alignment: expected {NUM_RECORDS}, found {n}"
            ),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// A single aligned record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Row {
    /// The record name.
    name: String,

    /// The aligned sequence, including gaps.
    sequence: Vec<u8>,
}

impl Row {
    /// Creates a new [`Row`].
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_qc::msa::Row;
    ///
    /// let row = Row::new("ref", "AC--GT");
    /// assert_eq!(row.name(), "ref");
    /// assert_eq!(row.ungapped(), b"ACGT");
    /// ```
    pub fn new(name: impl Into<String>, sequence: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            sequence: sequence.into(),
        }
    }

    /// Gets the record name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the aligned sequence, gaps included.
    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    /// Gets the number of alignment columns.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Gets the sequence with all gaps removed.
    pub fn ungapped(&self) -> Vec<u8> {
        self.sequence
            .iter()
            .copied()
            .filter(|base| *base != GAP)
            .collect()
    }
}

/// A two-record multiple sequence alignment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Msa {
    /// The first record (coordinate system A).
    a: Row,

    /// The second record (coordinate system B).
    b: Row,
}

impl Msa {
    /// Creates a new [`Msa`] from its two records.
    pub fn new(a: Row, b: Row) -> Self {
        Self { a, b }
    }

    /// Gets the first record (coordinate system A).
    pub fn a(&self) -> &Row {
        &self.a
    }

    /// Gets the second record (coordinate system B).
    pub fn b(&self) -> &Row {
        &self.b
    }

    /// Consumes `self` and returns both records.
    pub fn into_rows(self) -> (Row, Row) {
        (self.a, self.b)
    }
}

/// Reads an [`Msa`] from FASTA.
///
/// # Examples
///
/// ```
/// let data = b">ref\nACTG--A\n>cons\nAC-GTTA\n";
/// let msa = consensus_qc::msa::read(&data[..])?;
///
/// assert_eq!(msa.a().name(), "ref");
/// assert_eq!(msa.b().sequence(), b"AC-GTTA");
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn read<T>(inner: T) -> Result<Msa>
where
    T: BufRead,
{
    let mut reader = fasta::io::Reader::new(inner);

    let rows = reader
        .records()
        .map(|result| {
            result.map(|record| {
                Row::new(
                    String::from_utf8_lossy(record.name()).to_string(),
                    record.sequence().as_ref().to_vec(),
                )
            })
        })
        .collect::<io::Result<Vec<_>>>()
        .map_err(Error::Io)?;

    let n = rows.len();
    let mut rows = rows.into_iter();

    match (rows.next(), rows.next(), rows.next()) {
        (Some(a), Some(b), None) => Ok(Msa::new(a, b)),
        _ => Err(Error::RecordCount(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_a_two_record_alignment() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let data = b">ref\nACTGACT--ATCG\nATCGATCGATCAG\n>cons\n---GACTGCAGC-\n-TCGCACG-----\n";
        let msa = read(&data[..])?;

        assert_eq!(msa.a().len(), 26);
        assert_eq!(msa.b().len(), 26);
        assert_eq!(msa.a().ungapped(), b"ACTGACTATCGATCGATCGATCAG");
        assert_eq!(msa.b().ungapped(), b"GACTGCAGCTCGCACG");

        Ok(())
    }

    #[test]
    fn test_rejects_the_wrong_number_of_records() {
        let err = read(&b">ref\nACGT\n"[..]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid number of records in alignment: expected 2, found 1"
        );

        let err = read(&b">a\nA\n>b\nA\n>c\nA\n"[..]).unwrap_err();
        assert!(matches!(err, Error::RecordCount(3)));
    }
}
