//! Reconstruction of per-reference-position base calls from an alignment.

use crate::alignment::Cigar;
use crate::alignment::cigar::Kind;

/// The marker emitted for a reference position deleted (or skipped) by the
/// read.
pub const GAP: u8 = b'-';

/// An error related to interpreting an alignment.
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// An operation attempted to read past the end of the query sequence.
    QueryOverrun {
        /// The query offset that could not be read.
        offset: usize,

        /// The length of the query sequence.
        len: usize,
    },

    /// An operation attempted to emit a position past the end of the
    /// reference sequence.
    ReferenceOverrun {
        /// The reference position that could not be emitted.
        position: usize,

        /// The length of the reference sequence.
        len: usize,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::QueryOverrun { offset, len } => write!(
                f,
                "alignment reads past the end of the query: offset {offset}, query length {len}"
            ),
            Error::ReferenceOverrun { position, len } => write!(
                f,
                "alignment extends past the end of the reference: position {position}, reference \
                 length {len}"
            ),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// A read's alignment against a reference.
///
/// Both offsets are 0-based. The query offset may or may not already account
/// for a leading soft clip; see [`parse_cigar()`] for how the two are
/// reconciled.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Alignment {
    /// The reference position of the first aligned base.
    reference_start: usize,

    /// The query offset of the first aligned base.
    query_start: usize,

    /// The edit operations.
    cigar: Cigar,
}

impl Alignment {
    /// Creates a new [`Alignment`].
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_qc::alignment::Alignment;
    ///
    /// let alignment = Alignment::new(10, 0, "5M".parse()?);
    /// assert_eq!(alignment.reference_start(), 10);
    /// assert_eq!(alignment.reference_end(), 15);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(reference_start: usize, query_start: usize, cigar: Cigar) -> Self {
        Self {
            reference_start,
            query_start,
            cigar,
        }
    }

    /// Gets the reference start position.
    pub fn reference_start(&self) -> usize {
        self.reference_start
    }

    /// Gets the exclusive reference end position.
    pub fn reference_end(&self) -> usize {
        self.reference_start + self.cigar.reference_len()
    }

    /// Gets the query start offset.
    pub fn query_start(&self) -> usize {
        self.query_start
    }

    /// Gets the edit operations.
    pub fn cigar(&self) -> &Cigar {
        &self.cigar
    }
}

/// Reconstructs, for every reference position an alignment spans, the base
/// contributed by the read (or [`GAP`] where the read deletes the position).
///
/// The output is strictly increasing by reference position and has exactly
/// one entry per spanned position. Insertions contribute nothing. A soft clip
/// that precedes every consuming operation moves the query cursor to the end
/// of the clip unless the query start already lies beyond it; later soft
/// clips only consume query. Hard clips and padding are ignored.
///
/// If `reference` is provided, it is used only to check that the alignment
/// does not run off its end.
///
/// # Examples
///
/// ```
/// use consensus_qc::alignment::Alignment;
/// use consensus_qc::alignment::Cigar;
/// use consensus_qc::alignment::parse_cigar;
///
/// let alignment = Alignment::new(0, 0, Cigar::try_from_codes([(1, 0), (2, 2), (2, 0)])?);
/// let calls = parse_cigar(Some(b"ATTAA"), b"AAA", &alignment)?;
///
/// assert_eq!(
///     calls,
///     vec![(0, b'A'), (1, b'-'), (2, b'-'), (3, b'A'), (4, b'A')]
/// );
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn parse_cigar(
    reference: Option<&[u8]>,
    query: &[u8],
    alignment: &Alignment,
) -> Result<Vec<(usize, u8)>> {
    let mut calls = Vec::with_capacity(alignment.cigar().reference_len());

    let mut reference_cursor = alignment.reference_start();
    let mut query_cursor = alignment.query_start();
    let mut leading = true;

    for op in alignment.cigar().ops() {
        let len = op.len();

        match op.kind() {
            Kind::SoftClip if leading => {
                query_cursor = query_cursor.max(len);
                continue;
            }
            Kind::HardClip | Kind::Pad => continue,
            _ => {}
        }

        leading = false;

        match (op.kind().consumes_reference(), op.kind().consumes_query()) {
            (true, true) => {
                let end = query_cursor + len;
                if end > query.len() {
                    return Err(Error::QueryOverrun {
                        offset: end - 1,
                        len: query.len(),
                    });
                }

                calls.extend(
                    query[query_cursor..end]
                        .iter()
                        .enumerate()
                        .map(|(i, base)| (reference_cursor + i, *base)),
                );

                reference_cursor += len;
                query_cursor = end;
            }
            (true, false) => {
                calls.extend((0..len).map(|i| (reference_cursor + i, GAP)));
                reference_cursor += len;
            }
            (false, true) => query_cursor += len,
            (false, false) => {}
        }
    }

    if let Some(reference) = reference {
        if reference_cursor > reference.len() {
            return Err(Error::ReferenceOverrun {
                position: reference_cursor - 1,
                len: reference.len(),
            });
        }
    }

    Ok(calls)
}
