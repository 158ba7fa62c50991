//! Alignment edit operations (CIGAR operations).

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

/// The character used to represent an empty (unavailable) CIGAR string.
const MISSING: &str = "*";

/// Matches a complete CIGAR string.
static CIGAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[0-9]+[MIDNSHP=X])+$").unwrap());

/// Matches a single operation within a CIGAR string.
static OP_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([0-9]+)([MIDNSHP=X])").unwrap());

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to a CIGAR operation or string.
#[derive(Debug, Eq, PartialEq)]
pub enum Error {
    /// A numeric operation code outside of the recognized range.
    UnsupportedCode(u8),

    /// An operation character that is not recognized.
    UnsupportedSymbol(char),

    /// A CIGAR string that could not be parsed.
    InvalidString(String),

    /// An operation length that could not be parsed.
    InvalidLength(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnsupportedCode(code) => write!(f, "unsupported operation code: {code}"),
            Error::UnsupportedSymbol(c) => write!(f, "unsupported operation symbol: {c}"),
            Error::InvalidString(s) => write!(f, "invalid cigar string: {s}"),
            Error::InvalidLength(s) => write!(f, "invalid operation length: {s}"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Kind
////////////////////////////////////////////////////////////////////////////////////////

/// The kind of an alignment operation.
///
/// The numeric codes follow the conventional BAM encoding (`0` through `8`).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Kind {
    /// An alignment match or mismatch (`M`, `0`).
    Match,

    /// An insertion into the reference (`I`, `1`).
    Insertion,

    /// A deletion from the reference (`D`, `2`).
    Deletion,

    /// A skipped region of the reference (`N`, `3`).
    Skip,

    /// A soft clip (`S`, `4`).
    SoftClip,

    /// A hard clip (`H`, `5`).
    HardClip,

    /// Silent padding (`P`, `6`).
    Pad,

    /// A sequence match (`=`, `7`).
    SequenceMatch,

    /// A sequence mismatch (`X`, `8`).
    SequenceMismatch,
}

impl Kind {
    /// Whether this kind of operation advances the reference cursor.
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_qc::alignment::cigar::Kind;
    ///
    /// assert!(Kind::Deletion.consumes_reference());
    /// assert!(!Kind::Insertion.consumes_reference());
    /// ```
    pub fn consumes_reference(&self) -> bool {
        matches!(
            self,
            Kind::Match | Kind::Deletion | Kind::Skip | Kind::SequenceMatch | Kind::SequenceMismatch
        )
    }

    /// Whether this kind of operation advances the query cursor.
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_qc::alignment::cigar::Kind;
    ///
    /// assert!(Kind::SoftClip.consumes_query());
    /// assert!(!Kind::HardClip.consumes_query());
    /// ```
    pub fn consumes_query(&self) -> bool {
        matches!(
            self,
            Kind::Match
                | Kind::Insertion
                | Kind::SoftClip
                | Kind::SequenceMatch
                | Kind::SequenceMismatch
        )
    }

    /// Gets the SAM symbol for this kind.
    pub fn symbol(&self) -> char {
        match self {
            Kind::Match => 'M',
            Kind::Insertion => 'I',
            Kind::Deletion => 'D',
            Kind::Skip => 'N',
            Kind::SoftClip => 'S',
            Kind::HardClip => 'H',
            Kind::Pad => 'P',
            Kind::SequenceMatch => '=',
            Kind::SequenceMismatch => 'X',
        }
    }
}

impl TryFrom<u8> for Kind {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Kind::Match),
            1 => Ok(Kind::Insertion),
            2 => Ok(Kind::Deletion),
            3 => Ok(Kind::Skip),
            4 => Ok(Kind::SoftClip),
            5 => Ok(Kind::HardClip),
            6 => Ok(Kind::Pad),
            7 => Ok(Kind::SequenceMatch),
            8 => Ok(Kind::SequenceMismatch),
            _ => Err(Error::UnsupportedCode(code)),
        }
    }
}

impl TryFrom<char> for Kind {
    type Error = Error;

    fn try_from(symbol: char) -> Result<Self> {
        match symbol {
            'M' => Ok(Kind::Match),
            'I' => Ok(Kind::Insertion),
            'D' => Ok(Kind::Deletion),
            'N' => Ok(Kind::Skip),
            'S' => Ok(Kind::SoftClip),
            'H' => Ok(Kind::HardClip),
            'P' => Ok(Kind::Pad),
            '=' => Ok(Kind::SequenceMatch),
            'X' => Ok(Kind::SequenceMismatch),
            c => Err(Error::UnsupportedSymbol(c)),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Operations
////////////////////////////////////////////////////////////////////////////////////////

/// A single alignment operation: a length and a [`Kind`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Op {
    /// The kind of operation.
    kind: Kind,

    /// The number of bases the operation spans.
    len: usize,
}

impl Op {
    /// Creates a new [`Op`].
    pub fn new(kind: Kind, len: usize) -> Self {
        Self { kind, len }
    }

    /// Attempts to create an [`Op`] from a `(length, code)` pair.
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_qc::alignment::cigar::Kind;
    /// use consensus_qc::alignment::cigar::Op;
    ///
    /// let op = Op::try_from_code(3, 2)?;
    /// assert_eq!(op.kind(), Kind::Deletion);
    /// assert_eq!(op.len(), 3);
    ///
    /// assert!(Op::try_from_code(3, 9).is_err());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_from_code(len: usize, code: u8) -> Result<Self> {
        Kind::try_from(code).map(|kind| Self::new(kind, len))
    }

    /// Gets the kind of the operation.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Gets the length of the operation.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.len
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.len, self.kind.symbol())
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Cigar
////////////////////////////////////////////////////////////////////////////////////////

/// An ordered list of alignment operations.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Cigar(Vec<Op>);

impl Cigar {
    /// Attempts to create a [`Cigar`] from `(length, code)` pairs.
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_qc::alignment::Cigar;
    ///
    /// let cigar = Cigar::try_from_codes([(1, 0), (2, 1), (2, 0)])?;
    /// assert_eq!(cigar.to_string(), "1M2I2M");
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_from_codes<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, u8)>,
    {
        pairs
            .into_iter()
            .map(|(len, code)| Op::try_from_code(len, code))
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    /// Gets the operations as a slice.
    pub fn ops(&self) -> &[Op] {
        &self.0
    }

    /// Whether the CIGAR contains no operations.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of reference bases spanned by the operations.
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_qc::alignment::Cigar;
    ///
    /// let cigar = "3S1M2D2M".parse::<Cigar>()?;
    /// assert_eq!(cigar.reference_len(), 5);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn reference_len(&self) -> usize {
        self.0
            .iter()
            .filter(|op| op.kind().consumes_reference())
            .map(|op| op.len())
            .sum()
    }

    /// The number of query bases consumed by the operations.
    pub fn query_len(&self) -> usize {
        self.0
            .iter()
            .filter(|op| op.kind().consumes_query())
            .map(|op| op.len())
            .sum()
    }
}

impl From<Vec<Op>> for Cigar {
    fn from(ops: Vec<Op>) -> Self {
        Self(ops)
    }
}

impl FromStr for Cigar {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == MISSING {
            return Ok(Self::default());
        }

        if !CIGAR_REGEX.is_match(s) {
            return Err(Error::InvalidString(s.into()));
        }

        let mut ops = Vec::new();

        for captures in OP_REGEX.captures_iter(s) {
            let len = captures[1]
                .parse::<usize>()
                .map_err(|_| Error::InvalidLength(captures[1].to_string()))?;

            // SAFETY: the regex only captures a single recognized symbol here.
            let symbol = captures[2].chars().next().unwrap();
            ops.push(Op::new(Kind::try_from(symbol)?, len));
        }

        Ok(Self(ops))
    }
}

impl std::fmt::Display for Cigar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return write!(f, "{MISSING}");
        }

        for op in &self.0 {
            write!(f, "{op}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_a_cigar_string() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let cigar = "3S29M2D7M1I1=1X5H".parse::<Cigar>()?;

        assert_eq!(cigar.ops().len(), 8);
        assert_eq!(cigar.ops()[0], Op::new(Kind::SoftClip, 3));
        assert_eq!(cigar.ops()[2], Op::new(Kind::Deletion, 2));
        assert_eq!(cigar.to_string(), "3S29M2D7M1I1=1X5H");

        Ok(())
    }

    #[test]
    fn test_rejects_malformed_cigar_strings() {
        let err = "3M2".parse::<Cigar>().unwrap_err();
        assert_eq!(err.to_string(), "invalid cigar string: 3M2");

        let err = "M".parse::<Cigar>().unwrap_err();
        assert_eq!(err.to_string(), "invalid cigar string: M");

        assert!("3Q".parse::<Cigar>().is_err());
    }

    #[test]
    fn test_treats_an_asterisk_as_empty() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let cigar = "*".parse::<Cigar>()?;
        assert!(cigar.is_empty());
        assert_eq!(cigar.to_string(), "*");
        Ok(())
    }

    #[test]
    fn test_rejects_unsupported_codes() {
        let err = Cigar::try_from_codes([(3, 0), (1, 9)]).unwrap_err();
        assert_eq!(err, Error::UnsupportedCode(9));
        assert_eq!(err.to_string(), "unsupported operation code: 9");
    }

    #[test]
    fn test_computes_spans() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let cigar = Cigar::try_from_codes([(3, 4), (1, 0), (2, 1), (2, 2), (4, 3), (1, 0)])?;
        assert_eq!(cigar.reference_len(), 8);
        assert_eq!(cigar.query_len(), 7);
        Ok(())
    }
}
