//! Amplicon schemes and primer-binding regions.
//!
//! A scheme is loaded from a tab-delimited file with a header row naming (at
//! least) the columns `Amplicon_name`, `Primer_name`, `Left_or_right`,
//! `Sequence`, and `Position`. Positions are 0-based starts in reference
//! coordinates, and every primer covers `Position..Position + len(Sequence)`.

use std::collections::HashMap;
use std::io;
use std::str::FromStr;

use nonempty::NonEmpty;
use rust_lapper as lapper;
use serde::Deserialize;

/// The delimiter between columns.
const DELIMITER: u8 = b'\t';

/// The column holding the amplicon name.
const AMPLICON_NAME: &str = "Amplicon_name";

/// The column holding the primer name.
const PRIMER_NAME: &str = "Primer_name";

/// The column holding the primer side.
const LEFT_OR_RIGHT: &str = "Left_or_right";

/// The column holding the primer sequence.
const SEQUENCE: &str = "Sequence";

/// The column holding the 0-based primer start.
const POSITION: &str = "Position";

/// The columns every scheme must carry.
const REQUIRED_COLUMNS: [&str; 5] = [
    AMPLICON_NAME,
    PRIMER_NAME,
    LEFT_OR_RIGHT,
    SEQUENCE,
    POSITION,
];

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to loading a [`Scheme`].
#[derive(Debug)]
pub enum Error {
    /// A malformed row, or an error reading the input.
    Csv(csv::Error),

    /// The input has no header row.
    MissingHeader,

    /// A required column is absent from the header row.
    MissingColumn(&'static str),

    /// An unrecognized primer side.
    InvalidSide(String),

    /// An amplicon lacks primers on one side.
    MissingPrimers(String, Side),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Csv(err) => write!(f, "csv error: {err}"),
            Error::MissingHeader => write!(f, "missing header row"),
            Error::MissingColumn(column) => write!(f, "missing column: {column}"),
            Error::InvalidSide(value) => {
                write!(f, "invalid primer side: expected `left` or `right`, found `{value}`")
            }
            Error::MissingPrimers(amplicon, side) => {
                write!(f, "amplicon {amplicon} has no {side} primers")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// One row of a scheme file. Columns beyond these are ignored.
#[derive(Debug, Deserialize)]
struct Row {
    /// The amplicon the primer belongs to.
    #[serde(rename = "Amplicon_name")]
    amplicon: String,

    /// The primer name.
    #[serde(rename = "Primer_name")]
    name: String,

    /// The side, as written.
    #[serde(rename = "Left_or_right")]
    side: String,

    /// The primer sequence.
    #[serde(rename = "Sequence")]
    sequence: String,

    /// The 0-based start.
    #[serde(rename = "Position")]
    position: usize,
}

////////////////////////////////////////////////////////////////////////////////////////
// Primers
////////////////////////////////////////////////////////////////////////////////////////

/// The side of an amplicon a primer binds to.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Side {
    /// The forward primer.
    Left,

    /// The reverse primer.
    Right,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

impl FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            _ => Err(Error::InvalidSide(s.to_string())),
        }
    }
}

/// A primer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Primer {
    /// The name.
    name: String,

    /// The side of the amplicon.
    side: Side,

    /// The sequence.
    sequence: String,

    /// The 0-based start in reference coordinates.
    start: usize,
}

impl Primer {
    /// Gets the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the side of the amplicon.
    pub fn side(&self) -> Side {
        self.side
    }

    /// Gets the sequence.
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// The 0-based start.
    pub fn start(&self) -> usize {
        self.start
    }

    /// The 0-based, exclusive end.
    pub fn end(&self) -> usize {
        self.start + self.sequence.len()
    }
}

/// An amplicon and the primers that bound it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Amplicon {
    /// The name.
    name: String,

    /// The forward primers.
    left: NonEmpty<Primer>,

    /// The reverse primers.
    right: NonEmpty<Primer>,
}

impl Amplicon {
    /// Gets the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the forward primers.
    pub fn left(&self) -> &NonEmpty<Primer> {
        &self.left
    }

    /// Gets the reverse primers.
    pub fn right(&self) -> &NonEmpty<Primer> {
        &self.right
    }

    /// The 0-based start (the leftmost forward primer start).
    pub fn start(&self) -> usize {
        // SAFETY: `left` is non-empty.
        self.left.iter().map(Primer::start).min().unwrap()
    }

    /// The 0-based, exclusive end (the rightmost reverse primer end).
    pub fn end(&self) -> usize {
        // SAFETY: `right` is non-empty.
        self.right.iter().map(Primer::end).max().unwrap()
    }

    /// The length of the span covered by the amplicon.
    pub fn len(&self) -> usize {
        self.end().saturating_sub(self.start())
    }

    /// Whether the amplicon covers no positions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over every primer.
    pub fn primers(&self) -> impl Iterator<Item = &Primer> + '_ {
        self.left.iter().chain(self.right.iter())
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Schemes
////////////////////////////////////////////////////////////////////////////////////////

/// An amplicon scheme.
///
/// Primer-binding regions and amplicon spans are indexed in interval trees.
#[derive(Debug)]
pub struct Scheme {
    /// The amplicons, in file order.
    amplicons: Vec<Amplicon>,

    /// Every primer-binding region (the value is the amplicon index).
    primers: lapper::Lapper<usize, usize>,

    /// Every amplicon span (the value is the amplicon index).
    spans: lapper::Lapper<usize, usize>,
}

impl Scheme {
    /// Reads a scheme from tab-delimited text.
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_qc::primers::Scheme;
    ///
    /// let data = b"Amplicon_name\tPrimer_name\tLeft_or_right\tSequence\tPosition\n\
    ///              amp1\tamp1_L\tleft\tACGT\t0\n\
    ///              amp1\tamp1_R\tright\tTTGG\t96\n";
    /// let scheme = Scheme::from_tsv(&data[..])?;
    ///
    /// assert_eq!(scheme.amplicons().len(), 1);
    /// assert!(scheme.in_primer(3));
    /// assert!(!scheme.in_primer(4));
    /// assert_eq!(scheme.assign(10, 50).map(|a| a.name()), Some("amp1"));
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_tsv<R>(reader: R) -> Result<Self>
    where
        R: io::Read,
    {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(DELIMITER)
            .from_reader(reader);

        let headers = reader.headers().map_err(Error::Csv)?;

        if headers.is_empty() {
            return Err(Error::MissingHeader);
        }

        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|header| header == column) {
                return Err(Error::MissingColumn(column));
            }
        }

        let mut order = Vec::<String>::new();
        let mut groups = HashMap::<String, (Vec<Primer>, Vec<Primer>)>::new();

        for result in reader.deserialize() {
            let row: Row = result.map_err(Error::Csv)?;

            let primer = Primer {
                name: row.name,
                side: row.side.parse()?,
                sequence: row.sequence,
                start: row.position,
            };

            let group = groups.entry(row.amplicon).or_insert_with_key(|name| {
                order.push(name.clone());
                Default::default()
            });

            match primer.side {
                Side::Left => group.0.push(primer),
                Side::Right => group.1.push(primer),
            }
        }

        let amplicons = order
            .into_iter()
            .map(|name| {
                // SAFETY: every name in `order` was inserted into `groups`.
                let (left, right) = groups.remove(&name).unwrap();

                let left = NonEmpty::from_vec(left)
                    .ok_or_else(|| Error::MissingPrimers(name.clone(), Side::Left))?;
                let right = NonEmpty::from_vec(right)
                    .ok_or_else(|| Error::MissingPrimers(name.clone(), Side::Right))?;

                Ok(Amplicon { name, left, right })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::from(amplicons))
    }

    /// Gets the amplicons, in file order.
    pub fn amplicons(&self) -> &[Amplicon] {
        &self.amplicons
    }

    /// Whether a 0-based reference position falls within any primer-binding
    /// region.
    pub fn in_primer(&self, position: usize) -> bool {
        self.primers.find(position, position + 1).next().is_some()
    }

    /// Finds the smallest amplicon whose span contains the 0-based,
    /// half-open reference span `start..end`.
    ///
    /// Ties go to the amplicon listed first.
    pub fn assign(&self, start: usize, end: usize) -> Option<&Amplicon> {
        self.spans
            .find(start, end.max(start + 1))
            .map(|interval| interval.val)
            .filter(|i| self.amplicons[*i].start() <= start && end <= self.amplicons[*i].end())
            .min_by_key(|i| (self.amplicons[*i].len(), *i))
            .map(|i| &self.amplicons[i])
    }
}

impl From<Vec<Amplicon>> for Scheme {
    fn from(amplicons: Vec<Amplicon>) -> Self {
        let mut primers = Vec::new();
        let mut spans = Vec::new();

        for (i, amplicon) in amplicons.iter().enumerate() {
            for primer in amplicon.primers() {
                primers.push(lapper::Interval {
                    start: primer.start(),
                    stop: primer.end(),
                    val: i,
                });
            }

            spans.push(lapper::Interval {
                start: amplicon.start(),
                stop: amplicon.end(),
                val: i,
            });
        }

        Self {
            amplicons,
            primers: lapper::Lapper::new(primers),
            spans: lapper::Lapper::new(spans),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A two-amplicon scheme whose amplicons overlap.
    const SCHEME: &[u8] = b"Amplicon_name\tPrimer_name\tLeft_or_right\tSequence\tPosition\n\
        amp1\tamp1_L\tleft\tACGTAC\t10\n\
        amp1\tamp1_R\tright\tGGTTAA\t100\n\
        amp2\tamp2_L\tleft\tTTGGCC\t90\n\
        amp2\tamp2_L_alt\tLEFT\tTTGGCA\t92\n\
        amp2\tamp2_R\tright\tCCAAGG\t200\n";

    #[test]
    fn test_groups_primers_by_amplicon() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let scheme = Scheme::from_tsv(SCHEME)?;
        let amplicons = scheme.amplicons();

        assert_eq!(amplicons.len(), 2);
        assert_eq!(amplicons[0].name(), "amp1");
        assert_eq!(amplicons[0].start(), 10);
        assert_eq!(amplicons[0].end(), 106);
        assert_eq!(amplicons[1].left().len(), 2);
        assert_eq!(amplicons[1].right().first().name(), "amp2_R");
        assert_eq!(amplicons[1].start(), 90);
        assert_eq!(amplicons[1].end(), 206);

        Ok(())
    }

    #[test]
    fn test_finds_primer_regions() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let scheme = Scheme::from_tsv(SCHEME)?;

        for position in [10, 15, 90, 95, 97, 100, 105, 200, 205] {
            assert!(scheme.in_primer(position), "{position}");
        }

        for position in [0, 9, 16, 89, 98, 99, 106, 199, 206] {
            assert!(!scheme.in_primer(position), "{position}");
        }

        Ok(())
    }

    #[test]
    fn test_assigns_the_smallest_containing_amplicon(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let scheme = Scheme::from_tsv(SCHEME)?;

        let name = |start, end| scheme.assign(start, end).map(Amplicon::name);

        assert_eq!(name(20, 80), Some("amp1"));
        assert_eq!(name(95, 150), Some("amp2"));
        assert_eq!(name(92, 100), Some("amp1"));
        assert_eq!(name(5, 50), None);
        assert_eq!(name(100, 210), None);

        Ok(())
    }

    #[test]
    fn test_accepts_columns_in_any_order() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let data = b"Position\tSequence\tLeft_or_right\tPrimer_name\tAmplicon_name\tPool\n\
                     0\tACGT\tleft\ta_L\ta\t1\n\
                     50\tACGT\tright\ta_R\ta\t1\n";
        let scheme = Scheme::from_tsv(&data[..])?;

        assert_eq!(scheme.amplicons()[0].len(), 54);
        assert!(scheme.in_primer(53));

        Ok(())
    }

    #[test]
    fn test_rejects_malformed_schemes() {
        let err = Scheme::from_tsv(&b""[..]).unwrap_err();
        assert!(matches!(err, Error::MissingHeader));

        let err = Scheme::from_tsv(&b"Amplicon_name\tPrimer_name\n"[..]).unwrap_err();
        assert_eq!(err.to_string(), "missing column: Left_or_right");

        let data = b"Amplicon_name\tPrimer_name\tLeft_or_right\tSequence\tPosition\n\
                     a\ta_L\tleft\tACGT\n";
        let err = Scheme::from_tsv(&data[..]).unwrap_err();
        assert!(matches!(
            err,
            Error::Csv(ref err) if matches!(
                err.kind(),
                csv::ErrorKind::UnequalLengths {
                    expected_len: 5,
                    len: 4,
                    ..
                }
            )
        ));

        let data = b"Amplicon_name\tPrimer_name\tLeft_or_right\tSequence\tPosition\n\
                     a\ta_L\tleft\tACGT\tfirst\n";
        let err = Scheme::from_tsv(&data[..]).unwrap_err();
        assert!(matches!(
            err,
            Error::Csv(ref err) if matches!(err.kind(), csv::ErrorKind::Deserialize { .. })
        ));

        let data = b"Amplicon_name\tPrimer_name\tLeft_or_right\tSequence\tPosition\n\
                     a\ta_L\tup\tACGT\t0\n";
        let err = Scheme::from_tsv(&data[..]).unwrap_err();
        assert!(matches!(err, Error::InvalidSide(_)));

        let data = b"Amplicon_name\tPrimer_name\tLeft_or_right\tSequence\tPosition\n\
                     a\ta_L\tleft\tACGT\t0\n";
        let err = Scheme::from_tsv(&data[..]).unwrap_err();
        assert_eq!(err.to_string(), "amplicon a has no right primers");
    }

    #[test]
    fn test_accepts_windows_line_endings() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let data = b"Amplicon_name\tPrimer_name\tLeft_or_right\tSequence\tPosition\r\n\
                     a\ta_L\tleft\tACGT\t0\r\n\
                     a\ta_R\tright\tACGT\t50\r\n";
        let scheme = Scheme::from_tsv(&data[..])?;

        assert_eq!(scheme.amplicons()[0].right().first().sequence(), "ACGT");
        assert_eq!(scheme.amplicons()[0].end(), 54);

        Ok(())
    }
}
