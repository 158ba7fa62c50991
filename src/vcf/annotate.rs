//! Annotation of variant records with per-position verdicts.

use std::io;
use std::io::BufRead;
use std::io::Write;

use noodles::core::Position;
use noodles::vcf;
use noodles::vcf::header::record::value::Map;
use noodles::vcf::header::record::value::map::Filter;
use noodles::vcf::header::record::value::map::Info;
use noodles::vcf::header::record::value::map::info::Number;
use noodles::vcf::header::record::value::map::info::Type;
use noodles::vcf::variant::RecordBuf;
use noodles::vcf::variant::io::Write as _;
use noodles::vcf::variant::record_buf::Filters;
use noodles::vcf::variant::record_buf::info::field::Value;

use crate::liftover::System;
use crate::liftover::UNMAPPED;
use crate::liftover::table;
use crate::pileup::Pileup;
use crate::pileup::Verdict;
use crate::pileup::policy::Reason;

/// The `INFO` flag set on records without an equivalent position.
pub const NO_EQUIV: &str = "NO_EQUIV";

/// The `INFO` key holding the consensus position of a record.
pub const CONS_POS: &str = "CONS_POS";

/// The filter written when no other filter applies.
const PASS: &str = "PASS";

/// An error related to an [`Annotator`].
#[derive(Debug)]
pub enum Error {
    /// A record position could not be lifted.
    Lookup(table::Error),

    /// A record has no position.
    MissingPosition,

    /// A consensus position does not fit in an `INFO` integer.
    PositionOverflow(usize),

    /// An error reading the input or writing the output.
    Io(io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Lookup(err) => write!(f, "lookup error: {err}"),
            Error::MissingPosition => write!(f, "missing record position"),
            Error::PositionOverflow(position) => {
                write!(f, "position {position} does not fit in an INFO integer")
            }
            Error::Io(err) => write!(f, "i/o error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// Rewrites variant records using the verdicts of a [`Pileup`].
///
/// Records are read in the `source` coordinate system and reported in the
/// `report` coordinate system. Both default to [`System::Reference`].
#[derive(Debug)]
pub struct Annotator<'a> {
    /// The pileup supplying the verdicts and the lookup table.
    pileup: &'a Pileup,

    /// The coordinate system of the incoming records.
    source: System,

    /// The coordinate system of the outgoing records.
    report: System,
}

impl<'a> Annotator<'a> {
    /// Creates a new [`Annotator`].
    pub fn new(pileup: &'a Pileup) -> Self {
        Self {
            pileup,
            source: System::Reference,
            report: System::Reference,
        }
    }

    /// Sets the coordinate system of the incoming records.
    pub fn source(mut self, system: System) -> Self {
        self.source = system;
        self
    }

    /// Sets the coordinate system of the outgoing records.
    pub fn report(mut self, system: System) -> Self {
        self.report = system;
        self
    }

    /// A header holding only the `FILTER` and `INFO` definitions of the
    /// annotations.
    pub fn definitions() -> vcf::Header {
        let mut builder = vcf::Header::builder();

        for reason in Reason::ALL {
            builder = builder.add_filter(reason.id(), Map::<Filter>::new(reason.description()));
        }

        builder
            .add_info(
                NO_EQUIV,
                Map::<Info>::new(
                    Number::Count(0),
                    Type::Flag,
                    "No equivalent position in the reporting coordinate system",
                ),
            )
            .add_info(
                CONS_POS,
                Map::<Info>::new(Number::Count(1), Type::Integer, "Position in the consensus"),
            )
            .build()
    }

    /// Adds the annotation definitions to a header.
    ///
    /// Definitions already present are left as they are.
    pub fn annotate_header(&self, header: &mut vcf::Header) {
        let definitions = Self::definitions();

        for (id, filter) in definitions.filters() {
            header
                .filters_mut()
                .entry(id.clone())
                .or_insert_with(|| filter.clone());
        }

        for (key, info) in definitions.infos() {
            header
                .infos_mut()
                .entry(key.clone())
                .or_insert_with(|| info.clone());
        }
    }

    /// Rewrites the position, `FILTER` field, and `INFO` field of a record.
    ///
    /// A record without a counterpart in the consensus keeps its position
    /// and `FILTER` field and gains the [`NO_EQUIV`] flag. A record with a
    /// consensus counterpart but none in the reporting coordinate system is
    /// still filtered by its verdict, but keeps its position and gains the
    /// flag as well.
    ///
    /// Filters from earlier annotations are replaced. Any other filters are
    /// kept ahead of the failure reasons.
    ///
    /// # Examples
    ///
    /// ```
    /// use consensus_qc::liftover::System;
    /// use consensus_qc::pileup::Builder;
    /// use consensus_qc::vcf::Annotator;
    /// use noodles::core::Position;
    /// use noodles::vcf::variant::RecordBuf;
    ///
    /// let msa = consensus_qc::msa::read(&b">ref\nACGT--A\n>cons\n-CGTTTA\n"[..])?;
    /// let pileup = Builder::default().try_build(b"CGTTTA".to_vec(), &msa)?;
    /// let annotator = Annotator::new(&pileup).report(System::Consensus);
    ///
    /// let mut record = RecordBuf::builder()
    ///     .set_reference_sequence_name("seq0")
    ///     .set_variant_start(Position::try_from(5)?)
    ///     .set_reference_bases("A")
    ///     .build();
    /// annotator.annotate_record(&mut record)?;
    ///
    /// assert_eq!(record.variant_start(), Position::new(6));
    /// assert!(record.filters().as_ref().contains("NO_COVERAGE"));
    ///
    /// let mut record = RecordBuf::builder()
    ///     .set_reference_sequence_name("seq0")
    ///     .set_variant_start(Position::try_from(1)?)
    ///     .set_reference_bases("A")
    ///     .build();
    /// annotator.annotate_record(&mut record)?;
    ///
    /// assert_eq!(record.variant_start(), Position::new(1));
    /// assert!(record.info().as_ref().contains_key("NO_EQUIV"));
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn annotate_record(&self, record: &mut RecordBuf) -> Result<()> {
        let table = self.pileup.table();
        let position = record
            .variant_start()
            .map(usize::from)
            .ok_or(Error::MissingPosition)?;

        let consensus = table
            .lift(position, self.source, System::Consensus)
            .map_err(Error::Lookup)?;

        if consensus == UNMAPPED {
            flag(record, NO_EQUIV);
            return Ok(());
        }

        let reported = table
            .lift(position, self.source, self.report)
            .map_err(Error::Lookup)?;

        // A mapped consensus position always lies within the pileup.
        let verdict = self.pileup.verdict(consensus - 1).unwrap_or(Verdict::Pass);

        let filters = record
            .filters()
            .as_ref()
            .iter()
            .filter(|filter| !is_annotation(filter))
            .cloned()
            .chain(verdict.reasons().map(|reason| reason.id().to_string()))
            .collect::<Vec<_>>();

        *record.filters_mut() = match filters.is_empty() {
            true => Filters::pass(),
            false => filters.into_iter().collect(),
        };

        let value = i32::try_from(consensus).map_err(|_| Error::PositionOverflow(consensus))?;
        record
            .info_mut()
            .as_mut()
            .insert(String::from(CONS_POS), Some(Value::Integer(value)));

        match Position::new(reported) {
            Some(position) => *record.variant_start_mut() = Some(position),
            None => flag(record, NO_EQUIV),
        }

        Ok(())
    }

    /// Annotates a header and its records.
    pub fn annotate_vcf(
        &self,
        mut header: vcf::Header,
        records: Vec<RecordBuf>,
    ) -> Result<(vcf::Header, Vec<RecordBuf>)> {
        self.annotate_header(&mut header);

        let records = records
            .into_iter()
            .map(|mut record| self.annotate_record(&mut record).map(|_| record))
            .collect::<Result<Vec<_>>>()?;

        Ok((header, records))
    }

    /// Streams a VCF from `reader` to `writer`, annotating as it goes.
    ///
    /// Returns the number of records written.
    pub fn annotate<R, W>(
        &self,
        reader: &mut vcf::io::Reader<R>,
        writer: &mut vcf::io::Writer<W>,
    ) -> Result<usize>
    where
        R: BufRead,
        W: Write,
    {
        let mut header = reader.read_header().map_err(Error::Io)?;
        self.annotate_header(&mut header);
        writer.write_header(&header).map_err(Error::Io)?;

        let mut count = 0;

        for result in reader.record_bufs(&header) {
            let mut record = result.map_err(Error::Io)?;
            self.annotate_record(&mut record)?;
            writer
                .write_variant_record(&header, &record)
                .map_err(Error::Io)?;
            count += 1;
        }

        Ok(count)
    }
}

/// Whether a filter is `PASS` or was written by an earlier annotation.
fn is_annotation(filter: &str) -> bool {
    filter == PASS || Reason::ALL.iter().any(|reason| reason.id() == filter)
}

/// Sets an `INFO` flag.
fn flag(record: &mut RecordBuf, key: &str) {
    record
        .info_mut()
        .as_mut()
        .insert(String::from(key), Some(Value::Flag));
}

#[cfg(test)]
mod tests {
    use omics::coordinate::Strand;

    use super::*;
    use crate::msa;
    use crate::pileup::Builder;
    use crate::pileup::Observation;

    /// A reference-first alignment against a shorter consensus.
    const MSA: &[u8] = b">ref\nACTGACT--ATCGATCGATCGATCAG\n>cons\n---GACTGCAGC--TCGCACG-----\n";

    /// The ungapped consensus from [`MSA`].
    const CONSENSUS: &[u8] = b"GACTGCAGCTCGCACG";

    /// The header every test VCF starts with.
    const HEADER: &str = "##fileformat=VCFv4.3\n\
        ##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Combined depth across samples\">\n\
        ##FILTER=<ID=q10,Description=\"Quality below 10\">\n\
        #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";

    /// Builds a pileup where every consensus position except the fourth is
    /// well supported.
    fn pileup() -> std::result::Result<Pileup, Box<dyn std::error::Error>> {
        let msa = msa::read(MSA)?;
        let mut pileup = Builder::default().try_build(CONSENSUS.to_vec(), &msa)?;

        for (position, base) in CONSENSUS.iter().enumerate() {
            if position == 3 {
                continue;
            }

            for _ in 0..30 {
                pileup.update(position, &Observation::new(*base, Strand::Positive, false, None))?;
            }
        }

        Ok(pileup)
    }

    /// Reads the header and records of a VCF made from [`HEADER`] and
    /// `records`.
    fn read(
        records: &str,
    ) -> std::result::Result<(vcf::Header, Vec<RecordBuf>), Box<dyn std::error::Error>> {
        let data = format!("{HEADER}{records}");
        let mut reader = vcf::io::Reader::new(data.as_bytes());

        let header = reader.read_header()?;
        let records = reader.record_bufs(&header).collect::<io::Result<Vec<_>>>()?;

        Ok((header, records))
    }

    /// Streams a VCF made from [`HEADER`] and `records` through `annotator`
    /// and returns the record lines written.
    fn annotate(
        annotator: &Annotator<'_>,
        records: &str,
    ) -> std::result::Result<Vec<String>, Box<dyn std::error::Error>> {
        let data = format!("{HEADER}{records}");
        let mut reader = vcf::io::Reader::new(data.as_bytes());
        let mut writer = vcf::io::Writer::new(Vec::new());

        annotator.annotate(&mut reader, &mut writer)?;

        let text = String::from_utf8(writer.into_inner())?;
        Ok(text
            .lines()
            .filter(|line| !line.starts_with('#'))
            .map(String::from)
            .collect())
    }

    #[test]
    fn test_passes_supported_positions() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let pileup = pileup()?;
        let annotator = Annotator::new(&pileup);

        let lines = annotate(&annotator, "ref\t4\t.\tG\tA\t.\t.\tDP=30\n")?;
        assert_eq!(lines, ["ref\t4\t.\tG\tA\t.\tPASS\tDP=30;CONS_POS=1"]);

        Ok(())
    }

    #[test]
    fn test_filters_failing_positions() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let pileup = pileup()?;
        let annotator = Annotator::new(&pileup);

        let lines = annotate(&annotator, "ref\t7\t.\tT\tA\t.\tq10\t.\n")?;
        assert_eq!(lines, ["ref\t7\t.\tT\tA\t.\tq10;NO_COVERAGE\tCONS_POS=4"]);

        Ok(())
    }

    #[test]
    fn test_replaces_filters_from_earlier_annotations(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let pileup = pileup()?;
        let annotator = Annotator::new(&pileup);

        let lines = annotate(
            &annotator,
            "ref\t4\t.\tG\tA\t.\tNO_COVERAGE\t.\nref\t7\t.\tT\tA\t.\tq10;LOW_DEPTH\t.\n",
        )?;
        assert_eq!(lines, [
            "ref\t4\t.\tG\tA\t.\tPASS\tCONS_POS=1",
            "ref\t7\t.\tT\tA\t.\tq10;NO_COVERAGE\tCONS_POS=4",
        ]);

        Ok(())
    }

    #[test]
    fn test_reports_in_consensus_coordinates() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let pileup = pileup()?;

        let annotator = Annotator::new(&pileup).report(System::Consensus);
        let lines = annotate(&annotator, "ref\t7\t.\tT\tA\t.\tPASS\t.\n")?;
        assert_eq!(lines, ["ref\t4\t.\tT\tA\t.\tNO_COVERAGE\tCONS_POS=4"]);

        let annotator = Annotator::new(&pileup).source(System::Consensus);
        let lines = annotate(&annotator, "cons\t5\t.\tG\tA\t.\tPASS\t.\n")?;
        assert_eq!(lines, ["cons\t7\t.\tG\tA\t.\tPASS\tCONS_POS=5"]);

        Ok(())
    }

    #[test]
    fn test_flags_positions_without_an_equivalent(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let pileup = pileup()?;
        let annotator = Annotator::new(&pileup);

        let lines = annotate(&annotator, "ref\t2\t.\tC\tA\t.\tq10\t.\n")?;
        assert_eq!(lines, ["ref\t2\t.\tC\tA\t.\tq10\tNO_EQUIV"]);

        Ok(())
    }

    #[test]
    fn test_filters_positions_missing_only_from_the_report(
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let msa = msa::read(&b">ref\n--ACGT\n>cons\nTTACGT\n"[..])?;
        let pileup = Builder::default().try_build_from_msa(&msa)?;
        let annotator = Annotator::new(&pileup).source(System::Consensus);

        let lines = annotate(&annotator, "cons\t1\t.\tT\tA\t.\tPASS\t.\n")?;
        assert_eq!(lines, ["cons\t1\t.\tT\tA\t.\tNO_COVERAGE\tCONS_POS=1;NO_EQUIV"]);

        Ok(())
    }

    #[test]
    fn test_rejects_out_of_range_positions() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let pileup = pileup()?;
        let annotator = Annotator::new(&pileup);

        let (_, mut records) = read("ref\t25\t.\tC\tA\t.\t.\t.\n")?;
        let err = annotator.annotate_record(&mut records[0]).unwrap_err();
        assert!(matches!(err, Error::Lookup(_)));

        Ok(())
    }

    #[test]
    fn test_adds_definitions_once() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let pileup = pileup()?;
        let annotator = Annotator::new(&pileup);

        let (mut header, _) = read("")?;
        header
            .filters_mut()
            .insert(String::from("LOW_DEPTH"), Map::<Filter>::new("Custom"));

        annotator.annotate_header(&mut header);

        for reason in Reason::ALL {
            assert!(header.filters().contains_key(reason.id()));
        }

        assert!(header.filters().contains_key("q10"));
        assert_eq!(
            header.filters().get("LOW_DEPTH").map(|filter| filter.description()),
            Some("Custom")
        );
        assert_eq!(
            header.infos().get(CONS_POS).map(|info| info.number()),
            Some(Number::Count(1))
        );
        assert_eq!(
            header.infos().get(NO_EQUIV).map(|info| info.ty()),
            Some(Type::Flag)
        );

        let filters = header.filters().len();
        let infos = header.infos().len();
        annotator.annotate_header(&mut header);
        assert_eq!(header.filters().len(), filters);
        assert_eq!(header.infos().len(), infos);

        Ok(())
    }

    #[test]
    fn test_annotates_a_whole_vcf() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let pileup = pileup()?;
        let annotator = Annotator::new(&pileup);

        let (header, records) = read("ref\t4\t.\tG\tA\t.\t.\t.\nref\t7\t.\tT\tA\t.\t.\t.\n")?;
        let (header, records) = annotator.annotate_vcf(header, records)?;

        assert!(header.infos().contains_key(CONS_POS));
        assert!(records[0].filters().is_pass());
        assert!(records[1].filters().as_ref().contains("NO_COVERAGE"));

        let data = format!("{HEADER}ref\t4\t.\tG\tA\t.\t.\t.\n");
        let mut reader = vcf::io::Reader::new(data.as_bytes());
        let mut writer = vcf::io::Writer::new(Vec::new());
        assert_eq!(annotator.annotate(&mut reader, &mut writer)?, 1);

        let text = String::from_utf8(writer.into_inner())?;
        assert!(text.contains("##FILTER=<ID=NO_COVERAGE,"));
        assert!(text.contains("##INFO=<ID=CONS_POS,Number=1,Type=Integer,"));

        Ok(())
    }
}
