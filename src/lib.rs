//! `consensus-qc` is a crate for deciding which bases of a polished viral
//! consensus are trustworthy, given the reads that were used to build it.
//!
//! The crate provides four main points of entry:
//!
//! - Interpreting read alignments into per-position base calls.
//! - Translating positions between the original reference and the consensus.
//! - Accumulating read evidence at every consensus position and judging it.
//! - Masking the consensus and annotating variant calls with the verdicts.
//!
//! ## Interpreting alignments
//!
//! An [`alignment::Alignment`] carries the start of an alignment on the
//! reference and on the read, along with its [`alignment::Cigar`]. Calling
//! [`alignment::parse_cigar()`] expands it into one `(position, base)` pair
//! for every reference position the read covers, with
//! [`alignment::GAP`] marking deleted positions. Insertions relative to the
//! reference produce no pairs.
//!
//! ```
//! use consensus_qc::alignment::Alignment;
//! use consensus_qc::alignment::parse_cigar;
//!
//! let alignment = Alignment::new(2, 0, "2M1D2M".parse()?);
//! let calls = parse_cigar(None, b"ACGT", &alignment)?;
//!
//! assert_eq!(calls, vec![(2, b'A'), (3, b'C'), (4, b'-'), (5, b'G'), (6, b'T')]);
//!
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Lifting positions
//!
//! A two-record multiple sequence alignment (the reference first, the
//! consensus second) defines a [`liftover::Table`] that translates 1-based
//! positions in both directions. Positions without a counterpart translate
//! to the sentinel [`liftover::UNMAPPED`].
//!
//! ```
//! use consensus_qc::liftover::System;
//! use consensus_qc::liftover::table::Builder;
//!
//! let msa = consensus_qc::msa::read(&b">ref\nACGT--A\n>cons\n-CGTTTA\n"[..])?;
//! let table = Builder::default().try_build_from_msa(&msa)?;
//!
//! assert_eq!(table.lift(1, System::Reference, System::Consensus)?, 0);
//! assert_eq!(table.lift(5, System::Reference, System::Consensus)?, 6);
//!
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Judging and masking
//!
//! A [`Pileup`] holds the evidence for every consensus position. Feed it
//! [`pileup::Observation`]s, then ask it for the masked consensus, a
//! [`pileup::Summary`], or a per-position table. Positions never observed
//! are always masked.
//!
//! ```
//! use consensus_qc::pileup::Builder;
//! use consensus_qc::pileup::Observation;
//! use omics::coordinate::Strand;
//!
//! let msa = consensus_qc::msa::read(&b">ref\nACGT\n>cons\nACGT\n"[..])?;
//! let mut pileup = Builder::default().try_build(b"ACGT".to_vec(), &msa)?;
//!
//! for _ in 0..25 {
//!     pileup.update(1, &Observation::new(b'C', Strand::Positive, false, None))?;
//! }
//!
//! assert_eq!(pileup.mask(), "NCNN");
//! assert_eq!(pileup.summary().masked(), 3);
//!
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Variant calls made against either coordinate system can then be rewritten
//! with a [`vcf::Annotator`].

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod alignment;
pub mod liftover;
pub mod mask;
pub mod msa;
pub mod pileup;
pub mod primers;
pub mod vcf;

pub use pileup::Pileup;
