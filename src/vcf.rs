//! Annotating variant calls with per-position verdicts.
//!
//! Headers and records are read and written with [`noodles::vcf`]. Only
//! record positions and the `FILTER`/`INFO` fields are rewritten.

pub mod annotate;

pub use annotate::Annotator;
