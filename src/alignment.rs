//! Read alignments and the base calls they imply.

pub mod cigar;
pub mod interpret;

pub use cigar::Cigar;
pub use interpret::Alignment;
pub use interpret::GAP;
pub use interpret::parse_cigar;
