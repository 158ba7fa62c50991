//! Facilities for lifting positions between the reference and the consensus.

pub mod table;

pub use table::System;
pub use table::Table;
pub use table::UNMAPPED;
