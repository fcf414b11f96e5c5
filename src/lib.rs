//! Strand-orientation filtering of paired-end BAM alignments.
//!
//! Classifies each read pair by the two-mate `ZS` orientation signature and
//! removes pairs inconsistent with the library preparation protocol
//! (traditional/directional, Pico/non-directional, or a user-supplied
//! tag-pair list, auto-detected when unspecified). Works chromosome by
//! chromosome over an indexed, coordinate-sorted BAM, in parallel lanes.

pub mod bam_merge;
pub mod chrom_filter;
pub mod detect;
pub mod pair_table;
pub mod scheduler;
pub mod stats;
pub mod tags;

pub use chrom_filter::ChromMode;
pub use tags::{Protocol, ValidTags};
