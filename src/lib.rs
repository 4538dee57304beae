//! Fixed-width bin coverage profiles from BAM alignments, with an
//! optional treatment/control merge.
//!
//! The pipeline: [`chrom_sizes::ChromSizes`] (the registry) feeds
//! [`profile::SampleProfile`] (binning engine, one per sample), and
//! [`merge::MergeIter`] outer-joins two profiles by chromosome name into
//! one table. BAM decoding lives behind [`bam::AlignmentReader`].

pub mod alignment_policy;
pub mod bam;
pub mod bigwig;
pub mod bin_array;
pub mod chrom_sizes;
pub mod cli;
pub mod error;
pub mod merge;
pub mod profile;

pub use error::Error;
