use clap::Parser;
use std::path::PathBuf;

use crate::chrom_sizes::DEFAULT_MAX_CHROMS;

/// Bin BAM alignments into fixed-width coverage, optionally paired with a
/// control sample into one merged table.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct BinCovCli {
    /// Chromosome size table: one header line, then `<name> <length>`
    #[arg(short = 'g', long)]
    pub chrom_sizes: PathBuf,

    /// Treatment BAM file
    #[arg(short = 'b', long)]
    pub bam: PathBuf,

    /// Control ("input") BAM file; switches to merged two-sample output
    #[arg(short = 'i', long)]
    pub input: Option<PathBuf>,

    /// Output file; a .bw/.bigwig extension selects BigWig (single-sample only)
    #[arg(short = 'o', long)]
    pub outfile: PathBuf,

    /// Bin width for coverage calculation
    #[arg(short = 'w', long, default_value_t = 50)]
    pub width: u64,

    /// Minimum mapping quality to include a read
    #[arg(long, default_value_t = 0)]
    pub min_mapping_quality: u8,

    /// Include secondary alignments
    #[arg(long, default_value_t = false)]
    pub include_secondary: bool,

    /// Include supplementary alignments
    #[arg(long, default_value_t = false)]
    pub include_supplementary: bool,

    /// Include duplicate-marked reads
    #[arg(long, default_value_t = false)]
    pub include_duplicates: bool,

    /// Exclude reads with ANY of these SAM flag bits set, overriding the
    /// include switches. Example: 2816 = secondary(256) + QC-fail(512) +
    /// supplementary(2048)
    #[arg(long)]
    pub sam_flag_exclude: Option<u16>,

    /// Maximum number of distinct chromosomes accepted from the size table
    #[arg(long, default_value_t = DEFAULT_MAX_CHROMS)]
    pub max_chroms: usize,
}
