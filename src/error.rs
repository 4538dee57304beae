use std::io;

use thiserror::Error;

/// Everything that can go wrong below the CLI layer.
///
/// Per-record conditions (unknown chromosome, unmapped or zero-length reads)
/// are not errors; they are skipped and counted by the binning engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("bin width must be a positive integer")]
    InvalidBinWidth,

    #[error("malformed chromosome size line {line}: {text:?}")]
    MalformedChromSizes { line: usize, text: String },

    #[error("chromosome size table exceeds the configured maximum of {max} entries")]
    TooManyChromosomes { max: usize },

    #[error("{0}")]
    Configuration(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Bam(#[from] rust_htslib::errors::Error),

    #[error("BigWig write failed: {0}")]
    BigWig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
