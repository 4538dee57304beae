use std::path::Path;

use rust_htslib::bam::{self, Read, Record};

use crate::alignment_policy::AlignmentPolicy;
use crate::chrom_sizes::ChromSizes;
use crate::error::Result;
use crate::profile::{Alignment, SampleProfile};

/// Adapter from a BAM file to the plain [`Alignment`] records the binning
/// engine consumes. Decoding stays in rust-htslib; the engine never sees
/// the underlying encoding.
///
/// Positions are converted from htslib's 0-based to the engine's 1-based
/// convention, so htslib's -1 unmapped sentinel lands on the engine's
/// invalid position 0.
pub struct AlignmentReader {
    reader: bam::Reader,
    target_names: Vec<String>,
    policy: AlignmentPolicy,
    record: Record,
    /// Records rejected by the policy filter before reaching the engine.
    pub filtered: u64,
}

impl AlignmentReader {
    pub fn from_path<P: AsRef<Path>>(path: P, policy: AlignmentPolicy) -> Result<Self> {
        let reader = bam::Reader::from_path(path.as_ref())?;
        let target_names = reader
            .header()
            .target_names()
            .iter()
            .map(|name| String::from_utf8_lossy(name).to_string())
            .collect();
        Ok(Self {
            reader,
            target_names,
            policy,
            record: Record::new(),
            filtered: 0,
        })
    }

    fn to_alignment(&self, rec: &Record) -> Alignment {
        let tid = rec.tid();
        let chrom = if tid >= 0 {
            self.target_names
                .get(tid as usize)
                .cloned()
                .unwrap_or_default()
        } else {
            String::new()
        };
        let pos = if rec.pos() < 0 { 0 } else { rec.pos() as u64 + 1 };
        Alignment {
            chrom,
            pos,
            read_len: rec.seq_len() as u64,
            unmapped: rec.is_unmapped() || tid < 0,
        }
    }
}

impl Iterator for AlignmentReader {
    type Item = Result<Alignment>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.reader.read(&mut self.record) {
                None => return None,
                Some(Err(e)) => return Some(Err(e.into())),
                Some(Ok(())) => {}
            }
            if !self.policy.passes_filter(&self.record) {
                self.filtered += 1;
                continue;
            }
            return Some(Ok(self.to_alignment(&self.record)));
        }
    }
}

/// Bin one whole BAM file against a registry: the CLI's one call per
/// sample.
pub fn bin_bam_file<P: AsRef<Path>>(
    path: P,
    sizes: &ChromSizes,
    bin_width: u64,
    policy: &AlignmentPolicy,
) -> Result<SampleProfile> {
    let path = path.as_ref();
    let mut reader = AlignmentReader::from_path(path, *policy)?;
    let mut profile = SampleProfile::new(sizes, bin_width)?;
    for aln in &mut reader {
        profile.add_alignment(&aln?);
    }
    log::info!(
        "{}: {} ({} filtered by flags/MAPQ)",
        path.display(),
        profile.stats,
        reader.filtered
    );
    if profile.stats.clipped > 0 {
        log::warn!(
            "{}: {} reads spilled past a chromosome's last bin and were clipped into it",
            path.display(),
            profile.stats.clipped
        );
    }
    Ok(profile)
}
