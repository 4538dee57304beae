use rust_htslib::bam::Record;

/// SAM flag bits (u16)
const FLAG_UNMAPPED: u16 = 0x4;
const FLAG_SECONDARY: u16 = 0x100;
const FLAG_QCFAIL: u16 = 0x200;
const FLAG_DUPLICATE: u16 = 0x400;
const FLAG_SUPPLEMENTARY: u16 = 0x800;

/// Which BAM records enter the binning engine at all.
///
/// The default mask matches the usual coverage-tool convention: unmapped,
/// secondary, QC-fail, duplicate and supplementary records are excluded.
/// Individual classes can be re-included, or the whole mask overridden
/// with an explicit SAM flag value.
#[derive(Clone, Copy, Debug)]
pub struct AlignmentPolicy {
    pub min_mapq: u8,
    exclude_mask: u16,
}

impl Default for AlignmentPolicy {
    fn default() -> Self {
        Self::new(0, false, false, false, None)
    }
}

impl AlignmentPolicy {
    pub fn new(
        min_mapq: u8,
        include_secondary: bool,
        include_supplementary: bool,
        include_duplicates: bool,
        flag_exclude_override: Option<u16>,
    ) -> Self {
        let mut mask =
            FLAG_UNMAPPED | FLAG_SECONDARY | FLAG_QCFAIL | FLAG_DUPLICATE | FLAG_SUPPLEMENTARY;
        if include_secondary {
            mask &= !FLAG_SECONDARY;
        }
        if include_supplementary {
            mask &= !FLAG_SUPPLEMENTARY;
        }
        if include_duplicates {
            mask &= !FLAG_DUPLICATE;
        }

        Self {
            min_mapq,
            exclude_mask: flag_exclude_override.unwrap_or(mask),
        }
    }

    pub fn from_cli(cli: &crate::cli::BinCovCli) -> Self {
        Self::new(
            cli.min_mapping_quality,
            cli.include_secondary,
            cli.include_supplementary,
            cli.include_duplicates,
            cli.sam_flag_exclude,
        )
    }

    /// One bitmask test plus the MAPQ threshold.
    #[inline]
    pub fn passes_filter(&self, rec: &Record) -> bool {
        if (rec.flags() & self.exclude_mask) != 0 {
            return false;
        }
        rec.mapq() >= self.min_mapq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_record(flags: u16, mapq: u8) -> Record {
        let mut rec = Record::new();
        rec.set_flags(flags);
        rec.set_mapq(mapq);
        rec
    }

    #[test]
    fn test_plain_mapped_record_passes() {
        let policy = AlignmentPolicy::default();
        assert!(policy.passes_filter(&fake_record(0, 30)));
    }

    #[test]
    fn test_unmapped_always_excluded_by_default_mask() {
        let policy = AlignmentPolicy::new(0, true, true, true, None);
        assert!(!policy.passes_filter(&fake_record(FLAG_UNMAPPED, 30)));
    }

    #[test]
    fn test_secondary_excluded_unless_included() {
        let strict = AlignmentPolicy::default();
        let lenient = AlignmentPolicy::new(0, true, false, false, None);
        let rec = fake_record(FLAG_SECONDARY, 30);
        assert!(!strict.passes_filter(&rec));
        assert!(lenient.passes_filter(&rec));
    }

    #[test]
    fn test_supplementary_excluded_unless_included() {
        let strict = AlignmentPolicy::default();
        let lenient = AlignmentPolicy::new(0, false, true, false, None);
        let rec = fake_record(FLAG_SUPPLEMENTARY, 30);
        assert!(!strict.passes_filter(&rec));
        assert!(lenient.passes_filter(&rec));
    }

    #[test]
    fn test_duplicate_excluded_unless_included() {
        let strict = AlignmentPolicy::default();
        let lenient = AlignmentPolicy::new(0, false, false, true, None);
        let rec = fake_record(FLAG_DUPLICATE, 30);
        assert!(!strict.passes_filter(&rec));
        assert!(lenient.passes_filter(&rec));
    }

    #[test]
    fn test_explicit_mask_overrides_booleans() {
        // only exclude duplicates; secondaries slip through
        let policy = AlignmentPolicy::new(0, false, false, false, Some(FLAG_DUPLICATE));
        assert!(policy.passes_filter(&fake_record(FLAG_SECONDARY, 30)));
        assert!(!policy.passes_filter(&fake_record(FLAG_DUPLICATE, 30)));
    }

    #[test]
    fn test_min_mapq_threshold() {
        let policy = AlignmentPolicy::new(20, false, false, false, None);
        assert!(policy.passes_filter(&fake_record(0, 30)));
        assert!(policy.passes_filter(&fake_record(0, 20)));
        assert!(!policy.passes_filter(&fake_record(0, 10)));
    }
}
