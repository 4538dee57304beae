use std::io::Write;

use crate::bin_array::BinArray;
use crate::profile::SampleProfile;

/// One line of the merged two-sample table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergedRow<'a> {
    pub chrom: &'a str,
    pub bin_start: u64,
    pub bin_end: u64,
    pub value_a: f64,
    pub value_b: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// All of A's chromosomes, in A's registry order.
    Treatment,
    /// Chromosomes only B has, in B's order.
    ControlOnly,
}

/// Name-keyed outer join of two sample profiles.
///
/// Emits every chromosome present in either profile exactly once: first
/// A's chromosomes in A's registry order (value_b = 0.0 where B lacks the
/// chromosome or the bin), then B-exclusive chromosomes in B's order with
/// value_a = 0.0. Bins ascend within each chromosome; the row count per
/// chromosome follows whichever profile defines it, preferring A. This
/// two-phase order is deliberate and output-compatibility relevant.
///
/// Borrows both profiles read-only. Both are assumed to have been binned
/// at the same width; a mismatch is a caller configuration error.
pub struct MergeIter<'a> {
    a: &'a SampleProfile,
    b: &'a SampleProfile,
    b_only: Vec<usize>,
    phase: Phase,
    chrom_idx: usize,
    bin_idx: usize,
    partner: Option<&'a BinArray>,
}

impl<'a> MergeIter<'a> {
    pub fn new(a: &'a SampleProfile, b: &'a SampleProfile) -> Self {
        let b_only = b
            .arrays()
            .iter()
            .enumerate()
            .filter(|(_, arr)| a.get(arr.chrom()).is_none())
            .map(|(idx, _)| idx)
            .collect();
        Self {
            a,
            b,
            b_only,
            phase: Phase::Treatment,
            chrom_idx: 0,
            bin_idx: 0,
            partner: None,
        }
    }
}

impl<'a> Iterator for MergeIter<'a> {
    type Item = MergedRow<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.phase {
                Phase::Treatment => {
                    let Some(arr) = self.a.arrays().get(self.chrom_idx) else {
                        self.phase = Phase::ControlOnly;
                        self.chrom_idx = 0;
                        self.bin_idx = 0;
                        continue;
                    };
                    if self.bin_idx >= arr.bin_count() {
                        self.chrom_idx += 1;
                        self.bin_idx = 0;
                        self.partner = None;
                        continue;
                    }
                    if self.bin_idx == 0 {
                        self.partner = self.b.get(arr.chrom());
                    }

                    let j = self.bin_idx;
                    self.bin_idx += 1;
                    let (bin_start, bin_end) = arr.span(j);
                    // B may have fewer bins for this chromosome when built
                    // from a different length source: degrade to 0.0
                    let value_b = self.partner.and_then(|p| p.get(j)).unwrap_or(0.0);
                    return Some(MergedRow {
                        chrom: arr.chrom(),
                        bin_start,
                        bin_end,
                        value_a: arr.bins()[j],
                        value_b,
                    });
                }
                Phase::ControlOnly => {
                    let &b_idx = self.b_only.get(self.chrom_idx)?;
                    let arr = &self.b.arrays()[b_idx];
                    if self.bin_idx >= arr.bin_count() {
                        self.chrom_idx += 1;
                        self.bin_idx = 0;
                        continue;
                    }
                    let j = self.bin_idx;
                    self.bin_idx += 1;
                    let (bin_start, bin_end) = arr.span(j);
                    return Some(MergedRow {
                        chrom: arr.chrom(),
                        bin_start,
                        bin_end,
                        value_a: 0.0,
                        value_b: arr.bins()[j],
                    });
                }
            }
        }
    }
}

/// Tab-separated `<chrom> <start> <end> <value_a> <value_b>` rows, no
/// header, six decimal digits.
pub fn write_merged<W: Write>(
    a: &SampleProfile,
    b: &SampleProfile,
    writer: &mut W,
) -> std::io::Result<()> {
    for row in MergeIter::new(a, b) {
        writeln!(
            writer,
            "{}\t{}\t{}\t{:.6}\t{:.6}",
            row.chrom, row.bin_start, row.bin_end, row.value_a, row.value_b
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod merge_tests {
    use super::*;
    use crate::chrom_sizes::ChromSizes;
    use crate::profile::Alignment;
    use std::io::Cursor;

    const EPS: f64 = 1e-12;

    fn profile(table: &str, bin_width: u64, reads: &[(&str, u64, u64)]) -> SampleProfile {
        let sizes =
            ChromSizes::from_reader(Cursor::new(format!("header\n{table}")), 100).unwrap();
        let mut p = SampleProfile::new(&sizes, bin_width).unwrap();
        for &(chrom, pos, len) in reads {
            p.add_alignment(&Alignment::mapped(chrom, pos, len));
        }
        p
    }

    #[test]
    fn test_shared_chromosomes_pair_up() {
        let a = profile("chr1\t300", 100, &[("chr1", 1, 50), ("chr1", 101, 50)]);
        let b = profile("chr1\t300", 100, &[("chr1", 201, 50)]);

        let rows: Vec<_> = MergeIter::new(&a, &b).collect();
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].chrom, "chr1");
        assert_eq!((rows[0].bin_start, rows[0].bin_end), (0, 100));
        assert!((rows[0].value_a - 1.0).abs() < EPS);
        assert!(rows[0].value_b.abs() < EPS);

        assert!((rows[1].value_a - 1.0).abs() < EPS);
        assert!(rows[2].value_a.abs() < EPS);
        assert!((rows[2].value_b - 1.0).abs() < EPS);
    }

    #[test]
    fn test_chromosome_missing_from_control_gets_zero_b() {
        let a = profile("chr1\t200\nchrX\t200", 100, &[("chrX", 1, 10)]);
        let b = profile("chr1\t200", 100, &[]);

        let rows: Vec<_> = MergeIter::new(&a, &b).collect();
        let chrx: Vec<_> = rows.iter().filter(|r| r.chrom == "chrX").collect();
        assert_eq!(chrx.len(), 2);
        assert!(chrx.iter().all(|r| r.value_b == 0.0));
        assert!((chrx[0].value_a - 1.0).abs() < EPS);
    }

    #[test]
    fn test_control_exclusive_chromosome_emitted_once_after_a() {
        let a = profile("chr1\t200", 100, &[]);
        let b = profile("chr1\t200\nchrY\t150", 100, &[("chrY", 1, 10)]);

        let rows: Vec<_> = MergeIter::new(&a, &b).collect();
        // chr1 (2 bins, from the A pass) then chrY (2 bins, B pass)
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].chrom, "chr1");
        assert_eq!(rows[1].chrom, "chr1");
        assert_eq!(rows[2].chrom, "chrY");
        assert_eq!(rows[3].chrom, "chrY");
        assert!(rows[2].value_a.abs() < EPS);
        assert!((rows[2].value_b - 1.0).abs() < EPS);

        // shared chromosome is not re-emitted in the B pass
        let chr1_rows = rows.iter().filter(|r| r.chrom == "chr1").count();
        assert_eq!(chr1_rows, 2);
    }

    #[test]
    fn test_a_order_wins_then_b_order() {
        let a = profile("chr2\t100\nchr1\t100", 100, &[]);
        let b = profile("chrM\t100\nchr1\t100\nchrY\t100", 100, &[]);

        let chroms: Vec<&str> = MergeIter::new(&a, &b).map(|r| r.chrom).collect();
        assert_eq!(chroms, vec!["chr2", "chr1", "chrM", "chrY"]);
    }

    #[test]
    fn test_shorter_control_array_degrades_to_zero() {
        // same chromosome name, different length sources
        let a = profile("chr1\t350", 100, &[("chr1", 301, 10)]);
        let b = profile("chr1\t150", 100, &[("chr1", 101, 10)]);

        let rows: Vec<_> = MergeIter::new(&a, &b).collect();
        // A defines chr1: 4 bins
        assert_eq!(rows.len(), 4);
        assert!((rows[1].value_b - 1.0).abs() < EPS);
        assert!(rows[2].value_b.abs() < EPS); // beyond B's 2 bins
        assert!(rows[3].value_b.abs() < EPS);
        assert!((rows[3].value_a - 1.0).abs() < EPS);
    }

    #[test]
    fn test_zero_bin_chromosome_produces_no_rows() {
        let a = profile("chrEmpty\t0\nchr1\t100", 100, &[]);
        let b = profile("chr1\t100", 100, &[]);

        let rows: Vec<_> = MergeIter::new(&a, &b).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].chrom, "chr1");
    }

    #[test]
    fn test_union_coverage_and_row_counts() {
        let a = profile("chr1\t250\nchr2\t100", 100, &[]);
        let b = profile("chr2\t100\nchr3\t120", 100, &[]);

        let rows: Vec<_> = MergeIter::new(&a, &b).collect();
        let count = |c: &str| rows.iter().filter(|r| r.chrom == c).count();
        assert_eq!(count("chr1"), 3);
        assert_eq!(count("chr2"), 1);
        assert_eq!(count("chr3"), 2);
        assert_eq!(rows.len(), 6);
    }

    #[test]
    fn test_write_merged_format() {
        let a = profile("chr1\t150", 100, &[("chr1", 95, 20)]);
        let b = profile("chr1\t150", 100, &[("chr1", 1, 10)]);

        let mut out = Vec::new();
        write_merged(&a, &b, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "chr1\t0\t100\t0.300000\t1.000000");
        assert_eq!(lines[1], "chr1\t100\t200\t0.700000\t0.000000");
    }
}
