use std::collections::HashMap;
use std::fmt;
use std::io::Write;

use crate::bin_array::BinArray;
use crate::chrom_sizes::ChromSizes;
use crate::error::Result;

/// One mapped read, as the binning engine sees it. Producing these from an
/// actual alignment file is the reader adapter's job (see `bam.rs`).
///
/// `pos` is 1-based; 0 marks an invalid/unmapped position. Position zero
/// is skipped like an unmapped read, which excludes legitimate position-0
/// alignments. Kept for output compatibility; worth revisiting.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub chrom: String,
    pub pos: u64,
    pub read_len: u64,
    pub unmapped: bool,
}

/// Per-sample skip/credit counters, for diagnostic reporting only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinningStats {
    /// Alignments credited to bins.
    pub nreads: u64,
    /// Unmapped flag set, or position zero.
    pub skipped_unmapped: u64,
    /// Chromosome not present in the registry.
    pub skipped_unknown: u64,
    /// Zero-length read, or start beyond the binned range.
    pub skipped_invalid: u64,
    /// Reads whose spill past the last bin was folded back into it.
    pub clipped: u64,
}

impl fmt::Display for BinningStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} credited, {} unmapped, {} unknown chrom, {} invalid, {} clipped at chrom end",
            self.nreads, self.skipped_unmapped, self.skipped_unknown, self.skipped_invalid, self.clipped
        )
    }
}

/// The complete per-chromosome bin arrays for one sample, in registry
/// order, plus a name index. Chromosomes absent from the registry have no
/// array here - absent is a first-class state, and reads against them are
/// discarded, not errors.
#[derive(Debug, Clone)]
pub struct SampleProfile {
    arrays: Vec<BinArray>,
    search: HashMap<String, usize>,
    bin_width: u64,
    pub stats: BinningStats,
}

impl SampleProfile {
    /// One zeroed [`BinArray`] per registry chromosome.
    pub fn new(sizes: &ChromSizes, bin_width: u64) -> Result<Self> {
        let mut arrays = Vec::with_capacity(sizes.len());
        let mut search = HashMap::with_capacity(sizes.len());
        for (name, length) in sizes.iter() {
            search.insert(name.to_string(), arrays.len());
            arrays.push(BinArray::new(name, length, bin_width)?);
        }
        Ok(Self {
            arrays,
            search,
            bin_width,
            stats: BinningStats::default(),
        })
    }

    pub fn bin_width(&self) -> u64 {
        self.bin_width
    }

    /// Arrays in registry order.
    pub fn arrays(&self) -> &[BinArray] {
        &self.arrays
    }

    pub fn get(&self, chrom: &str) -> Option<&BinArray> {
        self.search.get(chrom).map(|&idx| &self.arrays[idx])
    }

    /// Credit one alignment with unit weight, split across two adjacent
    /// bins when the read crosses a bin boundary.
    ///
    /// For a read starting at 1-based `pos` with length `len`:
    /// `start = pos - 1`, `sidx = start / w`, and
    /// `cov = min(len, w - start % w)` bases fall into bin `sidx`. A read
    /// contained in one bin adds 1.0 there; a crossing read adds
    /// `cov/len` to `sidx` and `1 - cov/len` to `sidx + 1`, which always
    /// sums to exactly 1.0. Spill past the last bin is folded into the
    /// last bin and counted, never written out of bounds.
    pub fn add_alignment(&mut self, aln: &Alignment) {
        if aln.unmapped || aln.pos == 0 {
            self.stats.skipped_unmapped += 1;
            return;
        }
        if aln.read_len == 0 {
            self.stats.skipped_invalid += 1;
            return;
        }
        let arr = match self.search.get(aln.chrom.as_str()) {
            Some(&idx) => &mut self.arrays[idx],
            None => {
                self.stats.skipped_unknown += 1;
                return;
            }
        };

        let start = aln.pos - 1;
        let sidx = (start / self.bin_width) as usize;
        if sidx >= arr.bin_count() {
            self.stats.skipped_invalid += 1;
            return;
        }

        let cov = aln.read_len.min(self.bin_width - start % self.bin_width);
        if cov == aln.read_len {
            arr.add(sidx, 1.0);
        } else if sidx + 1 < arr.bin_count() {
            let r = cov as f64 / aln.read_len as f64;
            arr.add(sidx, r);
            arr.add(sidx + 1, 1.0 - r);
        } else {
            arr.add(sidx, 1.0);
            self.stats.clipped += 1;
        }
        self.stats.nreads += 1;
    }

    /// Drive the engine over a whole alignment stream. Reader errors abort;
    /// per-record conditions are counted and skipped.
    pub fn from_alignments<I>(sizes: &ChromSizes, bin_width: u64, alignments: I) -> Result<Self>
    where
        I: IntoIterator<Item = Result<Alignment>>,
    {
        let mut profile = Self::new(sizes, bin_width)?;
        for aln in alignments {
            profile.add_alignment(&aln?);
        }
        log::info!("binning done: {}", profile.stats);
        Ok(profile)
    }

    /// Single-sample output: `<chrom>\t<start>\t<end>\t<value>` for every
    /// bin of every chromosome, registry order, bin-ascending, zeros
    /// included, no header. The last bin's end is left unclipped at
    /// `(j+1)*width`.
    pub fn write_table<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for arr in &self.arrays {
            for (j, value) in arr.bins().iter().enumerate() {
                let (start, end) = arr.span(j);
                writeln!(writer, "{}\t{}\t{}\t{:.6}", arr.chrom(), start, end, value)?;
            }
        }
        Ok(())
    }
}

/// Convenience for tests and synthetic streams.
impl Alignment {
    pub fn mapped(chrom: &str, pos: u64, read_len: u64) -> Self {
        Self {
            chrom: chrom.to_string(),
            pos,
            read_len,
            unmapped: false,
        }
    }
}

#[cfg(test)]
mod binning_tests {
    use super::*;
    use std::io::Cursor;

    const EPS: f64 = 1e-12;

    fn sizes(table: &str) -> ChromSizes {
        ChromSizes::from_reader(Cursor::new(format!("header\n{table}")), 100).unwrap()
    }

    fn get_bin(profile: &SampleProfile, chrom: &str, bin_id: usize) -> f64 {
        profile.get(chrom).unwrap().get(bin_id).unwrap()
    }

    #[test]
    fn test_read_within_one_bin_adds_exactly_one() {
        let mut p = SampleProfile::new(&sizes("chr1\t1000"), 100).unwrap();

        // 1-based 101, length 50: offsets 100..150, fully inside bin 1
        p.add_alignment(&Alignment::mapped("chr1", 101, 50));

        assert_eq!(p.stats.nreads, 1);
        assert!((get_bin(&p, "chr1", 1) - 1.0).abs() < EPS);
        for j in [0usize, 2, 3] {
            assert!((get_bin(&p, "chr1", j)).abs() < EPS);
        }
    }

    #[test]
    fn test_boundary_crossing_read_splits_fractionally() {
        // the worked scenario: pos 95, len 20, width 100
        // start=94, sidx=0, cov=6, r=0.3
        let mut p = SampleProfile::new(&sizes("chr1\t1000\nchr2\t500"), 100).unwrap();
        assert_eq!(p.get("chr1").unwrap().bin_count(), 10);
        assert_eq!(p.get("chr2").unwrap().bin_count(), 5);

        p.add_alignment(&Alignment::mapped("chr1", 95, 20));

        assert!((get_bin(&p, "chr1", 0) - 0.3).abs() < EPS);
        assert!((get_bin(&p, "chr1", 1) - 0.7).abs() < EPS);
        let sum = get_bin(&p, "chr1", 0) + get_bin(&p, "chr1", 1);
        assert!((sum - 1.0).abs() < EPS);
    }

    #[test]
    fn test_read_ending_on_boundary_does_not_spill() {
        // 1-based 91, length 10: offsets 90..100, cov == len
        let mut p = SampleProfile::new(&sizes("chr1\t1000"), 100).unwrap();
        p.add_alignment(&Alignment::mapped("chr1", 91, 10));

        assert!((get_bin(&p, "chr1", 0) - 1.0).abs() < EPS);
        assert!(get_bin(&p, "chr1", 1).abs() < EPS);
    }

    #[test]
    fn test_zero_position_is_skipped_as_unmapped() {
        let mut p = SampleProfile::new(&sizes("chr1\t1000"), 100).unwrap();
        p.add_alignment(&Alignment::mapped("chr1", 0, 50));

        assert_eq!(p.stats.nreads, 0);
        assert_eq!(p.stats.skipped_unmapped, 1);
        assert!(p.get("chr1").unwrap().total().abs() < EPS);
    }

    #[test]
    fn test_unmapped_flag_is_skipped() {
        let mut p = SampleProfile::new(&sizes("chr1\t1000"), 100).unwrap();
        let mut aln = Alignment::mapped("chr1", 10, 50);
        aln.unmapped = true;
        p.add_alignment(&aln);

        assert_eq!(p.stats.nreads, 0);
        assert_eq!(p.stats.skipped_unmapped, 1);
    }

    #[test]
    fn test_unknown_chromosome_is_silently_skipped() {
        let mut p = SampleProfile::new(&sizes("chr1\t1000"), 100).unwrap();
        p.add_alignment(&Alignment::mapped("chrUn_scaffold", 10, 50));

        assert_eq!(p.stats.nreads, 0);
        assert_eq!(p.stats.skipped_unknown, 1);
    }

    #[test]
    fn test_zero_length_read_is_invalid() {
        let mut p = SampleProfile::new(&sizes("chr1\t1000"), 100).unwrap();
        p.add_alignment(&Alignment::mapped("chr1", 10, 0));

        assert_eq!(p.stats.nreads, 0);
        assert_eq!(p.stats.skipped_invalid, 1);
    }

    #[test]
    fn test_read_starting_past_chrom_end_is_dropped() {
        let mut p = SampleProfile::new(&sizes("chr1\t1000"), 100).unwrap();
        p.add_alignment(&Alignment::mapped("chr1", 2001, 50));

        assert_eq!(p.stats.nreads, 0);
        assert_eq!(p.stats.skipped_invalid, 1);
    }

    #[test]
    fn test_spill_past_last_bin_is_clipped_and_counted() {
        // chr length 95 -> one bin [0,100); read at offset 90, length 20
        // would spill into bin 1 which does not exist
        let mut p = SampleProfile::new(&sizes("chr1\t95"), 100).unwrap();
        p.add_alignment(&Alignment::mapped("chr1", 91, 20));

        assert_eq!(p.stats.nreads, 1);
        assert_eq!(p.stats.clipped, 1);
        assert!((get_bin(&p, "chr1", 0) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_total_mass_equals_credited_reads() {
        let mut p = SampleProfile::new(&sizes("chr1\t1000"), 100).unwrap();
        let reads = [
            (1u64, 30u64),
            (95, 20),
            (250, 75),
            (333, 100),
            (901, 99),
            (999, 1),
        ];
        for (pos, len) in reads {
            p.add_alignment(&Alignment::mapped("chr1", pos, len));
        }
        // plus some that must not contribute
        p.add_alignment(&Alignment::mapped("chrX", 10, 10));
        p.add_alignment(&Alignment::mapped("chr1", 0, 10));

        assert_eq!(p.stats.nreads, reads.len() as u64);
        let total = p.get("chr1").unwrap().total();
        assert!((total - reads.len() as f64).abs() < 1e-9);
    }

    #[test]
    fn test_rebinning_same_stream_is_bit_identical() {
        let registry = sizes("chr1\t1000\nchr2\t500");
        let stream: Vec<Alignment> = vec![
            Alignment::mapped("chr1", 95, 20),
            Alignment::mapped("chr2", 17, 33),
            Alignment::mapped("chr1", 451, 77),
            Alignment::mapped("chr2", 499, 10),
        ];

        let run = |stream: &[Alignment]| {
            SampleProfile::from_alignments(
                &registry,
                100,
                stream.iter().cloned().map(Ok),
            )
            .unwrap()
        };
        let a = run(&stream);
        let b = run(&stream);

        for (x, y) in a.arrays().iter().zip(b.arrays().iter()) {
            assert_eq!(x.bins(), y.bins());
        }
        assert_eq!(a.stats, b.stats);
    }

    #[test]
    fn test_write_table_emits_every_bin() {
        let mut p = SampleProfile::new(&sizes("chr1\t250\nchr2\t100"), 100).unwrap();
        p.add_alignment(&Alignment::mapped("chr1", 95, 20));

        let mut out = Vec::new();
        p.write_table(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4); // 3 bins chr1 + 1 bin chr2
        assert_eq!(lines[0], "chr1\t0\t100\t0.300000");
        assert_eq!(lines[1], "chr1\t100\t200\t0.700000");
        assert_eq!(lines[2], "chr1\t200\t300\t0.000000"); // unclipped end
        assert_eq!(lines[3], "chr2\t0\t100\t0.000000");
    }
}
