// End-to-end runs over real (synthesized) BAM files: chromosome size
// table -> registry -> binning engine -> merge -> table writer.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use rust_htslib::bam::header::HeaderRecord;
use rust_htslib::bam::record::{Cigar, CigarString};
use rust_htslib::bam::{Format, Header, Record, Writer};
use tempfile::TempDir;

use bincov::alignment_policy::AlignmentPolicy;
use bincov::bam::bin_bam_file;
use bincov::chrom_sizes::{ChromSizes, DEFAULT_MAX_CHROMS};
use bincov::merge::write_merged;
use bincov::profile::SampleProfile;

const EPS: f64 = 1e-9;

fn registry(table: &str) -> ChromSizes {
    ChromSizes::from_reader(Cursor::new(format!("chrom\tsize\n{table}")), DEFAULT_MAX_CHROMS)
        .unwrap()
}

fn bam_header(chroms: &[(&str, u64)]) -> Header {
    let mut header = Header::new();
    for (name, len) in chroms {
        let mut rec = HeaderRecord::new(b"SQ");
        rec.push_tag(b"SN", name);
        rec.push_tag(b"LN", len);
        header.push_record(&rec);
    }
    header
}

fn mapped_record(qname: &[u8], tid: i32, pos0: i64, read_len: usize, flags: u16) -> Record {
    let mut rec = Record::new();
    let seq = vec![b'A'; read_len];
    let qual = vec![30u8; read_len];
    let cigar = CigarString(vec![Cigar::Match(read_len as u32)]);
    rec.set(qname, Some(&cigar), &seq, &qual);
    rec.set_flags(flags);
    rec.set_tid(tid);
    rec.set_pos(pos0);
    rec.set_mapq(60);
    rec
}

fn write_bam(path: &Path, chroms: &[(&str, u64)], records: &[Record]) {
    let header = bam_header(chroms);
    let mut writer = Writer::from_path(path, &header, Format::Bam).unwrap();
    for rec in records {
        writer.write(rec).unwrap();
    }
}

fn tmp_bam(dir: &TempDir, name: &str, chroms: &[(&str, u64)], records: &[Record]) -> PathBuf {
    let path = dir.path().join(name);
    write_bam(&path, chroms, records);
    path
}

#[test]
fn test_single_sample_bam_to_table() {
    let dir = TempDir::new().unwrap();
    let sizes = registry("chr1\t1000\nchr2\t500");
    let chroms = [("chr1", 1000u64), ("chr2", 500u64)];

    let bam = tmp_bam(
        &dir,
        "sample.bam",
        &chroms,
        &[
            // 0-based 94 -> engine sees 1-based 95; len 20 crosses the
            // first bin boundary as 0.3 / 0.7
            mapped_record(b"r1", 0, 94, 20, 0),
            // fully inside chr1 bin 0
            mapped_record(b"r2", 0, 0, 50, 0),
            // chr2 bin 0
            mapped_record(b"r3", 1, 10, 10, 0),
            // unmapped: filtered before the engine
            mapped_record(b"r4", -1, -1, 10, 0x4),
        ],
    );

    let profile = bin_bam_file(&bam, &sizes, 100, &AlignmentPolicy::default()).unwrap();

    assert_eq!(profile.stats.nreads, 3);
    let chr1 = profile.get("chr1").unwrap();
    assert_eq!(chr1.bin_count(), 10);
    assert!((chr1.get(0).unwrap() - 1.3).abs() < EPS);
    assert!((chr1.get(1).unwrap() - 0.7).abs() < EPS);
    assert!((profile.get("chr2").unwrap().get(0).unwrap() - 1.0).abs() < EPS);

    // total mass == credited reads
    let total: f64 = profile.arrays().iter().map(|a| a.total()).sum();
    assert!((total - 3.0).abs() < EPS);

    let mut out = Vec::new();
    profile.write_table(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 15); // 10 bins chr1 + 5 bins chr2
    assert_eq!(lines[0], "chr1\t0\t100\t1.300000");
    assert_eq!(lines[1], "chr1\t100\t200\t0.700000");
    assert_eq!(lines[10], "chr2\t0\t100\t1.000000");
}

#[test]
fn test_treatment_control_merge_through_files() {
    let dir = TempDir::new().unwrap();
    let sizes = registry("chr1\t300\nchr2\t200");
    let chroms = [("chr1", 300u64), ("chr2", 200u64)];

    let ip = tmp_bam(
        &dir,
        "ip.bam",
        &chroms,
        &[
            mapped_record(b"t1", 0, 0, 40, 0),
            mapped_record(b"t2", 0, 120, 40, 0),
        ],
    );
    let input = tmp_bam(
        &dir,
        "input.bam",
        &chroms,
        &[mapped_record(b"c1", 1, 10, 40, 0)],
    );

    let policy = AlignmentPolicy::default();
    let a = bin_bam_file(&ip, &sizes, 100, &policy).unwrap();
    let b = bin_bam_file(&input, &sizes, 100, &policy).unwrap();

    let out_path = dir.path().join("merged.tsv");
    let mut file = fs::File::create(&out_path).unwrap();
    write_merged(&a, &b, &mut file).unwrap();

    let text = fs::read_to_string(&out_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5); // 3 bins chr1 + 2 bins chr2

    assert_eq!(lines[0], "chr1\t0\t100\t1.000000\t0.000000");
    assert_eq!(lines[1], "chr1\t100\t200\t1.000000\t0.000000");
    assert_eq!(lines[2], "chr1\t200\t300\t0.000000\t0.000000");
    assert_eq!(lines[3], "chr2\t0\t100\t0.000000\t1.000000");
    assert_eq!(lines[4], "chr2\t100\t200\t0.000000\t0.000000");
}

#[test]
fn test_profiles_from_different_registries_still_merge() {
    let dir = TempDir::new().unwrap();

    // treatment knows chr1 only; control knows chr1 (shorter) and chrY
    let sizes_a = registry("chr1\t350");
    let sizes_b = registry("chr1\t150\nchrY\t100");
    let chroms_a = [("chr1", 350u64)];
    let chroms_b = [("chr1", 150u64), ("chrY", 100u64)];

    let bam_a = tmp_bam(&dir, "a.bam", &chroms_a, &[mapped_record(b"a1", 0, 300, 10, 0)]);
    let bam_b = tmp_bam(&dir, "b.bam", &chroms_b, &[mapped_record(b"b1", 1, 0, 10, 0)]);

    let policy = AlignmentPolicy::default();
    let a = bin_bam_file(&bam_a, &sizes_a, 100, &policy).unwrap();
    let b = bin_bam_file(&bam_b, &sizes_b, 100, &policy).unwrap();

    let mut out = Vec::new();
    write_merged(&a, &b, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    // chr1 defined by A (4 bins), then B-exclusive chrY (1 bin)
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[3], "chr1\t300\t400\t1.000000\t0.000000");
    assert_eq!(lines[4], "chrY\t0\t100\t0.000000\t1.000000");
}

#[test]
fn test_duplicate_records_follow_the_policy() {
    let dir = TempDir::new().unwrap();
    let sizes = registry("chr1\t1000");
    let chroms = [("chr1", 1000u64)];

    let bam = tmp_bam(
        &dir,
        "dups.bam",
        &chroms,
        &[
            mapped_record(b"r1", 0, 0, 50, 0),
            mapped_record(b"r2", 0, 0, 50, 0x400), // duplicate
        ],
    );

    let strict = bin_bam_file(&bam, &sizes, 100, &AlignmentPolicy::default()).unwrap();
    assert_eq!(strict.stats.nreads, 1);

    let lenient_policy = AlignmentPolicy::new(0, false, false, true, None);
    let lenient = bin_bam_file(&bam, &sizes, 100, &lenient_policy).unwrap();
    assert_eq!(lenient.stats.nreads, 2);
    assert!((lenient.get("chr1").unwrap().get(0).unwrap() - 2.0).abs() < EPS);
}

#[test]
fn test_bam_chromosome_missing_from_registry_is_skipped() {
    let dir = TempDir::new().unwrap();
    // BAM maps against chrM which the size table does not list
    let sizes = registry("chr1\t1000");
    let chroms = [("chr1", 1000u64), ("chrM", 16000u64)];

    let bam = tmp_bam(
        &dir,
        "extra.bam",
        &chroms,
        &[
            mapped_record(b"r1", 0, 0, 50, 0),
            mapped_record(b"r2", 1, 0, 50, 0),
        ],
    );

    let profile = bin_bam_file(&bam, &sizes, 100, &AlignmentPolicy::default()).unwrap();
    assert_eq!(profile.stats.nreads, 1);
    assert_eq!(profile.stats.skipped_unknown, 1);
    assert!(profile.get("chrM").is_none());
}

#[test]
fn test_rerunning_the_same_bam_is_bit_identical() {
    let dir = TempDir::new().unwrap();
    let sizes = registry("chr1\t1000");
    let chroms = [("chr1", 1000u64)];

    let bam = tmp_bam(
        &dir,
        "twice.bam",
        &chroms,
        &[
            mapped_record(b"r1", 0, 94, 20, 0),
            mapped_record(b"r2", 0, 333, 77, 0),
            mapped_record(b"r3", 0, 998, 30, 0),
        ],
    );

    let policy = AlignmentPolicy::default();
    let x = bin_bam_file(&bam, &sizes, 100, &policy).unwrap();
    let y = bin_bam_file(&bam, &sizes, 100, &policy).unwrap();

    for (ax, ay) in x.arrays().iter().zip(y.arrays().iter()) {
        assert_eq!(ax.bins(), ay.bins());
    }
    assert_eq!(x.stats, y.stats);
}

#[test]
fn test_chrom_sizes_file_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("genome.chrom.sizes");
    fs::write(&path, "chrom\tsize\nchr1\t1000\nchr2\t500\n").unwrap();

    let sizes = ChromSizes::from_path(&path, DEFAULT_MAX_CHROMS).unwrap();
    assert_eq!(sizes.resolve("chr1"), Some(1000));

    let profile = SampleProfile::new(&sizes, 100).unwrap();
    assert_eq!(profile.get("chr1").unwrap().bin_count(), 10);
    assert_eq!(profile.get("chr2").unwrap().bin_count(), 5);
}
