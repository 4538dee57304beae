// Write a profile as BigWig and read it back through bigtools.

use std::io::Cursor;

use bigtools::BigWigRead;
use tempfile::TempDir;

use bincov::bigwig::write_bigwig;
use bincov::chrom_sizes::{ChromSizes, DEFAULT_MAX_CHROMS};
use bincov::profile::{Alignment, SampleProfile};

#[test]
fn test_bigwig_roundtrip() {
    let sizes = ChromSizes::from_reader(
        Cursor::new("chrom\tsize\nchr1\t250\nchr2\t100\n"),
        DEFAULT_MAX_CHROMS,
    )
    .unwrap();

    let mut profile = SampleProfile::new(&sizes, 100).unwrap();
    profile.add_alignment(&Alignment::mapped("chr1", 201, 10));
    profile.add_alignment(&Alignment::mapped("chr2", 1, 10));

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("coverage.bw");
    write_bigwig(&profile, &path).unwrap();

    let mut bw = BigWigRead::open_file(&path).unwrap();

    let chroms = bw.chroms().to_vec();
    let chr1 = chroms.iter().find(|c| c.name == "chr1").unwrap();
    assert_eq!(chr1.length, 250);

    let intervals: Vec<_> = bw
        .get_interval("chr1", 0, 250)
        .unwrap()
        .map(|iv| iv.unwrap())
        .collect();
    assert_eq!(intervals.len(), 1);
    assert_eq!(intervals[0].start, 200);
    assert_eq!(intervals[0].end, 250); // clipped to the chromosome length
    assert!((intervals[0].value - 1.0).abs() < 1e-6);

    // zero bins are not written
    let empty: Vec<_> = bw
        .get_interval("chr1", 0, 200)
        .unwrap()
        .map(|iv| iv.unwrap())
        .collect();
    assert!(empty.is_empty());
}
