use std::collections::HashMap;
use std::path::Path;

use bigtools::beddata::BedParserStreamingIterator;
use bigtools::BigWigWrite;

use crate::error::{Error, Result};
use crate::profile::SampleProfile;

/// Streams a profile's non-zero bins as `(chrom, value)` intervals for the
/// BigWig writer. Bin ends are clipped to the chromosome length because
/// the container validates interval bounds.
pub struct ProfileValues<'a> {
    profile: &'a SampleProfile,
    chrom_idx: usize,
    bin_idx: usize,
}

impl<'a> ProfileValues<'a> {
    pub fn new(profile: &'a SampleProfile) -> Self {
        Self {
            profile,
            chrom_idx: 0,
            bin_idx: 0,
        }
    }
}

impl<'a> Iterator for ProfileValues<'a> {
    type Item = (String, bigtools::Value);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let arr = self.profile.arrays().get(self.chrom_idx)?;
            if self.bin_idx >= arr.bin_count() {
                self.chrom_idx += 1;
                self.bin_idx = 0;
                continue;
            }
            let j = self.bin_idx;
            self.bin_idx += 1;

            let value = arr.bins()[j];
            if value == 0.0 {
                continue;
            }
            let (start, end) = arr.clipped_span(j);
            return Some((
                arr.chrom().to_string(),
                bigtools::Value {
                    start: start as u32,
                    end: end as u32,
                    value: value as f32,
                },
            ));
        }
    }
}

/// Write a single-sample profile as BigWig.
pub fn write_bigwig<P: AsRef<Path>>(profile: &SampleProfile, path: P) -> Result<()> {
    let chrom_map: HashMap<String, u32> = profile
        .arrays()
        .iter()
        .filter(|arr| arr.length() > 0)
        .map(|arr| (arr.chrom().to_string(), arr.length() as u32))
        .collect();

    let mut outb = BigWigWrite::create_file(path.as_ref(), chrom_map)
        .map_err(|e| Error::BigWig(format!("failed to create file: {e}")))?;

    outb.options.channel_size = 0;
    outb.options.max_zooms = 1;
    outb.options.compress = true;
    outb.options.inmemory = false;

    let runtime = tokio::runtime::Builder::new_current_thread().build()?;

    let iter = ProfileValues::new(profile);
    let data = BedParserStreamingIterator::wrap_infallible_iter(iter, true);

    outb.write(data, runtime)
        .map_err(|e| Error::BigWig(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chrom_sizes::ChromSizes;
    use crate::profile::Alignment;
    use std::io::Cursor;

    #[test]
    fn test_profile_values_skip_zero_bins_and_clip_ends() {
        let sizes =
            ChromSizes::from_reader(Cursor::new("header\nchr1\t250\nchr2\t100\n"), 100).unwrap();
        let mut p = SampleProfile::new(&sizes, 100).unwrap();
        p.add_alignment(&Alignment::mapped("chr1", 201, 10));
        p.add_alignment(&Alignment::mapped("chr2", 1, 10));

        let values: Vec<_> = ProfileValues::new(&p).collect();
        assert_eq!(values.len(), 2);

        let (chrom, v) = &values[0];
        assert_eq!(chrom, "chr1");
        assert_eq!(v.start, 200);
        assert_eq!(v.end, 250); // clipped to chromosome length
        assert_eq!(v.value, 1.0);

        let (chrom, v) = &values[1];
        assert_eq!(chrom, "chr2");
        assert_eq!((v.start, v.end), (0, 100));
    }
}
