use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{Error, Result};

/// Cap on distinct chromosomes in one size table. A policy choice, not an
/// architectural limit - the container itself grows.
pub const DEFAULT_MAX_CHROMS: usize = 8192;

/// The chromosome registry: an ordered (name, length) table plus a hash
/// index for O(1) lookups. File order is the canonical chromosome order
/// for all downstream output.
#[derive(Debug, Clone)]
pub struct ChromSizes {
    entries: Vec<(String, u64)>,
    search: HashMap<String, usize>,
}

impl ChromSizes {
    /// Load a two-column `<name> <length>` table. The first line is a
    /// header and is skipped without validation.
    pub fn from_path<P: AsRef<Path>>(path: P, max_chroms: usize) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file), max_chroms)
    }

    /// Any line after the header that does not start with
    /// `<name> <non-negative integer>` aborts the load; a malformed size
    /// table is a fatal input error, not something to skip past.
    pub fn from_reader<R: BufRead>(reader: R, max_chroms: usize) -> Result<Self> {
        let mut entries: Vec<(String, u64)> = Vec::new();
        let mut search: HashMap<String, usize> = HashMap::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line_no == 0 {
                // header
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }

            let mut fields = line.split_whitespace();
            let parsed = match (fields.next(), fields.next()) {
                (Some(name), Some(len)) => len.parse::<u64>().ok().map(|l| (name, l)),
                _ => None,
            };
            let (name, length) = parsed.ok_or_else(|| Error::MalformedChromSizes {
                line: line_no + 1,
                text: line.clone(),
            })?;

            match search.get(name) {
                // duplicate name: last length wins, first position kept
                Some(&idx) => entries[idx].1 = length,
                None => {
                    if entries.len() >= max_chroms {
                        return Err(Error::TooManyChromosomes { max: max_chroms });
                    }
                    search.insert(name.to_string(), entries.len());
                    entries.push((name.to_string(), length));
                }
            }
        }

        Ok(Self { entries, search })
    }

    /// Exact, case-sensitive lookup.
    pub fn resolve(&self, name: &str) -> Option<u64> {
        self.search.get(name).map(|&idx| self.entries[idx].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(name, len)| (name.as_str(), *len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn load(text: &str) -> Result<ChromSizes> {
        ChromSizes::from_reader(Cursor::new(text), DEFAULT_MAX_CHROMS)
    }

    #[test]
    fn test_header_is_skipped_unvalidated() {
        // the header line would never parse as a size entry
        let sizes = load("#chrom\tsize\nchr1\t1000\nchr2\t500\n").unwrap();
        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes.resolve("chr1"), Some(1000));
        assert_eq!(sizes.resolve("chr2"), Some(500));
    }

    #[test]
    fn test_order_is_file_order() {
        let sizes = load("header\nchrM\t16000\nchr1\t1000\n").unwrap();
        let names: Vec<&str> = sizes.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["chrM", "chr1"]);
    }

    #[test]
    fn test_malformed_line_aborts() {
        let err = load("header\nchr1\t1000\nchr2\tnot_a_number\n").unwrap_err();
        match err {
            Error::MalformedChromSizes { line, text } => {
                assert_eq!(line, 3);
                assert!(text.contains("chr2"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_length_aborts() {
        assert!(load("header\nchr1\n").is_err());
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        let sizes = load("header\nchr1\t1000\n").unwrap();
        assert_eq!(sizes.resolve("chr1"), Some(1000));
        assert_eq!(sizes.resolve("Chr1"), None);
        assert_eq!(sizes.resolve("chr2"), None);
    }

    #[test]
    fn test_capacity_cap() {
        let err = ChromSizes::from_reader(
            Cursor::new("header\nchr1\t10\nchr2\t10\nchr3\t10\n"),
            2,
        )
        .unwrap_err();
        assert!(matches!(err, Error::TooManyChromosomes { max: 2 }));
    }

    #[test]
    fn test_duplicate_name_last_length_wins() {
        let sizes = load("header\nchr1\t1000\nchr2\t500\nchr1\t2000\n").unwrap();
        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes.resolve("chr1"), Some(2000));
        let names: Vec<&str> = sizes.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["chr1", "chr2"]);
    }

    #[test]
    fn test_blank_lines_ignored() {
        let sizes = load("header\nchr1\t1000\n\n   \nchr2\t500\n").unwrap();
        assert_eq!(sizes.len(), 2);
    }
}
