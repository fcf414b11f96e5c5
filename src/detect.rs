//! Library-protocol auto-detection
//!
//! Traditional (directional) libraries only produce one member of each
//! reverse-complement pairing category (`++,+-` but not `+-,++`); Pico
//! (non-directional) libraries produce both at comparable frequency. Sampling
//! the start of the file and checking whether any such category pair occurs
//! in rough balance separates the two.
//!
//! This is a statistical detector, not a guarantee: it looks at a fixed
//! prefix of the file with no re-sampling, so a file whose leading references
//! are unrepresentative can mislead it. An explicit tag list on the command
//! line always takes precedence.

use std::path::Path;

use anyhow::{Context, Result};
use rust_htslib::bam::{self, Read as BamRead};

use crate::pair_table::PairTable;
use crate::stats::{self, TagCounts};
use crate::tags::{self, Protocol, ValidTags};

/// Detection samples at most this many primary paired records.
pub const SAMPLE_CAP: u64 = 1_000_000;

/// Balance threshold: two mirror categories count as balanced when each is
/// under 10x the other. Changing this changes classification outcomes, so it
/// is fixed.
const RATIO: u64 = 10;

#[derive(Debug)]
pub struct DetectionReport {
    pub protocol: Protocol,
    pub counts: TagCounts,
    pub sampled: u64,
}

/// True when both categories are present and neither dominates the other by
/// a factor of `RATIO` or more.
fn balanced(counts: &TagCounts, a: &str, b: &str) -> bool {
    match (counts.get(a), counts.get(b)) {
        (Some(&a), Some(&b)) => a < RATIO * b && b < RATIO * a,
        _ => false,
    }
}

/// Ratio heuristic over a tag-pair tally: Pico iff at least one
/// reverse-complement category pair occurs in balance.
pub fn classify_counts(counts: &TagCounts) -> Protocol {
    if balanced(counts, "++,+-", "+-,++") || balanced(counts, "-+,--", "--,-+") {
        Protocol::Pico
    } else {
        Protocol::Traditional
    }
}

/// Sample the leading records of the file and pick a protocol.
///
/// Reads sequentially from the start (no index use), skipping secondary and
/// unpaired records, into a single pair table; the cap applies to classified
/// records only.
pub fn detect_protocol<P: AsRef<Path>>(bam_path: P) -> Result<DetectionReport> {
    let bam_path = bam_path.as_ref();
    let mut reader = bam::Reader::from_path(bam_path)
        .with_context(|| format!("failed to open {}", bam_path.display()))?;

    let mut table = PairTable::new();
    let mut sampled = 0u64;
    let mut record = bam::Record::new();
    while sampled < SAMPLE_CAP {
        match reader.read(&mut record) {
            Some(result) => result.context("failed to read record during protocol detection")?,
            None => break,
        }
        if let Some((role, tag)) = tags::extract_orientation(&record)? {
            table.upsert(record.qname(), role, tag);
            sampled += 1;
        }
    }

    let counts = stats::tally_pairs(&table);
    let protocol = classify_counts(&counts);
    Ok(DetectionReport {
        protocol,
        counts,
        sampled,
    })
}

/// Print the sampled tally and the decision.
pub fn print_report(report: &DetectionReport) {
    println!("Number of PE tags in first 1 million mappings:");
    print!("{}", stats::format_table(&report.counts));

    let valid = ValidTags::builtin(report.protocol);
    stats::print_positive_rate(&report.counts, &valid);

    let pairs = report
        .protocol
        .tag_pairs()
        .iter()
        .map(|p| format!("({})", p))
        .collect::<Vec<_>>()
        .join(", ");
    match report.protocol {
        Protocol::Pico => println!(
            "Pico library construction detected. Retain 12 PE mapping pairs:\n{}",
            pairs
        ),
        Protocol::Traditional => println!(
            "Traditional library construction detected. Retain 6 PE mapping pairs:\n{}",
            pairs
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts_of(entries: &[(&str, u64)]) -> TagCounts {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn balanced_mirror_categories_mean_pico() {
        let counts = counts_of(&[("++,+-", 100), ("+-,++", 95)]);
        assert_eq!(classify_counts(&counts), Protocol::Pico);
    }

    #[test]
    fn dominant_category_means_traditional() {
        let counts = counts_of(&[("++,+-", 100), ("+-,++", 1)]);
        assert_eq!(classify_counts(&counts), Protocol::Traditional);
    }

    #[test]
    fn absent_mirror_category_means_traditional() {
        let counts = counts_of(&[("++,+-", 100), ("-+,--", 80)]);
        assert_eq!(classify_counts(&counts), Protocol::Traditional);
    }

    #[test]
    fn second_branch_alone_triggers_pico() {
        let counts = counts_of(&[("-+,--", 50), ("--,-+", 40), ("++,+-", 100)]);
        assert_eq!(classify_counts(&counts), Protocol::Pico);
    }

    #[test]
    fn exact_tenfold_is_not_balanced() {
        // a < 10*b must be strict: 100 vs 10 fails the balance test.
        let counts = counts_of(&[("++,+-", 100), ("+-,++", 10)]);
        assert_eq!(classify_counts(&counts), Protocol::Traditional);
    }

    #[test]
    fn empty_counts_mean_traditional() {
        assert_eq!(classify_counts(&TagCounts::default()), Protocol::Traditional);
    }
}
