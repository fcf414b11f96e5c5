//! Chromosome-partitioned parallel execution
//!
//! Chromosomes are assigned round-robin over their header order to a fixed
//! number of worker lanes, so the partition is deterministic and independent
//! of record content (though not balanced by data volume). Each lane owns its
//! own indexed reader, pair table, and output files; per-chromosome count
//! tables are returned to the caller and merged only after all lanes have
//! joined, so no shared state is mutated during the parallel phase.

use std::path::Path;
use std::thread;

use anyhow::{anyhow, Context, Result};
use rust_htslib::bam::{self, Read as BamRead};

use crate::chrom_filter::{self, ChromMode};
use crate::pair_table::PairTable;
use crate::stats::{self, TagCounts};

/// Reference names in header order. Opening the indexed reader up front makes
/// a missing index a fatal configuration error before any lane starts.
pub fn reference_names(bam_path: &Path) -> Result<Vec<String>> {
    let reader = bam::IndexedReader::from_path(bam_path)
        .with_context(|| format!("not found index file of {}", bam_path.display()))?;
    let header = reader.header();
    let names = (0..header.target_count())
        .map(|tid| String::from_utf8_lossy(header.tid2name(tid)).into_owned())
        .collect();
    Ok(names)
}

/// Assign the i-th chromosome to lane `i % lanes`.
pub fn partition_round_robin(chroms: &[String], lanes: usize) -> Vec<Vec<String>> {
    let lanes = lanes.max(1);
    let mut batches = vec![Vec::new(); lanes];
    for (i, chrom) in chroms.iter().enumerate() {
        batches[i % lanes].push(chrom.clone());
    }
    batches
}

/// Run the per-chromosome engine over every reference in the file and return
/// the merged run-wide counts. Any lane error fails the whole run; there is
/// no partial retry.
pub fn run(bam_path: &Path, lanes: usize, mode: &ChromMode) -> Result<TagCounts> {
    let chroms = reference_names(bam_path)?;
    let batches = partition_round_robin(&chroms, lanes);

    let lane_results: Vec<Result<Vec<TagCounts>>> = thread::scope(|scope| {
        let handles: Vec<_> = batches
            .iter()
            .filter(|batch| !batch.is_empty())
            .map(|batch| {
                scope.spawn(move || -> Result<Vec<TagCounts>> {
                    let mut reader = bam::IndexedReader::from_path(bam_path)
                        .with_context(|| format!("not found index file of {}", bam_path.display()))?;
                    let mut table = PairTable::new();
                    let mut counts = Vec::with_capacity(batch.len());
                    for chrom in batch {
                        counts.push(chrom_filter::process_chrom(
                            &mut reader,
                            chrom,
                            &mut table,
                            mode,
                        )?);
                    }
                    Ok(counts)
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(anyhow!("worker lane panicked")))
            })
            .collect()
    });

    let mut global = TagCounts::default();
    for lane in lane_results {
        for counts in lane? {
            stats::merge_counts(&mut global, &counts);
        }
    }
    Ok(global)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chroms(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn round_robin_by_header_index() {
        let batches = partition_round_robin(&chroms(&["chr1", "chr2", "chr3", "chr4", "chr5"]), 2);
        assert_eq!(batches[0], chroms(&["chr1", "chr3", "chr5"]));
        assert_eq!(batches[1], chroms(&["chr2", "chr4"]));
    }

    #[test]
    fn more_lanes_than_chromosomes_leaves_empty_batches() {
        let batches = partition_round_robin(&chroms(&["chr1"]), 4);
        assert_eq!(batches.len(), 4);
        assert_eq!(batches[0], chroms(&["chr1"]));
        assert!(batches[1].is_empty());
    }

    #[test]
    fn zero_lanes_clamps_to_one() {
        let batches = partition_round_robin(&chroms(&["chr1", "chr2"]), 0);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
    }
}
