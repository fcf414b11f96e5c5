//! Two-pass per-chromosome classify/filter engine
//!
//! Pass 1 fetches every record overlapping the chromosome and fills the pair
//! table; pass 2 re-fetches the same region and writes out the records whose
//! tag pair is in the active valid set. The two passes are independent
//! traversals of the indexed region, not one buffered pass, so memory stays
//! bounded by the pair table. Counts are folded from the table afterwards
//! (one count per read name, retained or not) and the table is cleared for
//! the lane's next chromosome.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_htslib::bam::{self, Read as BamRead};

use crate::pair_table::PairTable;
use crate::stats::{self, TagCounts};
use crate::tags::{self, ValidTags};

/// What to do with a chromosome after classification.
pub enum ChromMode<'a> {
    /// Write valid pairs to a chromosome-scoped temp BAM under `out_stem`.
    Filter {
        out_stem: &'a Path,
        valid: &'a ValidTags,
    },
    /// Tally only; used by stats-only mode.
    ClassifyOnly,
}

/// Deterministic temp-file name for one chromosome's filtered output.
pub fn chrom_out_path(out_stem: &Path, chrom: &str) -> PathBuf {
    PathBuf::from(format!("{}_{}.bam", out_stem.display(), chrom))
}

/// Run both passes over one chromosome and return its tag-pair counts.
///
/// A chromosome with no overlapping records is valid: it yields an empty
/// output file (in filter mode) and an empty count table. An unknown
/// chromosome name is a configuration error and fails the run.
pub fn process_chrom(
    reader: &mut bam::IndexedReader,
    chrom: &str,
    table: &mut PairTable,
    mode: &ChromMode,
) -> Result<TagCounts> {
    eprintln!("Start chromosome {}", chrom);

    let tid = reader
        .header()
        .tid(chrom.as_bytes())
        .with_context(|| format!("unknown reference name {}", chrom))?;

    classify_pass(reader, tid, chrom, table)?;

    let kept = match mode {
        ChromMode::Filter { out_stem, valid } => {
            Some(filter_pass(reader, tid, chrom, table, out_stem, valid)?)
        }
        ChromMode::ClassifyOnly => None,
    };

    let counts = stats::tally_pairs(table);
    table.clear();

    match kept {
        Some(kept) => eprintln!("End chromosome {} ({} mappings kept)", chrom, kept),
        None => eprintln!("End chromosome {}", chrom),
    }
    Ok(counts)
}

/// Pass 1: fill the pair table from every classifiable record in the region.
fn classify_pass(
    reader: &mut bam::IndexedReader,
    tid: u32,
    chrom: &str,
    table: &mut PairTable,
) -> Result<()> {
    reader
        .fetch(tid as i32)
        .with_context(|| format!("failed to retrieve region {}", chrom))?;

    let mut record = bam::Record::new();
    while let Some(result) = reader.read(&mut record) {
        result.with_context(|| format!("failed to read record on {}", chrom))?;
        if let Some((role, tag)) = tags::extract_orientation(&record)? {
            table.upsert(record.qname(), role, tag);
        }
    }
    Ok(())
}

/// Pass 2: re-fetch the region and emit records whose pair is valid.
///
/// Only primary records with a mate-role flag are candidates; reads whose
/// name never made it into the table (secondary-only or unpaired alignments)
/// are never emitted.
fn filter_pass(
    reader: &mut bam::IndexedReader,
    tid: u32,
    chrom: &str,
    table: &PairTable,
    out_stem: &Path,
    valid: &ValidTags,
) -> Result<u64> {
    let out_path = chrom_out_path(out_stem, chrom);
    let header = bam::Header::from_template(reader.header());
    let mut writer = bam::Writer::from_path(&out_path, &header, bam::Format::Bam)
        .with_context(|| format!("can not write {}", out_path.display()))?;

    reader
        .fetch(tid as i32)
        .with_context(|| format!("failed to filter region {}", chrom))?;

    let mut written = 0u64;
    let mut record = bam::Record::new();
    while let Some(result) = reader.read(&mut record) {
        result.with_context(|| format!("failed to read record on {}", chrom))?;
        if record.is_secondary() {
            continue;
        }
        if !record.is_first_in_template() && !record.is_last_in_template() {
            continue;
        }
        if let Some(pair) = table.get(record.qname()) {
            if valid.contains(&pair.serialize()) {
                writer
                    .write(&record)
                    .with_context(|| format!("failed to write {}", out_path.display()))?;
                written += 1;
            }
        }
    }
    Ok(written)
}
