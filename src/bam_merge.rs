//! Sequential merge of chromosome-scoped temp BAMs
//!
//! The parallel phase leaves one filtered BAM per chromosome. Concatenating
//! them in header reference order reproduces coordinate order for the final
//! output, since every temp file was written from an indexed fetch of a
//! coordinate-sorted input. The temp files are removed afterwards.

use std::path::Path;

use anyhow::{Context, Result};
use rust_htslib::bam::{self, Read as BamRead};

use crate::chrom_filter::chrom_out_path;

/// Concatenate the per-chromosome temp files into `out_path`, in the order
/// given by `chroms` (the input header's reference order). The final writer
/// carries the input's header and is created even for an input with no
/// references, so a run never succeeds without producing its output file.
/// Returns the number of records written. A missing temp file means a lane
/// failed to produce its output and is an error, not a silent omission.
pub fn merge_chrom_bams(in_path: &Path, out_path: &Path, chroms: &[String]) -> Result<u64> {
    let template = bam::Reader::from_path(in_path)
        .with_context(|| format!("not found {}", in_path.display()))?;
    let header = bam::Header::from_template(template.header());
    let mut writer = bam::Writer::from_path(out_path, &header, bam::Format::Bam)
        .with_context(|| format!("can not write {}", out_path.display()))?;

    let mut written = 0u64;
    for chrom in chroms {
        let part_path = chrom_out_path(out_path, chrom);
        let mut part = bam::Reader::from_path(&part_path)
            .with_context(|| format!("not found {}", part_path.display()))?;

        let mut record = bam::Record::new();
        while let Some(result) = part.read(&mut record) {
            result.with_context(|| format!("failed to read {}", part_path.display()))?;
            writer
                .write(&record)
                .with_context(|| format!("failed to write {}", out_path.display()))?;
            written += 1;
        }
    }

    Ok(written)
}

/// Delete the per-chromosome temp files.
pub fn remove_temp_files(out_path: &Path, chroms: &[String]) -> Result<()> {
    for chrom in chroms {
        let part_path = chrom_out_path(out_path, chrom);
        std::fs::remove_file(&part_path)
            .with_context(|| format!("failed to remove {}", part_path.display()))?;
    }
    Ok(())
}
