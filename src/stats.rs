//! Tag-pair count tables and their aggregation
//!
//! Each chromosome produces one `TagCounts` table (folded from its pair
//! table after the filter pass). The run-wide total is the entry-wise sum,
//! merged only after all worker lanes have joined.

use rustc_hash::FxHashMap;

use crate::pair_table::PairTable;
use crate::tags::ValidTags;

/// Tag-pair serialization -> number of read pairs observed with it.
pub type TagCounts = FxHashMap<String, u64>;

/// Fold a chromosome's pair table into counts. Each read name contributes
/// exactly one count, including half-observed pairs like `++,N`; counts cover
/// every observed pair, not just the ones retained by filtering.
pub fn tally_pairs(table: &PairTable) -> TagCounts {
    let mut counts = TagCounts::default();
    for (_, pair) in table.iter() {
        *counts.entry(pair.serialize()).or_insert(0) += 1;
    }
    counts
}

/// Add every entry of `part` into `total`, summing on collision.
pub fn merge_counts(total: &mut TagCounts, part: &TagCounts) {
    for (pair, count) in part {
        *total.entry(pair.clone()).or_insert(0) += count;
    }
}

pub fn total_count(counts: &TagCounts) -> u64 {
    counts.values().sum()
}

/// Number of counted pairs whose serialization is in the valid set.
pub fn positive_count(counts: &TagCounts, valid: &ValidTags) -> u64 {
    counts
        .iter()
        .filter(|(pair, _)| valid.contains(pair))
        .map(|(_, count)| count)
        .sum()
}

/// Tab-separated `<tagpair>\t<count>` lines sorted by tag-pair string.
pub fn format_table(counts: &TagCounts) -> String {
    let mut pairs: Vec<(&String, &u64)> = counts.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    let mut out = String::new();
    for (pair, count) in pairs {
        out.push_str(pair);
        out.push('\t');
        out.push_str(&count.to_string());
        out.push('\n');
    }
    out
}

/// Print the total/positive/rate diagnostic. The rate is undefined for an
/// empty sample and is simply not printed then, never a division by zero.
pub fn print_positive_rate(counts: &TagCounts, valid: &ValidTags) {
    let total = total_count(counts);
    let positive = positive_count(counts, valid);
    println!("total reads: {}; positive reads: {}", total, positive);
    if total > 0 {
        let rate = positive as f64 / total as f64;
        println!("Positive rate: {}", rate);
    }
}
