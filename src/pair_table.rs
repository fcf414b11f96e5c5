//! Read-name to tag-pair working table
//!
//! One table is owned by each worker lane and scoped to a single chromosome
//! at a time: the classify pass fills it, the filter pass looks pairs up, and
//! it is cleared before the lane moves on. Keeping it per-chromosome bounds
//! memory to the reads overlapping one reference instead of the whole file.

use rustc_hash::FxHashMap;

use crate::tags::{MateRole, UNMAPPED_TAG};

/// Ordered two-mate orientation signature. Slot 0 is mate 1, slot 1 is
/// mate 2, regardless of file order; an unobserved mate stays `N`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPair {
    slots: [String; 2],
}

impl TagPair {
    fn new() -> Self {
        TagPair {
            slots: [UNMAPPED_TAG.to_string(), UNMAPPED_TAG.to_string()],
        }
    }

    fn set(&mut self, role: MateRole, tag: String) {
        self.slots[role.slot()] = tag;
    }

    /// Canonical `tag1,tag2` form used for valid-set membership and counting.
    pub fn serialize(&self) -> String {
        format!("{},{}", self.slots[0], self.slots[1])
    }
}

/// Per-chromosome mapping from read name to its tag pair.
#[derive(Debug, Default)]
pub struct PairTable {
    entries: FxHashMap<Vec<u8>, TagPair>,
}

impl PairTable {
    pub fn new() -> Self {
        PairTable::default()
    }

    /// Record one mate's tag. Inserts a fresh `(N,N)` pair for unseen names;
    /// the last write for a given mate role wins (with well-formed input each
    /// role is written at most once per chromosome).
    pub fn upsert(&mut self, qname: &[u8], role: MateRole, tag: String) {
        self.entries
            .entry(qname.to_vec())
            .or_insert_with(TagPair::new)
            .set(role, tag);
    }

    /// Look up the pair recorded for a read name. `None` means the name was
    /// never classified in this pass (secondary-only or unpaired alignments);
    /// such reads are excluded from filtering rather than passed through.
    pub fn get(&self, qname: &[u8]) -> Option<&TagPair> {
        self.entries.get(qname)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &TagPair)> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries. Called exactly once after a chromosome's second pass
    /// completes, before the table is reused for the lane's next chromosome.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
