//! Orientation-tag extraction and valid tag-pair sets
//!
//! Each mate of a bisulfite-aligned read pair carries a `ZS` auxiliary string
//! describing its mapped strand orientation (`++`, `+-`, `-+`, `--`). A pair
//! is kept only when the combined two-mate signature belongs to the set of
//! true pairings for the library preparation protocol.

use anyhow::{anyhow, bail, Result};
use rust_htslib::bam;
use rust_htslib::bam::record::Aux;
use rustc_hash::FxHashSet;

/// Sentinel tag for a mate that was never observed (unmapped or absent).
pub const UNMAPPED_TAG: &str = "N";

/// Six true PE pairings produced by traditional (directional) library prep.
pub const TRADITIONAL_TAGS: [&str; 6] = ["++,+-", "-+,--", "++,N", "N,+-", "-+,N", "N,--"];

/// Twelve true PE pairings produced by Pico (non-directional) library prep.
pub const PICO_TAGS: [&str; 12] = [
    "++,+-", "+-,++", "-+,--", "--,-+", "++,N", "N,++", "+-,N", "N,+-", "-+,N", "N,-+", "--,N",
    "N,--",
];

/// Which mate of the template a record belongs to (FLAG 0x40 vs 0x80).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MateRole {
    First,
    Second,
}

impl MateRole {
    /// Slot index inside a tag pair. Mate order is fixed by role, not by
    /// which mate shows up first in the file.
    pub fn slot(self) -> usize {
        match self {
            MateRole::First => 0,
            MateRole::Second => 1,
        }
    }
}

/// Pull the mate role and orientation tag out of one alignment record.
///
/// Returns `None` for records that do not participate in pairing: secondary
/// alignments, and primary records with neither mate-role flag set. A primary
/// paired record without a `ZS` tag is malformed upstream output and is a hard
/// error rather than a silent "N".
pub fn extract_orientation(record: &bam::Record) -> Result<Option<(MateRole, String)>> {
    if record.is_secondary() {
        return Ok(None);
    }

    let role = if record.is_first_in_template() {
        MateRole::First
    } else if record.is_last_in_template() {
        MateRole::Second
    } else {
        return Ok(None);
    };

    match record.aux(b"ZS") {
        Ok(Aux::String(tag)) => Ok(Some((role, tag.to_string()))),
        Ok(other) => Err(anyhow!(
            "read {}: ZS tag has non-string type {:?}",
            String::from_utf8_lossy(record.qname()),
            other
        )),
        Err(e) => Err(anyhow!(
            "read {}: missing ZS orientation tag ({})",
            String::from_utf8_lossy(record.qname()),
            e
        )),
    }
}

/// Library preparation protocol with a built-in valid tag-pair set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Traditional,
    Pico,
}

impl Protocol {
    pub fn name(self) -> &'static str {
        match self {
            Protocol::Traditional => "traditional",
            Protocol::Pico => "pico",
        }
    }

    pub fn tag_pairs(self) -> &'static [&'static str] {
        match self {
            Protocol::Traditional => &TRADITIONAL_TAGS,
            Protocol::Pico => &PICO_TAGS,
        }
    }
}

/// The active set of tag-pair serializations considered true pairs.
///
/// One of these is selected per run, before the parallel phase: a built-in
/// protocol set, or an arbitrary user-supplied list. The positive-rate
/// diagnostic only makes sense for the built-in sets.
#[derive(Debug, Clone)]
pub struct ValidTags {
    set: FxHashSet<String>,
    custom: bool,
}

impl ValidTags {
    pub fn builtin(protocol: Protocol) -> Self {
        ValidTags {
            set: protocol.tag_pairs().iter().map(|s| s.to_string()).collect(),
            custom: false,
        }
    }

    /// Build from user-supplied `tag1,tag2` strings. Any number of entries is
    /// allowed (an empty set filters everything out), but each entry must be
    /// a two-slot serialization.
    pub fn custom<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = FxHashSet::default();
        for pair in pairs {
            let pair = pair.as_ref();
            if pair.split(',').count() != 2 {
                bail!("invalid tag pair {:?}: expected the form tag1,tag2", pair);
            }
            set.insert(pair.to_string());
        }
        Ok(ValidTags { set, custom: true })
    }

    pub fn contains(&self, pair: &str) -> bool {
        self.set.contains(pair)
    }

    pub fn is_custom(&self) -> bool {
        self.custom
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.set.iter().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_set_sizes() {
        let trad = ValidTags::builtin(Protocol::Traditional);
        assert_eq!(trad.iter().count(), 6);
        let pico = ValidTags::builtin(Protocol::Pico);
        assert_eq!(pico.iter().count(), 12);
    }

    #[test]
    fn traditional_is_subset_of_pico() {
        let pico = ValidTags::builtin(Protocol::Pico);
        for pair in TRADITIONAL_TAGS {
            assert!(pico.contains(pair), "{pair} missing from pico set");
        }
    }

    #[test]
    fn custom_set_membership() {
        let tags = ValidTags::custom(["++,+-", "-+,--"]).unwrap();
        assert!(tags.is_custom());
        assert!(tags.contains("++,+-"));
        assert!(!tags.contains("++,N"));
    }

    #[test]
    fn custom_rejects_malformed_pair() {
        assert!(ValidTags::custom(["++"]).is_err());
        assert!(ValidTags::custom(["++,+-,--"]).is_err());
    }

    #[test]
    fn empty_custom_set_matches_nothing() {
        let tags = ValidTags::custom(Vec::<String>::new()).unwrap();
        assert!(!tags.contains("++,+-"));
    }

    #[test]
    fn mate_role_slots() {
        assert_eq!(MateRole::First.slot(), 0);
        assert_eq!(MateRole::Second.slot(), 1);
    }
}
