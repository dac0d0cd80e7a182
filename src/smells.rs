//! Smell categories and per-category counters
//!
//! The eight categories form a closed set with a fixed total order, which is
//! also the column order of every header and row written by the crate.

use serde::{Serialize, Serializer};
use serde::ser::SerializeMap;
use std::fmt;
use std::ops::{AddAssign, Index};

/// A detected design-smell category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SmellCategory {
    CG,
    ROC,
    NC,
    LC,
    IM,
    IdQ,
    IQ,
    LPQ,
}

impl SmellCategory {
    /// All categories in canonical column order
    pub const ALL: [SmellCategory; 8] = [
        SmellCategory::CG,
        SmellCategory::ROC,
        SmellCategory::NC,
        SmellCategory::LC,
        SmellCategory::IM,
        SmellCategory::IdQ,
        SmellCategory::IQ,
        SmellCategory::LPQ,
    ];

    /// Canonical label as written in dataset headers
    pub fn label(self) -> &'static str {
        match self {
            SmellCategory::CG => "CG",
            SmellCategory::ROC => "ROC",
            SmellCategory::NC => "NC",
            SmellCategory::LC => "LC",
            SmellCategory::IM => "IM",
            SmellCategory::IdQ => "IdQ",
            SmellCategory::IQ => "IQ",
            SmellCategory::LPQ => "LPQ",
        }
    }

    /// Position of this category in canonical order
    pub fn position(self) -> usize {
        self as usize
    }

    /// Normalize a raw `type` cell into a category.
    ///
    /// Values are trimmed and upper-cased first, so `idq`, `IDQ` and `IdQ`
    /// all resolve to [`SmellCategory::IdQ`]. Anything outside the closed set
    /// returns `None`.
    pub fn from_label(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "CG" => Some(SmellCategory::CG),
            "ROC" => Some(SmellCategory::ROC),
            "NC" => Some(SmellCategory::NC),
            "LC" => Some(SmellCategory::LC),
            "IM" => Some(SmellCategory::IM),
            "IDQ" => Some(SmellCategory::IdQ),
            "IQ" => Some(SmellCategory::IQ),
            "LPQ" => Some(SmellCategory::LPQ),
            _ => None,
        }
    }

    /// Canonical header labels in column order
    pub fn header_labels() -> impl Iterator<Item = &'static str> {
        Self::ALL.iter().map(|category| category.label())
    }
}

impl fmt::Display for SmellCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Occurrence counts for every smell category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SmellCounts {
    counts: [u64; 8],
}

impl SmellCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence
    pub fn record(&mut self, category: SmellCategory) {
        self.counts[category.position()] += 1;
    }

    /// Record a raw label, returning whether it was a known category
    pub fn record_label(&mut self, raw: &str) -> bool {
        match SmellCategory::from_label(raw) {
            Some(category) => {
                self.record(category);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, category: SmellCategory) -> u64 {
        self.counts[category.position()]
    }

    pub fn set(&mut self, category: SmellCategory, value: u64) {
        self.counts[category.position()] = value;
    }

    /// Sum of all categories
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Add another set of counts into this one
    pub fn merge(&mut self, other: &SmellCounts) {
        for (mine, theirs) in self.counts.iter_mut().zip(other.counts.iter()) {
            *mine += theirs;
        }
    }

    /// (category, count) pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (SmellCategory, u64)> + '_ {
        SmellCategory::ALL.iter().map(move |&category| (category, self.get(category)))
    }
}

impl Index<SmellCategory> for SmellCounts {
    type Output = u64;

    fn index(&self, category: SmellCategory) -> &u64 {
        &self.counts[category.position()]
    }
}

impl AddAssign<&SmellCounts> for SmellCounts {
    fn add_assign(&mut self, other: &SmellCounts) {
        self.merge(other);
    }
}

impl FromIterator<SmellCategory> for SmellCounts {
    fn from_iter<I: IntoIterator<Item = SmellCategory>>(iter: I) -> Self {
        let mut counts = SmellCounts::new();
        for category in iter {
            counts.record(category);
        }
        counts
    }
}

impl Serialize for SmellCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(SmellCategory::ALL.len()))?;
        for (category, count) in self.iter() {
            map.serialize_entry(category.label(), &count)?;
        }
        map.end()
    }
}
