//! Selection-differentiation index and the other column scorers.
//!
//! The selection-differentiation index of position `n`, anchored on family A,
//! is
//!
//! ```text
//! SDI_A(n) = I_A(n) * JSD(n) / log2(20)
//! ```
//!
//! where `I_A(n)` is the information content of the column in family A (the
//! selective pressure on it) and `JSD(n)` the Jensen-Shannon distance
//! between the two families' residue distributions (their differentiation).
//! Dividing by the largest possible information content bounds the index to
//! [0, 1]. Positions that are both conserved and different score highest.
//!
//! Scoring is pluggable: [`ColumnScorer`] turns a pair of column profiles
//! into a number, and [`ScorerRegistry`] picks an implementation by name.

use std::collections::BTreeMap;
use std::fmt::Debug;

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::SdiSettings;
use crate::error::{CompareError, CompareResult};
use crate::model::{Alignment, ColumnRange};
use crate::stats::{frequency_profile, jensen_shannon_distance, max_information, total_variation, ColumnProfile};

/// Which alignment a score is anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    First,
    Second,
}

impl Anchor {
    pub fn label(&self) -> &'static str {
        match self {
            Anchor::First => "first",
            Anchor::Second => "second",
        }
    }
}

impl std::fmt::Display for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Score of one alignment position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionScore {
    /// 1-based alignment position
    pub position: usize,
    pub score: f64,
}

/// Strategy for scoring a pair of columns.
///
/// Implementations must return a finite, non-negative number that is zero
/// when both columns have the same distribution.
pub trait ColumnScorer: Send + Sync + Debug {
    /// Name used on the command line
    fn name(&self) -> &'static str;

    /// Human-readable description
    fn description(&self) -> &'static str;

    /// Score of the `anchor` column against the `other` column.
    fn score(&self, anchor: &ColumnProfile, other: &ColumnProfile) -> f64;
}

/// Information content of the anchor column times the Jensen-Shannon
/// distance, normalised to [0, 1].
#[derive(Debug, Clone, Default)]
pub struct SelectionDifferentiation {
    pub small_sample_correction: bool,
}

impl ColumnScorer for SelectionDifferentiation {
    fn name(&self) -> &'static str {
        "sdi"
    }

    fn description(&self) -> &'static str {
        "Selection-differentiation index: information content x Jensen-Shannon distance / log2(20)"
    }

    fn score(&self, anchor: &ColumnProfile, other: &ColumnProfile) -> f64 {
        let info = anchor.information_content(self.small_sample_correction);
        let jsd = jensen_shannon_distance(&anchor.distribution, &other.distribution);
        info * jsd / max_information()
    }
}

/// Plain Jensen-Shannon distance; symmetric, ignores conservation.
#[derive(Debug, Clone, Default)]
pub struct JensenShannon;

impl ColumnScorer for JensenShannon {
    fn name(&self) -> &'static str {
        "jsd"
    }

    fn description(&self) -> &'static str {
        "Jensen-Shannon distance between the two residue distributions"
    }

    fn score(&self, anchor: &ColumnProfile, other: &ColumnProfile) -> f64 {
        jensen_shannon_distance(&anchor.distribution, &other.distribution)
    }
}

/// Half the summed absolute frequency difference.
#[derive(Debug, Clone, Default)]
pub struct TotalVariation;

impl ColumnScorer for TotalVariation {
    fn name(&self) -> &'static str {
        "tv"
    }

    fn description(&self) -> &'static str {
        "Total-variation distance (half the summed frequency differences)"
    }

    fn score(&self, anchor: &ColumnProfile, other: &ColumnProfile) -> f64 {
        total_variation(&anchor.distribution, &other.distribution)
    }
}

/// Registry of the available column scorers.
pub struct ScorerRegistry {
    scorers: BTreeMap<String, Box<dyn ColumnScorer>>,
}

impl ScorerRegistry {
    /// Registry with the built-in scorers configured from `settings`.
    pub fn new(settings: &SdiSettings) -> Self {
        let mut registry = Self {
            scorers: BTreeMap::new(),
        };
        registry.register(Box::new(SelectionDifferentiation {
            small_sample_correction: settings.small_sample_correction,
        }));
        registry.register(Box::new(JensenShannon));
        registry.register(Box::new(TotalVariation));
        registry
    }

    /// Register a scorer under its own name.
    pub fn register(&mut self, scorer: Box<dyn ColumnScorer>) {
        self.scorers.insert(scorer.name().to_string(), scorer);
    }

    pub fn get(&self, name: &str) -> Option<&dyn ColumnScorer> {
        self.scorers.get(name).map(|s| s.as_ref())
    }

    /// Look up a scorer, failing with the list of known names.
    pub fn require(&self, name: &str) -> CompareResult<&dyn ColumnScorer> {
        self.get(name).ok_or_else(|| {
            CompareError::argument(format!(
                "unknown metric '{}'. Available: {}",
                name,
                self.names().join(", ")
            ))
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.scorers.keys().map(String::as_str).collect()
    }

    /// (name, description) pairs, sorted by name.
    pub fn list(&self) -> Vec<(&str, &str)> {
        self.scorers.values().map(|s| (s.name(), s.description())).collect()
    }
}

/// Number of columns both alignments share.
pub fn comparable_width(first: &Alignment, second: &Alignment) -> usize {
    let (w1, w2) = (first.alignment_length(), second.alignment_length());
    if w1 != w2 {
        warn!(
            first = w1,
            second = w2,
            "alignment lengths differ; comparing the first {} columns",
            w1.min(w2)
        );
    }
    w1.min(w2)
}

/// Turn optional 1-based bounds into a validated range over `width` columns.
///
/// A missing start means 1 and a missing end means `width`.
pub fn resolve_range(start: Option<i64>, end: Option<i64>, width: usize) -> CompareResult<ColumnRange> {
    let start = start.unwrap_or(1);
    let end = end.unwrap_or(width as i64);
    let w = width as i64;

    if start < 1 || end < 1 || start > w || end > w || start > end {
        return Err(CompareError::Range { start, end, width });
    }
    Ok(ColumnRange::new(start as usize, end as usize))
}

/// Per-column scores of one alignment pair over one range.
#[derive(Debug, Clone)]
pub struct SdiTable {
    pub range: ColumnRange,
    pub first_profiles: Vec<ColumnProfile>,
    pub second_profiles: Vec<ColumnProfile>,
    /// Scores anchored on the first alignment
    pub first: Vec<PositionScore>,
    /// Scores anchored on the second alignment
    pub second: Vec<PositionScore>,
}

impl SdiTable {
    pub fn scores(&self, anchor: Anchor) -> &[PositionScore] {
        match anchor {
            Anchor::First => &self.first,
            Anchor::Second => &self.second,
        }
    }

    pub fn profiles(&self, anchor: Anchor) -> &[ColumnProfile] {
        match anchor {
            Anchor::First => &self.first_profiles,
            Anchor::Second => &self.second_profiles,
        }
    }

    /// Index of a 1-based position inside the table.
    pub fn offset(&self, position: usize) -> Option<usize> {
        (self.range.start..=self.range.end)
            .contains(&position)
            .then(|| position - self.range.start)
    }
}

/// Computes column scores between two alignments.
#[derive(Debug)]
pub struct SdiEngine<'a> {
    scorer: &'a dyn ColumnScorer,
    pseudocount: f64,
}

impl<'a> SdiEngine<'a> {
    pub fn new(scorer: &'a dyn ColumnScorer, settings: &SdiSettings) -> Self {
        Self {
            scorer,
            pseudocount: settings.pseudocount,
        }
    }

    /// Scores every position of `range`, anchored on both alignments.
    ///
    /// Fails with a range error when the range does not fit both alignments.
    pub fn compute(&self, first: &Alignment, second: &Alignment, range: ColumnRange) -> CompareResult<SdiTable> {
        let width = first.alignment_length().min(second.alignment_length());
        if range.start < 1 || range.is_empty() || range.end > width {
            return Err(CompareError::Range {
                start: range.start as i64,
                end: range.end as i64,
                width,
            });
        }

        let first_profiles = frequency_profile(first, range, self.pseudocount);
        let second_profiles = frequency_profile(second, range, self.pseudocount);

        let score_with = |anchor: &[ColumnProfile], other: &[ColumnProfile]| -> Vec<PositionScore> {
            range
                .positions()
                .zip(anchor.iter().zip(other.iter()))
                .map(|(position, (a, o))| PositionScore {
                    position,
                    score: self.scorer.score(a, o),
                })
                .collect()
        };
        let first_scores = score_with(&first_profiles, &second_profiles);
        let second_scores = score_with(&second_profiles, &first_profiles);

        debug!(metric = self.scorer.name(), %range, "scored columns");
        Ok(SdiTable {
            range,
            first_profiles,
            second_profiles,
            first: first_scores,
            second: second_scores,
        })
    }

    /// Scores anchored on one alignment only.
    pub fn compute_sdi(
        &self,
        first: &Alignment,
        second: &Alignment,
        range: ColumnRange,
        anchor: Anchor,
    ) -> CompareResult<Vec<PositionScore>> {
        let table = self.compute(first, second, range)?;
        Ok(match anchor {
            Anchor::First => table.first,
            Anchor::Second => table.second,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sequence;

    fn make_alignment(rows: &[&str]) -> Alignment {
        Alignment::new(
            rows.iter()
                .enumerate()
                .map(|(i, r)| Sequence::new(format!("seq{}", i), r))
                .collect(),
        )
    }

    fn registry() -> ScorerRegistry {
        ScorerRegistry::new(&SdiSettings::default())
    }

    #[test]
    fn test_registry_lists_builtins() {
        let registry = registry();
        assert_eq!(registry.names(), vec!["jsd", "sdi", "tv"]);
        assert!(registry.get("sdi").is_some());
        assert!(registry.get("kl").is_none());
        assert!(matches!(registry.require("kl"), Err(CompareError::Argument(_))));
        assert_eq!(registry.list().len(), 3);
    }

    #[test]
    fn test_resolve_range_defaults_and_bounds() {
        assert_eq!(resolve_range(None, None, 10).unwrap(), ColumnRange::new(1, 10));
        assert_eq!(resolve_range(Some(3), None, 10).unwrap(), ColumnRange::new(3, 10));
        assert_eq!(resolve_range(Some(4), Some(4), 10).unwrap(), ColumnRange::new(4, 4));

        for (s, e) in [(0, 5), (-1, 5), (6, 5), (1, 11), (11, 12)] {
            assert!(
                matches!(resolve_range(Some(s), Some(e), 10), Err(CompareError::Range { .. })),
                "{}..{} accepted",
                s,
                e
            );
        }
    }

    #[test]
    fn test_one_score_per_position() {
        let a = make_alignment(&["ACDEFGHIKL", "ACDEFGHIKL", "ACDQFGHIKL"]);
        let b = make_alignment(&["ACDEWGHIKL", "MCDEWGHIKL", "ACDEWGHIKL"]);
        let scorers = registry();
        let engine = SdiEngine::new(scorers.get("sdi").unwrap(), &SdiSettings::default());

        for (start, end) in [(1, 10), (3, 7), (5, 5)] {
            let range = ColumnRange::new(start, end);
            let table = engine.compute(&a, &b, range).unwrap();
            assert_eq!(table.first.len(), end - start + 1);
            assert_eq!(table.second.len(), end - start + 1);
            for (s, expected) in table.first.iter().zip(start..=end) {
                assert_eq!(s.position, expected);
                assert!(s.score.is_finite() && s.score >= 0.0);
            }
        }
    }

    #[test]
    fn test_identical_columns_score_zero() {
        let a = make_alignment(&["ACDE", "ACWE", "MC-E"]);
        let b = make_alignment(&["MCDE", "AC-E", "ACWE"]);
        let scorers = registry();
        for name in scorers.names() {
            let engine = SdiEngine::new(scorers.get(name).unwrap(), &SdiSettings::default());
            let table = engine.compute(&a, &b, ColumnRange::new(1, 4)).unwrap();
            for s in table.first.iter().chain(table.second.iter()) {
                assert_eq!(s.score, 0.0, "{} at {}", name, s.position);
            }
        }
    }

    #[test]
    fn test_differing_conserved_column_scores_highest() {
        let a = make_alignment(&["AAKA", "AAKA", "AAKA", "AAKA"]);
        let b = make_alignment(&["AADA", "AADA", "AADA", "AADA"]);
        let scorers = registry();
        let engine = SdiEngine::new(scorers.get("sdi").unwrap(), &SdiSettings::default());
        let scores = engine
            .compute_sdi(&a, &b, ColumnRange::new(1, 4), Anchor::First)
            .unwrap();

        assert!(scores[2].score > 0.3);
        assert!(scores[2].score <= 1.0);
        assert_eq!(scores[0].score, 0.0);
    }

    #[test]
    fn test_anchor_uses_anchor_conservation() {
        // First family conserved, second variable at position 1.
        let a = make_alignment(&["W", "W", "W", "W", "W", "W"]);
        let b = make_alignment(&["A", "C", "D", "E", "F", "G"]);
        let scorers = registry();
        let engine = SdiEngine::new(scorers.get("sdi").unwrap(), &SdiSettings::default());
        let table = engine.compute(&a, &b, ColumnRange::new(1, 1)).unwrap();
        assert!(table.first[0].score > table.second[0].score);

        // Symmetric metrics give the same value both ways.
        let engine = SdiEngine::new(scorers.get("jsd").unwrap(), &SdiSettings::default());
        let table = engine.compute(&a, &b, ColumnRange::new(1, 1)).unwrap();
        assert!((table.first[0].score - table.second[0].score).abs() < 1e-15);
    }

    #[test]
    fn test_small_sample_correction_zeroes_tiny_families() {
        let a = make_alignment(&["K", "K"]);
        let b = make_alignment(&["D", "D"]);
        let settings = SdiSettings {
            small_sample_correction: true,
            ..SdiSettings::default()
        };
        let scorers = ScorerRegistry::new(&settings);
        let engine = SdiEngine::new(scorers.get("sdi").unwrap(), &settings);
        let table = engine.compute(&a, &b, ColumnRange::new(1, 1)).unwrap();
        assert_eq!(table.first[0].score, 0.0);
    }

    #[test]
    fn test_range_outside_shorter_alignment() {
        let a = make_alignment(&["ACDEF"]);
        let b = make_alignment(&["ACD"]);
        let scorers = registry();
        let engine = SdiEngine::new(scorers.get("sdi").unwrap(), &SdiSettings::default());

        assert_eq!(comparable_width(&a, &b), 3);
        assert!(engine.compute(&a, &b, ColumnRange::new(1, 3)).is_ok());
        assert!(matches!(
            engine.compute(&a, &b, ColumnRange::new(2, 4)),
            Err(CompareError::Range { width: 3, .. })
        ));
    }

    #[test]
    fn test_table_offset() {
        let a = make_alignment(&["ACDEF"]);
        let scorers = registry();
        let engine = SdiEngine::new(scorers.get("tv").unwrap(), &SdiSettings::default());
        let table = engine.compute(&a, &a, ColumnRange::new(2, 4)).unwrap();
        assert_eq!(table.offset(2), Some(0));
        assert_eq!(table.offset(4), Some(2));
        assert_eq!(table.offset(1), None);
        assert_eq!(table.offset(5), None);
    }
}
