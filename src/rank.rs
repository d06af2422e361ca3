//! Ordering of column scores.

use std::cmp::Ordering;

use tracing::info;

use crate::error::{CompareError, CompareResult};
use crate::sdi::{Anchor, PositionScore};

/// One ranked position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankEntry {
    pub position: usize,
    pub score: f64,
    pub anchor: Anchor,
}

/// Highest score first; equal scores by ascending position.
fn by_score_then_position(a: &PositionScore, b: &PositionScore) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.position.cmp(&b.position))
}

/// Returns the `top` best-scoring positions.
///
/// Fails when `top` is not positive. Asking for more positions than there
/// are scores returns all of them.
pub fn rank(scores: &[PositionScore], top: i64, anchor: Anchor) -> CompareResult<Vec<RankEntry>> {
    if top <= 0 {
        return Err(CompareError::argument(format!(
            "top must be a positive integer (got {})",
            top
        )));
    }

    let top = usize::try_from(top).unwrap_or(usize::MAX);
    if top > scores.len() {
        info!(
            requested = top,
            available = scores.len(),
            "fewer positions than requested; reporting all of them"
        );
    }

    let mut sorted = scores.to_vec();
    sorted.sort_by(by_score_then_position);
    Ok(sorted
        .into_iter()
        .take(top)
        .map(|s| RankEntry {
            position: s.position,
            score: s.score,
            anchor,
        })
        .collect())
}
