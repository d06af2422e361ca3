//! Column statistics for protein alignments.
//!
//! Residue distributions use a Bayesian estimate: every one of the 20 amino
//! acids receives a small pseudo-count, so no probability is ever zero and an
//! all-gap column becomes the uniform distribution. Gaps and ambiguity codes
//! are not counted.
//!
//! On top of the distributions this module provides the two ingredients of
//! the selection-differentiation index (information content and
//! Jensen-Shannon distance) and the consensus call reported next to it.

use rand::rngs::StdRng;
use rand_distr::{Beta, Distribution};
use thiserror::Error;

use crate::model::{residue_index, Alignment, ColumnRange, AA_COUNT, AMINO_ACIDS};

/// Errors raised while estimating a consensus interval.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("Credible interval must be between 0 and 1 (got {0})")]
    InvalidLevel(f64),

    #[error("{samples} samples are too few for a {level} credible interval")]
    TooFewSamples { samples: usize, level: f64 },

    #[error("{samples} samples leave no room outside a {level} credible interval")]
    NoTailSamples { samples: usize, level: f64 },

    #[error("Invalid posterior Beta({alpha}, {beta}): {message}")]
    InvalidPosterior { alpha: f64, beta: f64, message: String },
}

/// A residue distribution over [`AMINO_ACIDS`].
pub type Distribution20 = [f64; AA_COUNT];

/// Maximum information content of a protein column, log2(20) bits.
pub fn max_information() -> f64 {
    (AA_COUNT as f64).log2()
}

/// Residue counts and posterior distribution of one alignment column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProfile {
    /// Observed count of each standard amino acid
    pub counts: [u32; AA_COUNT],
    /// Number of rows in the alignment (gaps included)
    pub rows: usize,
    /// Pseudo-count the distribution was built with
    pub pseudocount: f64,
    /// Posterior mean residue frequencies, summing to 1
    pub distribution: Distribution20,
}

impl ColumnProfile {
    /// Builds a profile from the residues of a column.
    pub fn from_residues<I: IntoIterator<Item = u8>>(residues: I, pseudocount: f64) -> Self {
        let mut counts = [0u32; AA_COUNT];
        let mut rows = 0;
        for residue in residues {
            rows += 1;
            if let Some(idx) = residue_index(residue) {
                counts[idx] += 1;
            }
        }

        let total: f64 = counts.iter().map(|&c| c as f64 + pseudocount).sum();
        let mut distribution = [0.0; AA_COUNT];
        for (p, &c) in distribution.iter_mut().zip(counts.iter()) {
            *p = (c as f64 + pseudocount) / total;
        }

        Self {
            counts,
            rows,
            pseudocount,
            distribution,
        }
    }

    /// Dirichlet posterior parameters (counts plus prior).
    pub fn posterior_alpha(&self) -> Distribution20 {
        let mut alpha = [0.0; AA_COUNT];
        for (a, &c) in alpha.iter_mut().zip(self.counts.iter()) {
            *a = c as f64 + self.pseudocount;
        }
        alpha
    }

    /// Shannon entropy of the distribution, in bits.
    pub fn entropy(&self) -> f64 {
        entropy_bits(&self.distribution)
    }

    /// Information content in bits, clamped at zero.
    ///
    /// With `correction`, the small-sample term `(20 - 1) / (2 ln2 n)` is
    /// subtracted as well.
    pub fn information_content(&self, correction: bool) -> f64 {
        let e = if correction && self.rows > 0 {
            (AA_COUNT as f64 - 1.0) / (2.0 * std::f64::consts::LN_2 * self.rows as f64)
        } else {
            0.0
        };
        (max_information() - (self.entropy() + e)).max(0.0)
    }
}

/// Profiles of the columns of `range` in `alignment`.
pub fn frequency_profile(alignment: &Alignment, range: ColumnRange, pseudocount: f64) -> Vec<ColumnProfile> {
    range
        .indices()
        .map(|col| ColumnProfile::from_residues(alignment.column(col), pseudocount))
        .collect()
}

/// Shannon entropy in bits; zero-probability terms contribute nothing.
pub fn entropy_bits(p: &[f64]) -> f64 {
    -p.iter()
        .filter(|&&x| x > 0.0)
        .map(|&x| x * x.log2())
        .sum::<f64>()
}

/// Jensen-Shannon distance (base 2) between two distributions.
///
/// The square root of the Jensen-Shannon divergence: symmetric, in [0, 1],
/// and exactly zero when `p == q`.
pub fn jensen_shannon_distance(p: &Distribution20, q: &Distribution20) -> f64 {
    let mut divergence = 0.0_f64;
    for (&pi, &qi) in p.iter().zip(q.iter()) {
        let mi = 0.5 * (pi + qi);
        if pi > 0.0 {
            divergence += 0.5 * pi * (pi / mi).log2();
        }
        if qi > 0.0 {
            divergence += 0.5 * qi * (qi / mi).log2();
        }
    }
    // Rounding can leave a tiny negative value for near-identical inputs.
    divergence.max(0.0).sqrt().min(1.0)
}

/// Total-variation distance, half the L1 distance between distributions.
pub fn total_variation(p: &Distribution20, q: &Distribution20) -> f64 {
    0.5 * p.iter().zip(q.iter()).map(|(a, b)| (a - b).abs()).sum::<f64>()
}

/// Most probable residue of a column with a credible interval.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusCall {
    pub residue: char,
    /// Posterior mean probability of `residue`
    pub probability: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Consensus residue of a profile.
///
/// The interval is the highest-posterior-density interval of the residue's
/// marginal posterior, `Beta(a_k, sum(a) - a_k)`, estimated from `samples`
/// draws.
pub fn consensus(
    profile: &ColumnProfile,
    samples: usize,
    level: f64,
    rng: &mut StdRng,
) -> Result<ConsensusCall, StatsError> {
    let (best, probability) = profile
        .distribution
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::MIN), |acc, (i, p)| if p > acc.1 { (i, p) } else { acc });

    let alpha = profile.posterior_alpha();
    let a = alpha[best];
    let b = alpha.iter().sum::<f64>() - a;
    let beta = Beta::new(a, b).map_err(|e| StatsError::InvalidPosterior {
        alpha: a,
        beta: b,
        message: e.to_string(),
    })?;

    let draws: Vec<f64> = (0..samples).map(|_| beta.sample(rng)).collect();
    let (lower, upper) = hpd(&draws, level)?;

    Ok(ConsensusCall {
        residue: char::from(AMINO_ACIDS[best]),
        probability,
        lower,
        upper,
    })
}

/// Highest-posterior-density interval estimated from samples.
///
/// Returns the narrowest interval that contains `floor(level * n)` of the
/// sorted samples.
pub fn hpd(samples: &[f64], level: f64) -> Result<(f64, f64), StatsError> {
    let n = samples.len();
    let span = interval_span(n, level)?;

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let (start, _) = (0..n - span)
        .map(|i| (i, sorted[i + span] - sorted[i]))
        .fold((0, f64::INFINITY), |acc, (i, w)| if w < acc.1 { (i, w) } else { acc });

    Ok((sorted[start], sorted[start + span]))
}

/// Number of sample gaps an HPD interval at `level` spans over `samples`
/// sorted draws: `floor(level * samples)`, which must be in `1..samples`.
pub fn interval_span(samples: usize, level: f64) -> Result<usize, StatsError> {
    if !(level > 0.0 && level < 1.0) {
        return Err(StatsError::InvalidLevel(level));
    }

    let span = (level * samples as f64).floor() as usize;
    if span < 1 {
        return Err(StatsError::TooFewSamples { samples, level });
    }
    if samples <= span {
        return Err(StatsError::NoTailSamples { samples, level });
    }
    Ok(span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sequence;
    use rand::SeedableRng;

    fn make_alignment(rows: &[&str]) -> Alignment {
        Alignment::new(
            rows.iter()
                .enumerate()
                .map(|(i, r)| Sequence::new(format!("seq{}", i), r))
                .collect(),
        )
    }

    fn idx(aa: u8) -> usize {
        residue_index(aa).unwrap()
    }

    fn full(alignment: &Alignment) -> ColumnRange {
        ColumnRange::new(1, alignment.alignment_length())
    }

    #[test]
    fn test_distribution_sums_to_one() {
        let aln = make_alignment(&["ACDE", "ACDE", "ACDE"]);
        let profiles = frequency_profile(&aln, full(&aln), 0.05);
        assert_eq!(profiles.len(), 4);
        for p in &profiles {
            assert!((p.distribution.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_mixed_residues() {
        let aln = make_alignment(&["ACDE", "ACDF", "ACDG"]);
        let profiles = frequency_profile(&aln, full(&aln), 0.05);
        // 3 observations + 20 * 0.05 prior = 4
        assert!((profiles[0].distribution[idx(b'A')] - 3.05 / 4.0).abs() < 1e-12);
        for aa in [b'E', b'F', b'G'] {
            assert!((profiles[3].distribution[idx(aa)] - 1.05 / 4.0).abs() < 1e-12);
        }
        assert!((profiles[3].distribution[idx(b'W')] - 0.05 / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_counts() {
        let aln = make_alignment(&["A", "A", "C", "C", "C"]);
        let profile = &frequency_profile(&aln, full(&aln), 0.05)[0];
        assert_eq!(profile.counts[idx(b'A')], 2);
        assert_eq!(profile.counts[idx(b'C')], 3);
        assert_eq!(profile.rows, 5);
        assert!(profile.distribution[idx(b'C')] > profile.distribution[idx(b'A')]);
    }

    #[test]
    fn test_gap_column_is_uniform() {
        let aln = make_alignment(&["A--E", "A-XE", "A--E"]);
        let profiles = frequency_profile(&aln, full(&aln), 0.05);
        for p in profiles[1].distribution.iter().chain(profiles[2].distribution.iter()) {
            assert!((p - 1.0 / 20.0).abs() < 1e-12);
        }
        assert_eq!(profiles[1].rows, 3);
    }

    #[test]
    fn test_profile_respects_range() {
        let aln = make_alignment(&["ACDEF", "ACDEF"]);
        let profiles = frequency_profile(&aln, ColumnRange::new(2, 3), 0.05);
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].counts[idx(b'C')], 2);
        assert_eq!(profiles[1].counts[idx(b'D')], 2);
    }

    #[test]
    fn test_jsd_identical_is_zero() {
        let aln = make_alignment(&["ACDE", "ACDE", "ACWE"]);
        let profiles = frequency_profile(&aln, full(&aln), 0.05);
        for p in &profiles {
            assert_eq!(jensen_shannon_distance(&p.distribution, &p.distribution), 0.0);
        }
    }

    #[test]
    fn test_jsd_disjoint_is_near_one() {
        let mut p = [0.0; AA_COUNT];
        let mut q = [0.0; AA_COUNT];
        p[0] = 1.0;
        q[1] = 1.0;
        assert!((jensen_shannon_distance(&p, &q) - 1.0).abs() < 1e-12);

        // With the prior the distributions overlap slightly.
        let a = make_alignment(&["AAAA", "AAAA", "AAAA"]);
        let c = make_alignment(&["CCCC", "CCCC", "CCCC"]);
        let pa = &frequency_profile(&a, full(&a), 0.05)[0];
        let pc = &frequency_profile(&c, full(&c), 0.05)[0];
        let d = jensen_shannon_distance(&pa.distribution, &pc.distribution);
        assert!(d > 0.6 && d < 1.0, "distance was {}", d);
    }

    #[test]
    fn test_jsd_symmetric_and_bounded() {
        let a = make_alignment(&["A", "A", "C", "C"]);
        let b = make_alignment(&["A", "C", "C", "C"]);
        let pa = &frequency_profile(&a, full(&a), 0.05)[0];
        let pb = &frequency_profile(&b, full(&b), 0.05)[0];
        let ab = jensen_shannon_distance(&pa.distribution, &pb.distribution);
        let ba = jensen_shannon_distance(&pb.distribution, &pa.distribution);
        assert!(ab > 0.0 && ab <= 1.0);
        assert!((ab - ba).abs() < 1e-15);
    }

    #[test]
    fn test_total_variation() {
        let mut p = [0.0; AA_COUNT];
        let mut q = [0.0; AA_COUNT];
        p[0] = 0.5;
        p[1] = 0.5;
        q[1] = 1.0;
        assert!((total_variation(&p, &q) - 0.5).abs() < 1e-12);
        assert_eq!(total_variation(&p, &p), 0.0);
    }

    #[test]
    fn test_information_content_conserved() {
        let aln = make_alignment(&["AAA"; 10]);
        let profiles = frequency_profile(&aln, full(&aln), 0.05);
        let corrected = profiles[0].information_content(true);
        let raw = profiles[0].information_content(false);
        let e = 19.0 / (2.0 * std::f64::consts::LN_2 * 10.0);

        assert!((raw - corrected - e).abs() < 1e-12);
        assert!(raw > 3.0 && raw < max_information());
        assert!(corrected > 0.0);
    }

    #[test]
    fn test_information_content_uniform_near_zero() {
        let aln = make_alignment(&["ACD", "DFG", "VKR", "LMN", "PQY"]);
        for p in frequency_profile(&aln, full(&aln), 0.05) {
            assert!(p.information_content(false) < 2.5);
            assert_eq!(p.information_content(true), 0.0);
        }
    }

    #[test]
    fn test_hpd_rejects_bad_level() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(hpd(&samples, 0.0), Err(StatsError::InvalidLevel(0.0)));
        assert!(hpd(&samples, 1.0).is_err());
        assert!(hpd(&samples, 1.5).is_err());
        assert!(matches!(hpd(&[0.5], 0.95), Err(StatsError::TooFewSamples { samples: 1, .. })));
    }

    #[test]
    fn test_hpd_picks_narrowest_window() {
        let samples: Vec<f64> = (0..100).map(|i| i as f64 / 100.0).collect();
        let (lo, hi) = hpd(&samples, 0.5).unwrap();
        assert!((hi - lo - 0.5).abs() < 1e-9);

        // Dense cluster plus one outlier: the interval avoids the outlier.
        let mut clustered = vec![0.5; 19];
        clustered.push(10.0);
        let (lo, hi) = hpd(&clustered, 0.9).unwrap();
        assert_eq!((lo, hi), (0.5, 0.5));
    }

    #[test]
    fn test_consensus_call() {
        let aln = make_alignment(&["K", "K", "K", "K", "R"]);
        let profile = &frequency_profile(&aln, full(&aln), 0.05)[0];
        let mut rng = StdRng::seed_from_u64(7);
        let call = consensus(profile, 2_000, 0.95, &mut rng).unwrap();

        assert_eq!(call.residue, 'K');
        assert!((call.probability - 4.05 / 6.0).abs() < 1e-12);
        assert!(call.lower < call.probability && call.probability < call.upper);
        assert!(call.lower >= 0.0 && call.upper <= 1.0);
    }

    #[test]
    fn test_consensus_is_reproducible() {
        let aln = make_alignment(&["W", "W", "Y"]);
        let profile = &frequency_profile(&aln, full(&aln), 0.05)[0];
        let a = consensus(profile, 500, 0.9, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = consensus(profile, 500, 0.9, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_consensus_tie_uses_alphabet_order() {
        let aln = make_alignment(&["-", "-"]);
        let profile = &frequency_profile(&aln, full(&aln), 0.05)[0];
        let call = consensus(profile, 100, 0.9, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(call.residue, 'A');
    }

    #[test]
    fn test_interval_span_bounds() {
        assert_eq!(interval_span(10_000, 0.5), Ok(5_000));
        assert_eq!(interval_span(2, 0.5), Ok(1));
        assert_eq!(interval_span(10, 0.99), Ok(9));
        assert!(matches!(interval_span(2, 0.4), Err(StatsError::TooFewSamples { .. })));
    }
}
