//! Label-comparison metrics over a truth/prediction contingency table.
//!
//! All metrics are invariant under label permutation: labels are remapped to
//! dense indices before the table is built, so truth ids and predicted
//! cluster ids (including the noise sentinel) can be arbitrary integers.
//!
//! The adjusted mutual information follows Vinh et al. (2010): the expected
//! mutual information under the hypergeometric null model is subtracted from
//! both the score and its arithmetic-mean normalizer.

use std::collections::BTreeMap;

/// Truth-by-prediction co-occurrence counts with row/column marginals.
pub(crate) struct Contingency {
    counts: Vec<f64>,
    row_sums: Vec<f64>,
    col_sums: Vec<f64>,
    n: f64,
}

impl Contingency {
    pub(crate) fn build(truth: &[i64], pred: &[i64]) -> Self {
        debug_assert_eq!(truth.len(), pred.len());

        let mut truth_index = BTreeMap::new();
        for &t in truth {
            let next = truth_index.len();
            truth_index.entry(t).or_insert(next);
        }
        let mut pred_index = BTreeMap::new();
        for &p in pred {
            let next = pred_index.len();
            pred_index.entry(p).or_insert(next);
        }

        let n_true = truth_index.len();
        let n_pred = pred_index.len();
        let mut counts = vec![0.0; n_true * n_pred];
        for (&t, &p) in truth.iter().zip(pred.iter()) {
            counts[truth_index[&t] * n_pred + pred_index[&p]] += 1.0;
        }

        let mut row_sums = vec![0.0; n_true];
        let mut col_sums = vec![0.0; n_pred];
        for i in 0..n_true {
            for j in 0..n_pred {
                row_sums[i] += counts[i * n_pred + j];
                col_sums[j] += counts[i * n_pred + j];
            }
        }

        Self {
            counts,
            row_sums,
            col_sums,
            n: truth.len() as f64,
        }
    }

    fn n_pred(&self) -> usize {
        self.col_sums.len()
    }

    /// Mutual information between the two labelings (natural log).
    fn mutual_info(&self) -> f64 {
        let mut mi = 0.0;
        for (i, &a) in self.row_sums.iter().enumerate() {
            for (j, &b) in self.col_sums.iter().enumerate() {
                let nij = self.counts[i * self.n_pred() + j];
                if nij > 0.0 {
                    mi += (nij / self.n) * ((self.n * nij) / (a * b)).ln();
                }
            }
        }
        mi
    }
}

/// Entropy of a marginal count vector (natural log).
fn entropy(counts: &[f64], n: f64) -> f64 {
    counts
        .iter()
        .filter(|&&c| c > 0.0)
        .map(|&c| {
            let p = c / n;
            -p * p.ln()
        })
        .sum()
}

/// Homogeneity, completeness, and V-measure.
///
/// Empty labelings score a perfect (1, 1, 1), matching the convention that
/// an empty partition agrees with itself.
pub(crate) fn homogeneity_completeness_v_measure(truth: &[i64], pred: &[i64]) -> (f64, f64, f64) {
    if truth.is_empty() {
        return (1.0, 1.0, 1.0);
    }
    let table = Contingency::build(truth, pred);
    let n = table.n;
    let h_c = entropy(&table.row_sums, n);
    let h_k = entropy(&table.col_sums, n);

    // Conditional entropies from the joint counts.
    let mut h_c_given_k = 0.0;
    let mut h_k_given_c = 0.0;
    for (i, &a) in table.row_sums.iter().enumerate() {
        for (j, &b) in table.col_sums.iter().enumerate() {
            let nij = table.counts[i * table.n_pred() + j];
            if nij > 0.0 {
                h_c_given_k -= (nij / n) * (nij / b).ln();
                h_k_given_c -= (nij / n) * (nij / a).ln();
            }
        }
    }

    let homogeneity = if h_c == 0.0 { 1.0 } else { 1.0 - h_c_given_k / h_c };
    let completeness = if h_k == 0.0 { 1.0 } else { 1.0 - h_k_given_c / h_k };
    let v_measure = if homogeneity + completeness == 0.0 {
        0.0
    } else {
        2.0 * homogeneity * completeness / (homogeneity + completeness)
    };
    (homogeneity, completeness, v_measure)
}

fn comb2(x: f64) -> f64 {
    x * (x - 1.0) / 2.0
}

/// Adjusted Rand index (chance-corrected pair-counting agreement).
pub(crate) fn adjusted_rand_index(truth: &[i64], pred: &[i64]) -> f64 {
    if truth.is_empty() {
        return 1.0;
    }
    let table = Contingency::build(truth, pred);

    let sum_comb: f64 = table.counts.iter().map(|&c| comb2(c)).sum();
    let sum_comb_a: f64 = table.row_sums.iter().map(|&c| comb2(c)).sum();
    let sum_comb_b: f64 = table.col_sums.iter().map(|&c| comb2(c)).sum();

    let expected = sum_comb_a * sum_comb_b / comb2(table.n).max(1.0);
    let max_index = 0.5 * (sum_comb_a + sum_comb_b);
    let denominator = max_index - expected;

    // Both partitions trivial in the same way (all-in-one or all singletons):
    // perfect agreement by convention.
    if denominator == 0.0 {
        return 1.0;
    }
    (sum_comb - expected) / denominator
}

/// Adjusted mutual information with arithmetic-mean normalization.
pub(crate) fn adjusted_mutual_info(truth: &[i64], pred: &[i64]) -> f64 {
    if truth.is_empty() {
        return 1.0;
    }
    let table = Contingency::build(truth, pred);

    // A single class matched against a single cluster carries no information
    // to adjust; score it as perfect agreement.
    if table.row_sums.len() == 1 && table.col_sums.len() == 1 {
        return 1.0;
    }

    let mi = table.mutual_info();
    let emi = expected_mutual_info(&table);
    let h_true = entropy(&table.row_sums, table.n);
    let h_pred = entropy(&table.col_sums, table.n);
    let normalizer = 0.5 * (h_true + h_pred);

    let mut denominator = normalizer - emi;
    // Keep the sign while avoiding division by an underflowed denominator.
    if denominator < 0.0 {
        denominator = denominator.min(-f64::EPSILON);
    } else {
        denominator = denominator.max(f64::EPSILON);
    }
    (mi - emi) / denominator
}

/// Expected mutual information under the hypergeometric null model
/// (Vinh, Epps, Bailey 2010), via a log-factorial table.
fn expected_mutual_info(table: &Contingency) -> f64 {
    let n = table.n as usize;

    // ln_fact[k] = ln(k!)
    let mut ln_fact = vec![0.0f64; n + 1];
    for k in 1..=n {
        ln_fact[k] = ln_fact[k - 1] + (k as f64).ln();
    }

    let n_f = table.n;
    let mut emi = 0.0;
    for &a in &table.row_sums {
        for &b in &table.col_sums {
            let a_i = a as usize;
            let b_j = b as usize;
            let start = 1.max((a_i + b_j).saturating_sub(n));
            let end = a_i.min(b_j);
            for nij in start..=end {
                let nij_f = nij as f64;
                let term = (nij_f / n_f) * ((n_f * nij_f) / (a * b)).ln();
                let ln_weight = ln_fact[a_i] + ln_fact[b_j] + ln_fact[n - a_i] + ln_fact[n - b_j]
                    - ln_fact[n]
                    - ln_fact[nij]
                    - ln_fact[a_i - nij]
                    - ln_fact[b_j - nij]
                    - ln_fact[n + nij - a_i - b_j];
                emi += term * ln_weight.exp();
            }
        }
    }
    emi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_match_up_to_permutation() {
        let truth = [4, 4, 7, 7, 9, 9];
        let pred = [1, 1, 0, 0, 2, 2];

        let (h, c, v) = homogeneity_completeness_v_measure(&truth, &pred);
        assert!((h - 1.0).abs() < 1e-12);
        assert!((c - 1.0).abs() < 1e-12);
        assert!((v - 1.0).abs() < 1e-12);
        assert!((adjusted_rand_index(&truth, &pred) - 1.0).abs() < 1e-12);
        assert!((adjusted_mutual_info(&truth, &pred) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_merged_cluster() {
        let truth = [0, 0, 1, 1];
        let pred = [0, 0, 0, 0];

        let (h, c, v) = homogeneity_completeness_v_measure(&truth, &pred);
        assert!(h.abs() < 1e-12);
        assert!((c - 1.0).abs() < 1e-12);
        assert!(v.abs() < 1e-12);
        assert!(adjusted_rand_index(&truth, &pred).abs() < 1e-12);
    }

    #[test]
    fn test_independent_labelings_near_zero() {
        let truth = [0, 0, 1, 1];
        let pred = [0, 1, 0, 1];

        let (h, c, _) = homogeneity_completeness_v_measure(&truth, &pred);
        assert!(h.abs() < 1e-12);
        assert!(c.abs() < 1e-12);
        let ami = adjusted_mutual_info(&truth, &pred);
        assert!(ami < 0.0, "ami = {ami}");
        assert!(ami >= -1.0);
    }

    #[test]
    fn test_split_cluster_is_homogeneous() {
        // Prediction splits one truth group in two: pure clusters, incomplete.
        let truth = [0, 0, 0, 0, 1, 1];
        let pred = [0, 0, 1, 1, 2, 2];

        let (h, c, _) = homogeneity_completeness_v_measure(&truth, &pred);
        assert!((h - 1.0).abs() < 1e-12);
        assert!(c < 1.0);
    }

    #[test]
    fn test_metric_ranges() {
        let truth = [0, 0, 1, 1, 2, 2, 2];
        let pred = [-1, 0, 0, 1, 1, 2, -1];

        let (h, c, v) = homogeneity_completeness_v_measure(&truth, &pred);
        for m in [h, c, v] {
            assert!((0.0..=1.0).contains(&m));
        }
        let ari = adjusted_rand_index(&truth, &pred);
        assert!((-1.0..=1.0).contains(&ari));
        let ami = adjusted_mutual_info(&truth, &pred);
        assert!((-1.0..=1.0 + 1e-12).contains(&ami));
    }

    #[test]
    fn test_empty_labelings() {
        let (h, c, v) = homogeneity_completeness_v_measure(&[], &[]);
        assert_eq!((h, c, v), (1.0, 1.0, 1.0));
        assert_eq!(adjusted_rand_index(&[], &[]), 1.0);
        assert_eq!(adjusted_mutual_info(&[], &[]), 1.0);
    }

    #[test]
    fn test_trivial_single_cluster_pair() {
        let truth = [3, 3, 3];
        let pred = [0, 0, 0];
        assert_eq!(adjusted_rand_index(&truth, &pred), 1.0);
        assert_eq!(adjusted_mutual_info(&truth, &pred), 1.0);
    }
}
