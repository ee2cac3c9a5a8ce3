//! Rank-sensitive retrieval metrics.
//!
//! Every function takes relevance values already ordered by the submission's
//! ranks (rank 1 first). Graded functions use the raw relevance grade; the
//! binary ones take 0/1 indicators where a grade of 1 or more counts as a hit.

/// Grades above this saturate so `2^rel - 1` stays finite when summed.
pub const MAX_GAIN_GRADE: u32 = 64;

/// Discounted cumulative gain over the first `k` positions, using exponential
/// gain `2^rel - 1` and a `log2(position + 1)` discount.
pub fn dcg_at_k(rels: &[u32], k: usize) -> f64 {
    rels.iter()
        .take(k)
        .enumerate()
        .map(|(index, rel)| gain(*rel) / ((index as f64 + 2.0).log2()))
        .sum()
}

/// DCG normalized by the DCG of the same grades sorted descending.
///
/// Returns 0.0 when the ideal DCG is zero, i.e. nothing in the list is relevant.
pub fn ndcg_at_k(rels: &[u32], k: usize) -> f64 {
    let dcg = dcg_at_k(rels, k);

    let mut ideal = rels.to_vec();
    ideal.sort_unstable_by(|left, right| right.cmp(left));
    let idcg = dcg_at_k(&ideal, k);
    if idcg <= 0.0 {
        return 0.0;
    }

    dcg / idcg
}

pub fn precision_at_k(bin_rels: &[u8], k: usize) -> f64 {
    let cutoff = bin_rels.len().min(k);
    if cutoff == 0 {
        return 0.0;
    }

    hits_at_k(bin_rels, cutoff) as f64 / cutoff as f64
}

pub fn recall_at_k(bin_rels: &[u8], total_relevant: usize, k: usize) -> f64 {
    if total_relevant == 0 {
        return 0.0;
    }

    hits_at_k(bin_rels, k) as f64 / total_relevant as f64
}

/// Average precision truncated at `k`, normalized by every relevant item the
/// query has (not just those reachable within the cutoff).
pub fn average_precision(bin_rels: &[u8], total_relevant: usize, k: usize) -> f64 {
    if total_relevant == 0 {
        return 0.0;
    }

    let mut hits = 0_usize;
    let mut precision_sum = 0.0;
    for (index, rel) in bin_rels.iter().take(k).enumerate() {
        if *rel == 1 {
            hits += 1;
            precision_sum += hits as f64 / (index + 1) as f64;
        }
    }

    precision_sum / total_relevant as f64
}

pub fn binary_relevance(rels: &[u32]) -> Vec<u8> {
    rels.iter().map(|rel| u8::from(*rel >= 1)).collect()
}

fn gain(relevance: u32) -> f64 {
    2_f64.powf(f64::from(relevance.min(MAX_GAIN_GRADE))) - 1.0
}

fn hits_at_k(bin_rels: &[u8], k: usize) -> usize {
    bin_rels.iter().take(k).filter(|rel| **rel == 1).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn dcg_discounts_by_log_position() {
        // 3/log2(2) + 1/log2(3) + 0
        let expected = 3.0 + 1.0 / 3_f64.log2();
        assert!((dcg_at_k(&[2, 1, 0], 10) - expected).abs() < EPSILON);
        assert!((dcg_at_k(&[2, 1, 0], 1) - 3.0).abs() < EPSILON);
        assert_eq!(dcg_at_k(&[], 10), 0.0);
    }

    #[test]
    fn ndcg_is_one_for_ideal_ordering() {
        assert!((ndcg_at_k(&[3, 2, 2, 1, 0, 0], 10) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn ndcg_penalizes_inverted_ordering() {
        let score = ndcg_at_k(&[0, 1, 2], 10);
        assert!(score > 0.0 && score < 1.0, "unexpected ndcg: {score}");
    }

    #[test]
    fn ndcg_stays_finite_for_huge_grades() {
        assert!((ndcg_at_k(&[u32::MAX, 5, 0], 10) - 1.0).abs() < EPSILON);

        let score = ndcg_at_k(&[u32::MAX, 0, 2048], 10);
        assert!(score.is_finite(), "unexpected ndcg: {score}");
        assert!(score > 0.0 && score < 1.0, "unexpected ndcg: {score}");
        assert!(dcg_at_k(&[u32::MAX; 30], 30).is_finite());
    }

    #[test]
    fn ndcg_is_zero_without_relevant_items() {
        assert_eq!(ndcg_at_k(&[0, 0, 0], 10), 0.0);
        assert_eq!(ndcg_at_k(&[], 10), 0.0);
    }

    #[test]
    fn precision_divides_by_items_present_in_cutoff() {
        assert!((precision_at_k(&[1, 0, 1, 0], 10) - 0.5).abs() < EPSILON);
        assert!((precision_at_k(&[1, 1, 0, 0], 2) - 1.0).abs() < EPSILON);
        assert_eq!(precision_at_k(&[], 10), 0.0);
    }

    #[test]
    fn recall_counts_hits_within_cutoff() {
        assert!((recall_at_k(&[1, 0, 1, 1], 4, 3) - 0.5).abs() < EPSILON);
    }

    #[test]
    fn recall_and_ap_are_zero_without_relevant_items() {
        assert_eq!(recall_at_k(&[1, 1, 1], 0, 30), 0.0);
        assert_eq!(average_precision(&[1, 1, 1], 0, 20), 0.0);
    }

    #[test]
    fn average_precision_accumulates_precision_at_hits() {
        // hits at 1 and 3: (1/1 + 2/3) / 2
        let expected = (1.0 + 2.0 / 3.0) / 2.0;
        assert!((average_precision(&[1, 0, 1, 0], 2, 20) - expected).abs() < EPSILON);
    }

    #[test]
    fn average_precision_ignores_hits_beyond_cutoff() {
        // the hit at position 3 falls outside k=2 but still counts toward the denominator
        assert!((average_precision(&[1, 0, 1], 2, 2) - 0.5).abs() < EPSILON);
    }

    #[test]
    fn binary_relevance_thresholds_at_one() {
        assert_eq!(binary_relevance(&[0, 1, 2, 0, 3]), vec![0, 1, 1, 0, 1]);
    }
}
