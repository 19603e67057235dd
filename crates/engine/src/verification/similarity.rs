//! Character-level string similarity used by the consistency check.

use std::collections::{HashMap, HashSet};

use paperverify_common::config::SimilarityMetric;

/// Sequences at least this long get their most frequent characters treated
/// as junk when seeding matches.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Case-insensitive similarity in [0, 1] under the chosen metric.
pub fn similarity(metric: SimilarityMetric, a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    match metric {
        SimilarityMetric::MatchingBlocks => matching_blocks_ratio(&a, &b),
        SimilarityMetric::Levenshtein => strsim::normalized_levenshtein(&a, &b),
    }
}

/// Ratcliff/Obershelp ratio: `2 * M / T`, where `M` is the total size of the
/// matching blocks found by recursively taking the longest common substring,
/// and `T` the combined length. Two empty strings are identical.
pub fn matching_blocks_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matcher = BlockMatcher::new(&a, &b);
    2.0 * matcher.matched_len() as f64 / total as f64
}

struct BlockMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    /// Positions of each non-popular character of `b`, ascending.
    b2j: HashMap<char, Vec<usize>>,
}

impl<'a> BlockMatcher<'a> {
    fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, ch) in b.iter().enumerate() {
            b2j.entry(*ch).or_default().push(j);
        }

        if b.len() >= AUTOJUNK_MIN_LEN {
            let limit = b.len() / 100 + 1;
            let popular: HashSet<char> = b2j
                .iter()
                .filter(|(_, idxs)| idxs.len() > limit)
                .map(|(ch, _)| *ch)
                .collect();
            b2j.retain(|ch, _| !popular.contains(ch));
        }

        Self { a, b, b2j }
    }

    /// Longest matching block in `a[alo..ahi]` x `b[blo..bhi]` as `(i, j, size)`.
    /// Earliest in `a`, then earliest in `b`, wins ties.
    fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0usize);
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next.insert(j, k);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            j2len = next;
        }

        // Popular characters never seed a match but may extend one.
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && self.a[best_i + best_size] == self.b[best_j + best_size]
        {
            best_size += 1;
        }

        (best_i, best_j, best_size)
    }

    fn matched_len(&self) -> usize {
        let mut total = 0;
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            total += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }

        total
    }
}

/// All pairwise similarities in `(0,1), (0,2), .., (1,2), ..` order.
pub fn pairwise(metric: SimilarityMetric, texts: &[&str]) -> Vec<f64> {
    let mut out = Vec::new();
    for i in 0..texts.len() {
        for j in (i + 1)..texts.len() {
            out.push(similarity(metric, texts[i], texts[j]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_ratio_known_values() {
        assert!(close(matching_blocks_ratio("abcd", "bcde"), 0.75));
        assert!(close(matching_blocks_ratio("", ""), 1.0));
        assert!(close(matching_blocks_ratio("abc", ""), 0.0));
        assert!(close(matching_blocks_ratio("abc", "abc"), 1.0));
        assert!(close(matching_blocks_ratio("abc", "xyz"), 0.0));
    }

    #[test]
    fn test_ratio_recurses_on_both_sides() {
        // "ab" + "d" matched around the mismatching middle.
        assert!(close(matching_blocks_ratio("abxd", "abyd"), 0.75));
        // Longest block "qabxcd"/"abycdf": "ab" then "cd" -> 2*4/12.
        assert!(close(matching_blocks_ratio("qabxcd", "abycdf"), 2.0 * 4.0 / 12.0));
    }

    #[test]
    fn test_similarity_is_case_insensitive() {
        let s = similarity(
            SimilarityMetric::MatchingBlocks,
            "The Model Uses ADAM",
            "the model uses adam",
        );
        assert!(close(s, 1.0));
    }

    #[test]
    fn test_levenshtein_metric() {
        let s = similarity(SimilarityMetric::Levenshtein, "kitten", "sitting");
        assert!(close(s, 1.0 - 3.0 / 7.0));
        assert!(close(similarity(SimilarityMetric::Levenshtein, "", ""), 1.0));
    }

    #[test]
    fn test_paraphrase_scores_between_bounds() {
        let a = "The transformer uses twelve attention layers.";
        let b = "The transformer uses ten attention layers.";
        let s = matching_blocks_ratio(a, b);
        assert!(s > 0.8 && s < 1.0, "ratio was {}", s);
    }

    #[test]
    fn test_long_identical_texts_match_despite_autojunk() {
        let a = "the model was trained on wikipedia for three days. ".repeat(6);
        assert!(a.chars().count() >= AUTOJUNK_MIN_LEN);
        assert!(close(matching_blocks_ratio(&a, &a), 1.0));
    }

    #[test]
    fn test_pairwise_order() {
        let sims = pairwise(SimilarityMetric::MatchingBlocks, &["abcd", "bcde", "abcd"]);
        assert_eq!(sims.len(), 3);
        assert!(close(sims[0], 0.75));
        assert!(close(sims[1], 1.0));
        assert!(close(sims[2], 0.75));
    }
}
