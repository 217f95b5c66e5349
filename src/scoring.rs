//! Bag-of-words scoring of a transcribed answer against the expected phrase

use std::collections::BTreeMap;

/// Similarity above which an answer counts as correct
pub const DEFAULT_THRESHOLD: f64 = 0.1;

/// Outcome of scoring one answer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    /// Cosine similarity in [0, 1]
    pub similarity: f64,
    /// Whether the similarity cleared the threshold
    pub is_correct: bool,
}

/// Classifies transcripts against expected phrase text
#[derive(Debug, Clone, Copy)]
pub struct SimilarityScorer {
    threshold: f64,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl SimilarityScorer {
    /// Create a scorer with a custom threshold
    #[must_use]
    pub const fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// The decision threshold (strictly greater passes)
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Score `transcript` against `expected`
    #[must_use]
    pub fn score(&self, expected: &str, transcript: &str) -> Verdict {
        let similarity = cosine_similarity(expected, transcript);
        Verdict {
            similarity,
            is_correct: similarity > self.threshold,
        }
    }
}

/// Lower-case and split on whitespace; punctuation stays attached
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

/// Raw token counts
#[must_use]
pub fn term_frequency(tokens: &[String]) -> BTreeMap<&str, f64> {
    let mut tf = BTreeMap::new();
    for token in tokens {
        *tf.entry(token.as_str()).or_insert(0.0) += 1.0;
    }
    tf
}

/// Cosine similarity of the term-frequency vectors of two texts
///
/// Returns 0 when either text has no tokens.
#[must_use]
pub fn cosine_similarity(a: &str, b: &str) -> f64 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    let tf_a = term_frequency(&tokens_a);
    let tf_b = term_frequency(&tokens_b);

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;

    for value in tf_a.values() {
        norm_a += value * value;
    }
    for (token, value) in &tf_b {
        norm_b += value * value;
        if let Some(other) = tf_a.get(token) {
            dot += other * value;
        }
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    // sqrt of the product keeps identical inputs at exactly 1.0
    (dot / (norm_a * norm_b).sqrt()).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_is_one() {
        assert!((cosine_similarity("the cat sat", "the cat sat") - 1.0).abs() < f64::EPSILON);
        assert_eq!(cosine_similarity("go go go now", "go go go now"), 1.0);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(cosine_similarity("Hello World", "hello world"), 1.0);
    }

    #[test]
    fn test_disjoint_is_zero() {
        assert_eq!(cosine_similarity("the cat sat", "completely different"), 0.0);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(cosine_similarity("hello world", ""), 0.0);
        assert_eq!(cosine_similarity("", "hello"), 0.0);
        assert_eq!(cosine_similarity("   ", "  \t "), 0.0);
    }

    #[test]
    fn test_punctuation_is_not_stripped() {
        assert_eq!(cosine_similarity("hello,", "hello"), 0.0);
    }

    #[test]
    fn test_partial_overlap() {
        // a = {the:1, cat:1, sat:1}, b = {the:1, dog:1}
        let s = cosine_similarity("the cat sat", "the dog");
        let expected = 1.0 / (3.0_f64 * 2.0).sqrt();
        assert!((s - expected).abs() < 1e-12);
    }

    #[test]
    fn test_term_frequency_counts() {
        let tokens = tokenize("a b a A");
        let tf = term_frequency(&tokens);
        assert_eq!(tf.get("a"), Some(&3.0));
        assert_eq!(tf.get("b"), Some(&1.0));
    }

    #[test]
    fn test_threshold_boundary_is_incorrect() {
        let scorer = SimilarityScorer::new(0.5);
        // {a:1} vs {a:1, b:1, c:1, d:1} -> 1 / sqrt(4) = 0.5 exactly
        let verdict = scorer.score("a", "a b c d");
        assert_eq!(verdict.similarity, 0.5);
        assert!(!verdict.is_correct);

        let verdict = scorer.score("a b", "a b c");
        assert!(verdict.is_correct);
    }

    #[test]
    fn test_default_threshold() {
        let scorer = SimilarityScorer::default();
        assert_eq!(scorer.threshold(), 0.1);
        assert!(scorer.score("the cat sat", "the cat sat").is_correct);
        assert!(!scorer.score("the cat sat", "completely different").is_correct);
    }

    #[test]
    fn test_low_overlap_fails_default_threshold() {
        // 1 / sqrt(1 * 100) = 0.1, which is not above the threshold
        let scorer = SimilarityScorer::default();
        let answer = std::iter::once("yes".to_string())
            .chain((0..99).map(|i| format!("w{i}")))
            .collect::<Vec<_>>()
            .join(" ");
        let verdict = scorer.score("yes", &answer);
        assert!((verdict.similarity - 0.1).abs() < 1e-12);
        assert!(!verdict.is_correct);
    }
}
