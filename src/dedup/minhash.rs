// MinHash signatures over character n-grams.
//
// The hash family is seeded 32-bit MurmurHash3, pinned (rather than the
// standard library hasher) so signatures are stable across runs and
// platforms. Seed s ∈ [0, S) yields the s-th signature position; two
// paragraphs agree at a position with probability equal to the Jaccard
// similarity of their n-gram sets.

use std::collections::HashSet;

use crate::error::{PipelineError, Result};

/// Computes fixed-length MinHash signatures.
#[derive(Debug, Clone)]
pub struct MinHasher {
    gram_len: usize,
    signature_len: usize,
}

impl MinHasher {
    pub fn new(gram_len: usize, signature_len: usize) -> Self {
        Self {
            gram_len,
            signature_len,
        }
    }

    pub fn signature_len(&self) -> usize {
        self.signature_len
    }

    /// MinHash signature of `text`.
    ///
    /// The text must be at least `gram_len` chars; shorter paragraphs are a
    /// precondition violation (the normalizer's length cutoff filters them
    /// upstream).
    pub fn signature(&self, text: &str) -> Result<Vec<u32>> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() < self.gram_len {
            return Err(PipelineError::ParagraphTooShort {
                len: chars.len(),
                gram_len: self.gram_len,
            });
        }

        let grams: HashSet<String> = chars
            .windows(self.gram_len)
            .map(|window| window.iter().collect())
            .collect();

        let signature = (0..self.signature_len)
            .map(|seed| {
                grams
                    .iter()
                    .map(|gram| mur3::murmurhash3_x86_32(gram.as_bytes(), seed as u32))
                    .fold(u32::MAX, u32::min)
            })
            .collect();

        Ok(signature)
    }
}

/// Fraction of positions where two signatures agree; approximates the
/// Jaccard similarity of the underlying n-gram sets.
pub fn signature_similarity(a: &[u32], b: &[u32]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let matching = a.iter().zip(b).filter(|(x, y)| x == y).count();
    matching as f64 / a.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_signature_shape() {
        let hasher = MinHasher::new(5, 128);
        let sig = hasher.signature("some paragraph of reasonable length").unwrap();
        assert_eq!(sig.len(), 128);
    }

    #[test]
    fn test_signature_deterministic() {
        let hasher = MinHasher::new(5, 64);
        let a = hasher.signature("identical input text").unwrap();
        let b = hasher.signature("identical input text").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_identical_texts_fully_agree() {
        let hasher = MinHasher::new(5, 64);
        let a = hasher.signature("the quick brown fox").unwrap();
        let b = hasher.signature("the quick brown fox").unwrap();
        assert_eq!(signature_similarity(&a, &b), 1.0);
    }

    #[test]
    fn test_unrelated_texts_mostly_disagree() {
        let hasher = MinHasher::new(5, 128);
        let a = hasher.signature("completely different subject matter here").unwrap();
        let b = hasher.signature("zzz qqq xxx www vvv uuu ttt sss rrr").unwrap();
        assert!(signature_similarity(&a, &b) < 0.3);
    }

    #[test]
    fn test_similar_texts_mostly_agree() {
        let hasher = MinHasher::new(5, 128);
        let a = hasher
            .signature("a long shared paragraph about wiki crawling and corpus building")
            .unwrap();
        let b = hasher
            .signature("a long shared paragraph about wiki crawling and corpus building!")
            .unwrap();
        assert!(signature_similarity(&a, &b) > 0.8);
    }

    #[test]
    fn test_too_short_is_an_error() {
        let hasher = MinHasher::new(5, 16);
        assert!(hasher.signature("abcd").is_err());
        assert!(hasher.signature("abcde").is_ok());
    }

    #[test]
    fn test_gram_boundaries_are_chars_not_bytes() {
        // Five chars, more than five bytes.
        let hasher = MinHasher::new(5, 16);
        assert!(hasher.signature("café!").is_ok());
    }
}
