// Banded locality-sensitive hashing over MinHash signatures.
//
// Each signature is cut into B contiguous bands of R positions; each band is
// hashed to a bucket key, and paragraphs sharing any bucket become candidate
// pairs. With R=16, B=8 the collision probability follows 1 - (1 - s^16)^8:
// near-certain above s ≈ 0.8, negligible for random pairs.

use std::collections::{BTreeSet, HashMap};

use crate::error::{PipelineError, Result};

/// Identifies one paragraph: (record position in the file, section index).
/// Tuple order doubles as first-seen order.
pub type ParagraphId = (usize, usize);

/// Ordered band index: bucket members keep insertion order, so candidate
/// pairs come out in scan order and the keep-first rule is deterministic.
pub struct LshIndex {
    band_size: usize,
    bands: Vec<HashMap<u32, Vec<ParagraphId>>>,
    seed: u32,
}

impl LshIndex {
    /// `signature_len % band_size == 0` is a precondition.
    pub fn new(signature_len: usize, band_size: usize) -> Result<Self> {
        if band_size == 0 || signature_len % band_size != 0 {
            return Err(PipelineError::Config(format!(
                "band_size ({band_size}) does not divide signature_len ({signature_len})"
            )));
        }
        let n_bands = signature_len / band_size;
        Ok(Self {
            band_size,
            bands: vec![HashMap::new(); n_bands],
            // Seeds 0..S are taken by the signature hashes; S is free.
            seed: signature_len as u32,
        })
    }

    pub fn insert(&mut self, id: ParagraphId, signature: &[u32]) {
        for (b, buckets) in self.bands.iter_mut().enumerate() {
            let start = b * self.band_size;
            let band = &signature[start..start + self.band_size];
            let key = mur3::murmurhash3_x86_32(format!("{band:?}").as_bytes(), self.seed);
            buckets.entry(key).or_default().push(id);
        }
    }

    /// Candidate pairs from every bucket of size ≥ 2, deduplicated across
    /// bands and sorted by (earlier, later) id.
    pub fn candidate_pairs(&self) -> Vec<(ParagraphId, ParagraphId)> {
        let mut pairs = BTreeSet::new();
        for buckets in &self.bands {
            for members in buckets.values() {
                if members.len() < 2 {
                    continue;
                }
                for i in 0..members.len() {
                    for j in (i + 1)..members.len() {
                        let (a, b) = (members[i], members[j]);
                        let pair = if a <= b { (a, b) } else { (b, a) };
                        pairs.insert(pair);
                    }
                }
            }
        }
        pairs.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_band_size_must_divide_signature_len() {
        assert!(LshIndex::new(128, 16).is_ok());
        assert!(LshIndex::new(128, 24).is_err());
        assert!(LshIndex::new(128, 0).is_err());
    }

    #[test]
    fn test_identical_signatures_become_a_pair() {
        let mut index = LshIndex::new(8, 4).unwrap();
        let sig = vec![1, 2, 3, 4, 5, 6, 7, 8];
        index.insert((0, 0), &sig);
        index.insert((3, 1), &sig);

        let pairs = index.candidate_pairs();
        assert_eq!(pairs, vec![((0, 0), (3, 1))]);
    }

    #[test]
    fn test_partial_band_match_still_pairs() {
        let mut index = LshIndex::new(8, 4).unwrap();
        // First band equal, second band different.
        index.insert((0, 0), &[1, 2, 3, 4, 5, 6, 7, 8]);
        index.insert((1, 0), &[1, 2, 3, 4, 9, 9, 9, 9]);

        assert_eq!(index.candidate_pairs().len(), 1);
    }

    #[test]
    fn test_disjoint_signatures_do_not_pair() {
        let mut index = LshIndex::new(8, 4).unwrap();
        index.insert((0, 0), &[1, 2, 3, 4, 5, 6, 7, 8]);
        index.insert((1, 0), &[9, 10, 11, 12, 13, 14, 15, 16]);

        assert!(index.candidate_pairs().is_empty());
    }

    #[test]
    fn test_pairs_are_deduplicated_across_bands() {
        // Identical signatures collide in both bands; the pair appears once.
        let mut index = LshIndex::new(8, 4).unwrap();
        let sig = vec![1, 2, 3, 4, 5, 6, 7, 8];
        index.insert((0, 0), &sig);
        index.insert((1, 0), &sig);

        assert_eq!(index.candidate_pairs().len(), 1);
    }

    #[test]
    fn test_pairs_sorted_by_first_seen() {
        let mut index = LshIndex::new(4, 4).unwrap();
        let sig = vec![7, 7, 7, 7];
        index.insert((0, 0), &sig);
        index.insert((0, 2), &sig);
        index.insert((1, 1), &sig);

        let pairs = index.candidate_pairs();
        assert_eq!(
            pairs,
            vec![
                ((0, 0), (0, 2)),
                ((0, 0), (1, 1)),
                ((0, 2), (1, 1)),
            ]
        );
    }
}
