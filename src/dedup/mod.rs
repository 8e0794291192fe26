// Near-duplicate paragraph detection.
//
// MinHash signatures over character n-grams, banded LSH for candidate
// generation, signature agreement for verification. Duplicates are rewritten
// to an in-band sentinel; records are never reordered, inserted, or dropped.

mod lsh;
mod minhash;

pub use lsh::{LshIndex, ParagraphId};
pub use minhash::{signature_similarity, MinHasher};

use std::collections::HashSet;
use std::path::Path;

use rayon::prelude::*;
use tracing::info;

use crate::error::Result;
use crate::records::{self, SectionRecord};
use crate::workers;

/// In-band marker written over removed paragraphs. Downstream stages skip
/// it when told to omit duplicates.
pub const DUPLICATE_SENTINEL: &str = "<DUPLICATE_REMOVED>";

/// Deduplication parameters.
#[derive(Debug, Clone)]
pub struct DedupParams {
    pub gram_len: usize,
    pub signature_len: usize,
    pub band_size: usize,
    pub similarity_threshold: f64,
}

impl Default for DedupParams {
    fn default() -> Self {
        Self {
            gram_len: 5,
            signature_len: 128,
            band_size: 16,
            similarity_threshold: 0.9,
        }
    }
}

/// Marks near-duplicate paragraphs across a record file.
pub struct Deduplicator {
    params: DedupParams,
    hasher: MinHasher,
}

impl Deduplicator {
    pub fn new(params: DedupParams) -> Result<Self> {
        if params.gram_len == 0 || params.signature_len == 0 {
            return Err(crate::error::PipelineError::Config(
                "gram_len and signature_len must be positive".to_string(),
            ));
        }
        // Validate the banding up front; the index is rebuilt per file.
        LshIndex::new(params.signature_len, params.band_size)?;
        let hasher = MinHasher::new(params.gram_len, params.signature_len);
        Ok(Self { params, hasher })
    }

    /// Deduplicate `inpath` into `outpath`.
    pub fn deduplicate_file(
        &self,
        inpath: &Path,
        outpath: &Path,
        processes: usize,
    ) -> Result<()> {
        info!("started deduplicating {}", inpath.display());
        let mut records: Vec<SectionRecord> = records::read_records(inpath)?;

        // Per-paragraph signatures; the only parallel step.
        let pool = workers::pool(processes)?;
        let signatures: Vec<Vec<Vec<u32>>> = pool.install(|| {
            records
                .par_iter()
                .map(|record| {
                    record
                        .text_list
                        .iter()
                        .map(|text| self.hasher.signature(text))
                        .collect::<Result<Vec<_>>>()
                })
                .collect::<Result<_>>()
        })?;

        let mut index = LshIndex::new(self.params.signature_len, self.params.band_size)?;
        for (doc, sigs) in signatures.iter().enumerate() {
            for (idx, sig) in sigs.iter().enumerate() {
                index.insert((doc, idx), sig);
            }
        }

        let removals = self.select_removals(&signatures, index.candidate_pairs());
        info!("marking {} duplicate paragraphs", removals.len());

        for &(doc, idx) in &removals {
            records[doc].text_list[idx] = DUPLICATE_SENTINEL.to_string();
        }
        records::write_records(outpath, &records)?;
        info!("finished deduplicating {}", inpath.display());
        Ok(())
    }

    /// Verify candidate pairs in first-seen order and mark the later
    /// paragraph of each confirmed pair. A pair with an already-marked
    /// endpoint is skipped, so one survivor is kept per duplicate class.
    fn select_removals(
        &self,
        signatures: &[Vec<Vec<u32>>],
        pairs: Vec<(ParagraphId, ParagraphId)>,
    ) -> HashSet<ParagraphId> {
        let mut marked = HashSet::new();
        for (first, later) in pairs {
            if marked.contains(&first) || marked.contains(&later) {
                continue;
            }
            let sim = signature_similarity(
                &signatures[first.0][first.1],
                &signatures[later.0][later.1],
            );
            if sim > self.params.similarity_threshold {
                marked.insert(later);
            }
        }
        marked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PARAGRAPH: &str =
        "An identical paragraph long enough to form plenty of five-grams.";

    fn run_dedup(records: &[SectionRecord]) -> Vec<SectionRecord> {
        let dir = tempfile::tempdir().unwrap();
        let inpath = dir.path().join("in.jsonl");
        let outpath = dir.path().join("out.jsonl");
        records::write_records(&inpath, records).unwrap();

        let dedup = Deduplicator::new(DedupParams::default()).unwrap();
        dedup.deduplicate_file(&inpath, &outpath, 2).unwrap();
        records::read_records(&outpath).unwrap()
    }

    #[test]
    fn test_identical_paragraphs_keep_first_remove_later() {
        let out = run_dedup(&[
            SectionRecord {
                url: "A".into(),
                text_list: vec![PARAGRAPH.into()],
            },
            SectionRecord {
                url: "B".into(),
                text_list: vec![
                    "Something else entirely, also long enough to hash.".into(),
                    "More unrelated filler text for the middle slots here.".into(),
                    "Yet another distinct paragraph to pad the indices out.".into(),
                    PARAGRAPH.into(),
                ],
            },
        ]);

        assert_eq!(out[0].text_list[0], PARAGRAPH);
        assert_eq!(out[1].text_list[3], DUPLICATE_SENTINEL);
        // Distinct paragraphs pass through verbatim.
        assert_eq!(out[1].text_list.len(), 4);
        assert_ne!(out[1].text_list[0], DUPLICATE_SENTINEL);
    }

    #[test]
    fn test_one_survivor_per_duplicate_class() {
        let out = run_dedup(&[
            SectionRecord {
                url: "A".into(),
                text_list: vec![PARAGRAPH.into(), PARAGRAPH.into(), PARAGRAPH.into()],
            },
        ]);

        let survivors: Vec<_> = out[0]
            .text_list
            .iter()
            .filter(|t| t.as_str() != DUPLICATE_SENTINEL)
            .collect();
        assert_eq!(survivors.len(), 1);
        // The first occurrence is the survivor.
        assert_eq!(out[0].text_list[0], PARAGRAPH);
    }

    #[test]
    fn test_distinct_records_untouched() {
        let out = run_dedup(&[
            SectionRecord {
                url: "A".into(),
                text_list: vec!["First unique paragraph with enough length.".into()],
            },
            SectionRecord {
                url: "B".into(),
                text_list: vec!["Second unique paragraph, nothing like the first.".into()],
            },
        ]);

        assert!(out
            .iter()
            .all(|r| r.text_list.iter().all(|t| t != DUPLICATE_SENTINEL)));
    }

    #[test]
    fn test_rerun_is_stable() {
        // Dropping marked paragraphs and re-running changes nothing.
        let first_pass = run_dedup(&[
            SectionRecord {
                url: "A".into(),
                text_list: vec![PARAGRAPH.into()],
            },
            SectionRecord {
                url: "B".into(),
                text_list: vec![PARAGRAPH.into()],
            },
        ]);

        let stripped: Vec<SectionRecord> = first_pass
            .iter()
            .map(|r| SectionRecord {
                url: r.url.clone(),
                text_list: r
                    .text_list
                    .iter()
                    .filter(|t| t.as_str() != DUPLICATE_SENTINEL)
                    .cloned()
                    .collect(),
            })
            .collect();

        let second_pass = run_dedup(&stripped);
        let remaining: Vec<_> = second_pass
            .iter()
            .flat_map(|r| r.text_list.iter())
            .filter(|t| t.as_str() != DUPLICATE_SENTINEL)
            .collect();
        assert_eq!(remaining.len(), 1);
    }

    #[test]
    fn test_short_paragraph_fails_the_stage() {
        let dir = tempfile::tempdir().unwrap();
        let inpath = dir.path().join("in.jsonl");
        let outpath = dir.path().join("out.jsonl");
        records::write_records(
            &inpath,
            &[SectionRecord {
                url: "A".into(),
                text_list: vec!["tiny".into()],
            }],
        )
        .unwrap();

        let dedup = Deduplicator::new(DedupParams::default()).unwrap();
        assert!(dedup.deduplicate_file(&inpath, &outpath, 1).is_err());
    }

    #[test]
    fn test_invalid_banding_rejected() {
        let params = DedupParams {
            band_size: 24,
            ..DedupParams::default()
        };
        assert!(Deduplicator::new(params).is_err());
    }
}
