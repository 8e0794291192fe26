// Sentence segmentation.
//
// Good sentence segmentation needs a pile of heuristics (abbreviations,
// initials, decimal points), so the splitting itself is delegated to the
// Unicode sentence-boundary rules from unicode-segmentation. This module
// adapts that contract — string in, ordered sentences out — to the record
// pipeline and drops paragraphs marked as duplicates.

use std::path::Path;

use rayon::prelude::*;
use tracing::info;
use unicode_segmentation::UnicodeSegmentation;

use crate::dedup::DUPLICATE_SENTINEL;
use crate::error::Result;
use crate::records::{self, SectionRecord, SentenceRecord};
use crate::workers;

/// A sentence segmenter: string → ordered list of sentence strings.
pub trait SentenceSegmenter {
    fn segment(&self, text: &str) -> Vec<String>;
}

/// Segmenter backed by the UAX #29 sentence boundary rules.
#[derive(Debug, Default)]
pub struct UnicodeRules;

impl SentenceSegmenter for UnicodeRules {
    fn segment(&self, text: &str) -> Vec<String> {
        text.split_sentence_bounds()
            .map(|sent| sent.trim_end().to_string())
            .filter(|sent| !sent.is_empty())
            .collect()
    }
}

/// Segment every section of every record into sentences.
///
/// When `omit_duplicates` is set, sections equal to the duplicate sentinel
/// are dropped rather than segmented.
pub fn segment_file(
    inpath: &Path,
    outpath: &Path,
    processes: usize,
    omit_duplicates: bool,
) -> Result<()> {
    info!("started segmenting {}", inpath.display());
    let records: Vec<SectionRecord> = records::read_records(inpath)?;
    let total = records.len();
    let pool = workers::pool(processes)?;

    let segmented: Vec<SentenceRecord> = pool.install(|| {
        records
            .into_par_iter()
            .enumerate()
            .map(|(page_num, record)| {
                info!("segmenting page {} / {}: {}", page_num + 1, total, record.url);
                let segmenter = UnicodeRules;
                let text_list = record
                    .text_list
                    .iter()
                    .filter(|text| !(omit_duplicates && text.as_str() == DUPLICATE_SENTINEL))
                    .map(|text| segmenter.segment(text))
                    .collect();
                SentenceRecord {
                    url: record.url,
                    text_list,
                }
            })
            .collect()
    });

    records::write_records(outpath, &segmented)?;
    info!("finished segmenting {}", inpath.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_segment_two_sentences() {
        let sents = UnicodeRules.segment("Hello there. General Kenobi!");
        assert_eq!(sents, vec!["Hello there.", "General Kenobi!"]);
    }

    #[test]
    fn test_segment_empty() {
        assert!(UnicodeRules.segment("").is_empty());
    }

    #[test]
    fn test_segment_order_preserved() {
        let sents = UnicodeRules.segment("One. Two. Three.");
        assert_eq!(sents, vec!["One.", "Two.", "Three."]);
    }

    #[test]
    fn test_duplicates_dropped_in_driver() {
        let dir = tempfile::tempdir().unwrap();
        let inpath = dir.path().join("in.jsonl");
        let outpath = dir.path().join("out.jsonl");
        records::write_records(
            &inpath,
            &[SectionRecord {
                url: "u".into(),
                text_list: vec!["Keep me. Really.".into(), DUPLICATE_SENTINEL.into()],
            }],
        )
        .unwrap();

        segment_file(&inpath, &outpath, 2, true).unwrap();

        let out: Vec<SentenceRecord> = records::read_records(&outpath).unwrap();
        assert_eq!(out[0].text_list.len(), 1);
        assert_eq!(out[0].text_list[0], vec!["Keep me.", "Really."]);
    }

    #[test]
    fn test_duplicates_kept_when_not_omitting() {
        let dir = tempfile::tempdir().unwrap();
        let inpath = dir.path().join("in.jsonl");
        let outpath = dir.path().join("out.jsonl");
        records::write_records(
            &inpath,
            &[SectionRecord {
                url: "u".into(),
                text_list: vec![DUPLICATE_SENTINEL.into()],
            }],
        )
        .unwrap();

        segment_file(&inpath, &outpath, 1, false).unwrap();

        let out: Vec<SentenceRecord> = records::read_records(&outpath).unwrap();
        assert_eq!(out[0].text_list.len(), 1);
    }
}
