// Word frequency dictionary.
//
// Maps the segmented corpus to a `word → count` table, the input for BPE
// vocabulary induction. A word is a maximal run of non-space characters.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use rayon::prelude::*;
use tracing::info;

use crate::error::Result;
use crate::records::{self, SentenceRecord};
use crate::workers;

/// Word frequency table.
pub type FreqDict = HashMap<String, u64>;

/// Count the words of one sentence.
pub fn count_words(sentence: &str) -> FreqDict {
    let mut counts = FreqDict::new();
    for word in sentence.split(' ').filter(|w| !w.is_empty()) {
        *counts.entry(word.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Merge `other` into `into`, adding counts.
pub fn merge_counts(into: &mut FreqDict, other: FreqDict) {
    for (word, count) in other {
        *into.entry(word).or_insert(0) += count;
    }
}

/// Build the word frequency dictionary for a segmented record file and write
/// it as a JSON object (keys sorted for reproducible output).
pub fn freq_dict_file(corpus_path: &Path, freq_dict_path: &Path, processes: usize) -> Result<()> {
    info!("started building frequency dict from {}", corpus_path.display());
    let records: Vec<SentenceRecord> = records::read_records(corpus_path)?;
    let total = records.len();
    let pool = workers::pool(processes)?;

    let merged: FreqDict = pool.install(|| {
        records
            .into_par_iter()
            .enumerate()
            .map(|(page_num, record)| {
                info!(
                    "counting words on page {} / {}: {}",
                    page_num + 1,
                    total,
                    record.url
                );
                let mut counts = FreqDict::new();
                for section in &record.text_list {
                    for sentence in section {
                        merge_counts(&mut counts, count_words(sentence));
                    }
                }
                counts
            })
            .reduce(FreqDict::new, |mut acc, counts| {
                merge_counts(&mut acc, counts);
                acc
            })
    });

    let sorted: BTreeMap<&str, u64> = merged.iter().map(|(w, c)| (w.as_str(), *c)).collect();
    let tmp = freq_dict_path.with_extension("tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(&mut writer, &sorted)?;
        writer.flush()?;
    }
    fs::rename(&tmp, freq_dict_path)?;

    info!("finished building frequency dict from {}", corpus_path.display());
    Ok(())
}

/// Load a frequency dictionary written by [`freq_dict_file`].
pub fn load_freq_dict(path: &Path) -> Result<FreqDict> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
