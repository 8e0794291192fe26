// Corpus character statistics.
//
// Counts occurrences of a caller-given character set across record files.
// Used to size the normalizer's punctuation folding table (how often each
// quote and dash variant actually occurs in the crawl).

use std::collections::BTreeMap;
use std::path::PathBuf;

use rayon::prelude::*;
use tracing::info;

use crate::error::Result;
use crate::records::{self, SectionRecord};
use crate::workers;

/// Count occurrences of each of `chars` across the sections of the given
/// record files.
pub fn char_frequencies(
    inpaths: &[PathBuf],
    chars: &[char],
    processes: usize,
) -> Result<BTreeMap<char, u64>> {
    let pool = workers::pool(processes)?;
    let mut totals: BTreeMap<char, u64> = chars.iter().map(|&c| (c, 0)).collect();

    for inpath in inpaths {
        info!("analyzing {}", inpath.display());
        let records: Vec<SectionRecord> = records::read_records(inpath)?;

        let counts: BTreeMap<char, u64> = pool.install(|| {
            records
                .par_iter()
                .map(|record| {
                    let mut counts: BTreeMap<char, u64> =
                        chars.iter().map(|&c| (c, 0)).collect();
                    for section in &record.text_list {
                        for c in section.chars() {
                            if let Some(count) = counts.get_mut(&c) {
                                *count += 1;
                            }
                        }
                    }
                    counts
                })
                .reduce(
                    || chars.iter().map(|&c| (c, 0)).collect(),
                    |mut acc, counts| {
                        for (c, n) in counts {
                            *acc.entry(c).or_insert(0) += n;
                        }
                        acc
                    },
                )
        });

        for (c, n) in counts {
            *totals.entry(c).or_insert(0) += n;
        }
    }

    Ok(totals)
}
