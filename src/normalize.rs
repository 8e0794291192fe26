// Text normalization.
//
// Brings every extracted section into a canonical form before deduplication:
// Unicode NFC, whitespace canonicalization, quote/dash folding, and a length
// filter. Each handler is idempotent, so the whole pass is idempotent.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use rayon::prelude::*;
use regex::Regex;
use tracing::info;
use unicode_normalization::UnicodeNormalization;

use crate::error::Result;
use crate::records::{self, SectionRecord};
use crate::workers;

/// Normalizes section text. Cheap to construct; all patterns are static.
#[derive(Debug, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize one section string. Handlers run in a fixed order.
    pub fn normalize(&self, text: &str) -> String {
        let text = unicode_handler(text);
        let text = whitespace_handler(&text);
        punctuation_handler(&text)
    }
}

/// Unicode NFC normalization form.
fn unicode_handler(text: &str) -> String {
    text.nfc().collect()
}

/// Canonical whitespace: LF line endings only, no control characters, no
/// exotic space characters, single interior spaces, at most two newlines
/// in a row. Leading spaces on a line are kept (list indentation).
fn whitespace_handler(text: &str) -> String {
    static CONTROL: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[\x00-\x08\x0B-\x1F\x7F]").unwrap());
    static SPACES: LazyLock<Regex> =
        LazyLock::new(|| Regex::new("[\u{00A0}\u{2002}\u{2003}\u{2009}\u{200A}\u{3000}\t]").unwrap());
    // A space run is interior when it follows a non-space, non-newline
    // character; runs at the start of a line are indentation.
    static INTERIOR_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([^ \n]) {2,}").unwrap());
    static NEWLINE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = CONTROL.replace_all(&text, "");
    let text = SPACES.replace_all(&text, " ");
    let text = text.replace('\u{200B}', "");
    let text = INTERIOR_RUN.replace_all(&text, "$1 ");
    NEWLINE_RUN.replace_all(&text, "\n\n").into_owned()
}

/// Fold typographic quotes, primes, and dashes to their ASCII equivalents.
///
/// The table covers every variant that occurs more than a handful of times
/// in the crawled corpus.
fn punctuation_handler(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => '"',
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => '\'',
            '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
            c => c,
        })
        .collect()
}

/// Normalize record files, dropping sections shorter than `len_cutoff` chars.
///
/// The cutoff exists so every surviving section is long enough to n-gram in
/// the dedup stage.
pub fn normalize_files(
    inpaths: &[PathBuf],
    outpath: &Path,
    len_cutoff: usize,
    processes: usize,
) -> Result<()> {
    let normalizer = Normalizer::new();
    let pool = workers::pool(processes)?;

    let mut output = Vec::new();
    for inpath in inpaths {
        info!("started normalizing {}", inpath.display());
        let records: Vec<SectionRecord> = records::read_records(inpath)?;
        let total = records.len();

        let mut normalized: Vec<SectionRecord> = pool.install(|| {
            records
                .into_par_iter()
                .enumerate()
                .map(|(page_num, record)| {
                    info!("normalizing page {} / {} : {}", page_num + 1, total, record.url);
                    let text_list = record
                        .text_list
                        .iter()
                        .map(|text| normalizer.normalize(text))
                        .filter(|text| text.chars().count() >= len_cutoff)
                        .collect();
                    SectionRecord {
                        url: record.url,
                        text_list,
                    }
                })
                .collect()
        });
        output.append(&mut normalized);
        info!("finished normalizing {}", inpath.display());
    }

    records::write_records(outpath, &output)
}
