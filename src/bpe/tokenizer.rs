// Greedy BPE tokenization.
//
// Longest-prefix match against the vocabulary: the candidate token grows one
// character at a time while the prefix stays in the vocabulary, then the
// last in-vocabulary prefix is emitted. Concatenating the output tokens
// reproduces the input exactly.

use std::path::Path;

use rayon::prelude::*;
use tracing::info;

use crate::error::Result;
use crate::records::{self, SentenceRecord, TokenRecord};
use crate::workers;

use super::Vocabulary;

/// Tokenizes text against a fixed vocabulary.
pub struct Tokenizer {
    vocab: Vocabulary,
}

impl Tokenizer {
    pub fn new(vocab: Vocabulary) -> Self {
        Self { vocab }
    }

    /// Load the vocabulary from a JSON array file.
    pub fn from_file(vocab_path: &Path) -> Result<Self> {
        Ok(Self::new(Vocabulary::load(vocab_path)?))
    }

    /// Split `text` into vocabulary tokens. A character the vocabulary has
    /// never seen becomes a single-character token, so the scan always
    /// advances and the concatenation of the output equals the input.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut tokenized = Vec::new();

        let mut start = 0;
        while start < chars.len() {
            let mut token = String::new();
            let mut candidate = String::new();
            let mut end = start;
            while end < chars.len() {
                candidate.push(chars[end]);
                if self.vocab.contains(&candidate) {
                    token = candidate.clone();
                    end += 1;
                } else {
                    break;
                }
            }

            if token.is_empty() {
                token.push(chars[start]);
                end = start + 1;
            }

            tokenized.push(token);
            start = end;
        }

        tokenized
    }
}

/// Tokenize every sentence of every record.
pub fn tokenize_file(
    inpath: &Path,
    outpath: &Path,
    vocab_path: &Path,
    processes: usize,
) -> Result<()> {
    info!("started tokenizing {}", inpath.display());
    let tokenizer = Tokenizer::from_file(vocab_path)?;
    let records: Vec<SentenceRecord> = records::read_records(inpath)?;
    let total = records.len();
    let pool = workers::pool(processes)?;

    let tokenized: Vec<TokenRecord> = pool.install(|| {
        records
            .into_par_iter()
            .enumerate()
            .map(|(page_num, record)| {
                info!("tokenizing page {} / {}: {}", page_num + 1, total, record.url);
                let text_list = record
                    .text_list
                    .iter()
                    .map(|section| {
                        section
                            .iter()
                            .map(|sentence| tokenizer.tokenize(sentence))
                            .collect()
                    })
                    .collect();
                TokenRecord {
                    url: record.url,
                    text_list,
                }
            })
            .collect()
    });

    records::write_records(outpath, &tokenized)?;
    info!("finished tokenizing {}", inpath.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokenizer(tokens: &[&str]) -> Tokenizer {
        Tokenizer::new(tokens.iter().map(|t| t.to_string()).collect())
    }

    #[test]
    fn test_greedy_longest_prefix() {
        let tok = tokenizer(&["a", "b", "ab", "c"]);
        assert_eq!(tok.tokenize("abc"), vec!["ab", "c"]);
    }

    #[test]
    fn test_prefix_walk_stops_at_gap() {
        // "abc" is in the vocabulary but "ab" is not, so the walk stops
        // after "a" and never reaches "abc".
        let tok = tokenizer(&["a", "b", "c", "abc"]);
        assert_eq!(tok.tokenize("abc"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_round_trip() {
        let tok = tokenizer(&["a", "b", "c", " ", "ab", "bc"]);
        for text in ["abc abc", "a b c", "ababab", ""] {
            assert_eq!(tok.tokenize(text).concat(), text);
        }
    }

    #[test]
    fn test_unknown_char_becomes_single_token() {
        let tok = tokenizer(&["a", "b"]);
        assert_eq!(tok.tokenize("axb"), vec!["a", "x", "b"]);
        assert_eq!(tok.tokenize("axb").concat(), "axb");
    }

    #[test]
    fn test_empty_input() {
        let tok = tokenizer(&["a"]);
        assert!(tok.tokenize("").is_empty());
    }

    #[test]
    fn test_tokenize_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let inpath = dir.path().join("in.jsonl");
        let outpath = dir.path().join("out.jsonl");
        let vocab_path = dir.path().join("vocab.json");

        let vocab: Vocabulary =
            ["a", "b", " ", "ab"].iter().map(|s| s.to_string()).collect();
        vocab.save(&vocab_path).unwrap();
        records::write_records(
            &inpath,
            &[SentenceRecord {
                url: "u".into(),
                text_list: vec![vec!["ab a".into()]],
            }],
        )
        .unwrap();

        tokenize_file(&inpath, &outpath, &vocab_path, 1).unwrap();

        let out: Vec<TokenRecord> = records::read_records(&outpath).unwrap();
        assert_eq!(out[0].text_list[0][0], vec!["ab", " ", "a"]);
    }
}
