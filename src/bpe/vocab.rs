// BPE vocabulary induction.
//
// Iteratively finds the most frequent pair of adjacent tokens across the
// word frequency table, merges it everywhere, and adds the concatenation to
// the vocabulary, until the target size is reached or no pairs remain.
// Both the pair count and the merge sweep partition cleanly across words,
// so they run on the worker pool.

use std::collections::HashMap;
use std::path::Path;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::freqdict::{self, FreqDict};
use crate::workers;

use super::Vocabulary;

/// One word of the frequency table with its current token split.
#[derive(Debug, Clone)]
struct WordEntry {
    freq: u64,
    tokens: Vec<String>,
}

/// Grows a [`Vocabulary`] by repeated pair merges.
pub struct VocabBuilder {
    words: Vec<WordEntry>,
    vocab: Vocabulary,
}

impl VocabBuilder {
    /// Start from a frequency dictionary: every word split into single
    /// characters, vocabulary seeded with those characters plus the space.
    pub fn new(freq_dict: &FreqDict) -> Self {
        let vocab = Vocabulary::from_freq_dict(freq_dict);

        // Sorted for reproducible chunking; the algorithm itself is
        // order-independent.
        let mut words: Vec<(&String, &u64)> = freq_dict.iter().collect();
        words.sort_unstable_by(|a, b| a.0.cmp(b.0));
        let words = words
            .into_iter()
            .map(|(word, &freq)| WordEntry {
                freq,
                tokens: word.chars().map(String::from).collect(),
            })
            .collect();

        Self { words, vocab }
    }

    /// Grow the vocabulary to `target_size` tokens, or as far as possible.
    /// Returns the achieved size.
    pub fn grow_to(&mut self, target_size: usize) -> Result<usize> {
        if target_size < self.vocab.len() {
            return Err(PipelineError::Config(format!(
                "target vocab size ({target_size}) cannot be less than initial vocab size ({})",
                self.vocab.len()
            )));
        }

        while self.vocab.len() < target_size {
            let Some((left, right)) = self.most_frequent_pair() else {
                warn!(
                    "vocab size reached maximal value of {}, smaller than target {target_size}",
                    self.vocab.len()
                );
                break;
            };
            self.vocab.insert(format!("{left}{right}"));
            self.merge(&left, &right);
        }

        Ok(self.vocab.len())
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn into_vocab(self) -> Vocabulary {
        self.vocab
    }

    /// The most frequent adjacent token pair, weighted by word frequency.
    /// Ties break to the lexicographically smallest (left, right) pair, so
    /// the result does not depend on hash iteration order.
    fn most_frequent_pair(&self) -> Option<(String, String)> {
        let pair_freq: HashMap<(&str, &str), u64> = self
            .words
            .par_iter()
            .fold(HashMap::new, |mut counts, entry| {
                if entry.tokens.len() >= 2 {
                    for pair in entry.tokens.windows(2) {
                        *counts
                            .entry((pair[0].as_str(), pair[1].as_str()))
                            .or_insert(0) += entry.freq;
                    }
                }
                counts
            })
            .reduce(HashMap::new, |mut acc, counts| {
                for (pair, freq) in counts {
                    *acc.entry(pair).or_insert(0) += freq;
                }
                acc
            });

        pair_freq
            .into_iter()
            .max_by(|(pair_a, freq_a), (pair_b, freq_b)| {
                freq_a.cmp(freq_b).then_with(|| pair_b.cmp(pair_a))
            })
            .map(|((left, right), _)| (left.to_string(), right.to_string()))
    }

    /// Replace every adjacent (left, right) occurrence with the
    /// concatenation, scanning each word left to right.
    fn merge(&mut self, left: &str, right: &str) {
        let merged = format!("{left}{right}");
        self.words.par_iter_mut().for_each(|entry| {
            if entry.tokens.len() < 2 {
                return;
            }
            let mut new_tokens = Vec::with_capacity(entry.tokens.len());
            let mut i = 0;
            while i < entry.tokens.len() {
                if i + 1 < entry.tokens.len()
                    && entry.tokens[i] == left
                    && entry.tokens[i + 1] == right
                {
                    new_tokens.push(merged.clone());
                    i += 2;
                } else {
                    new_tokens.push(entry.tokens[i].clone());
                    i += 1;
                }
            }
            entry.tokens = new_tokens;
        });
    }
}

/// Induce a vocabulary of `target_size` tokens from a frequency dictionary
/// file and write it as a JSON array.
pub fn build_vocab_file(
    freq_dict_path: &Path,
    vocab_path: &Path,
    target_size: usize,
    processes: usize,
) -> Result<()> {
    let freq_dict = freqdict::load_freq_dict(freq_dict_path)?;
    let mut builder = VocabBuilder::new(&freq_dict);
    info!(
        "initial vocab size {}, growing to {target_size}",
        builder.vocab().len()
    );

    let pool = workers::pool(processes)?;
    let achieved = pool.install(|| builder.grow_to(target_size))?;
    info!("vocab size {achieved}");

    builder.into_vocab().save(vocab_path)
}
