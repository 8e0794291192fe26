// Byte-pair-encoding vocabulary and tokenizer.
//
// Two halves: induction (vocab.rs) grows a vocabulary by iteratively merging
// the most frequent adjacent token pair across the word frequency table, and
// tokenization (tokenizer.rs) greedily matches vocabulary entries against
// input text. The vocabulary file is the only coupling between them.

mod tokenizer;
mod vocab;

pub use tokenizer::{tokenize_file, Tokenizer};
pub use vocab::{build_vocab_file, VocabBuilder};

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::freqdict::FreqDict;

/// An unordered set of token strings.
///
/// Always contains every single character observed in the word frequency
/// dictionary plus the literal space; induction only ever adds tokens.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    tokens: HashSet<String>,
}

impl Vocabulary {
    /// Seed a vocabulary with the single characters of every word in the
    /// frequency dictionary, plus the literal space.
    pub fn from_freq_dict(freq_dict: &FreqDict) -> Self {
        let mut tokens: HashSet<String> = freq_dict
            .keys()
            .flat_map(|word| word.chars())
            .map(String::from)
            .collect();
        tokens.insert(" ".to_string());
        Self { tokens }
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }

    pub fn insert(&mut self, token: String) -> bool {
        self.tokens.insert(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Load from a JSON array of strings.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let tokens: Vec<String> = serde_json::from_str(&raw)?;
        Ok(Self {
            tokens: tokens.into_iter().collect(),
        })
    }

    /// Write as a JSON array of strings, sorted for reproducible output.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut sorted: Vec<&str> = self.tokens.iter().map(String::as_str).collect();
        sorted.sort_unstable();

        let tmp = path.with_extension("tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer(&mut writer, &sorted)?;
            writer.flush()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

impl FromIterator<String> for Vocabulary {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_seed_vocab_has_chars_and_space() {
        let mut freq_dict = FreqDict::new();
        freq_dict.insert("ab".to_string(), 5);
        freq_dict.insert("ac".to_string(), 3);

        let vocab = Vocabulary::from_freq_dict(&freq_dict);
        assert_eq!(vocab.len(), 4); // a, b, c, " "
        assert!(vocab.contains("a"));
        assert!(vocab.contains(" "));
        assert!(!vocab.contains("ab"));
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.json");

        let vocab: Vocabulary = ["a", "b", "ab"].iter().map(|s| s.to_string()).collect();
        vocab.save(&path).unwrap();

        let loaded = Vocabulary::load(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert!(loaded.contains("ab"));
    }

    #[test]
    fn test_saved_file_is_sorted_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.json");

        let vocab: Vocabulary = ["b", "a"].iter().map(|s| s.to_string()).collect();
        vocab.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "[\"a\",\"b\"]");
    }
}
