//! Vocabulary construction
//!
//! One counting pass over the corpus produces word frequencies. Rare words
//! and stop-words are pruned, the survivors are sorted by descending count
//! (first-seen order on ties) and receive dense indices. Huffman codes for
//! hierarchical softmax are derived from the sorted counts.

pub mod huffman;
pub mod unigram;

pub use huffman::HuffmanCode;
pub use unigram::UnigramTable;

use crate::config::TrainSettings;
use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{debug, info};

const VOCAB_FILE_VERSION: u32 = 1;

/// A vocabulary word with its count and Huffman code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VocabEntry {
    pub word: String,
    pub count: u64,
    pub code: Vec<u8>,
    /// Internal Huffman nodes from the root down to this word.
    pub path: Vec<u32>,
}

/// Immutable vocabulary with indices in descending-frequency order.
#[derive(Clone, Debug)]
pub struct Vocabulary {
    entries: Vec<VocabEntry>,
    index: HashMap<String, usize>,
    train_words: u64,
}

#[derive(Serialize, Deserialize)]
struct VocabFile {
    version: u32,
    words: Vec<(String, u64)>,
}

impl Vocabulary {
    /// Count the corpus and build the pruned, indexed vocabulary.
    pub fn learn(corpus: &Corpus, settings: &TrainSettings) -> Result<Self> {
        let stopwords = match &settings.stopwords {
            Some(path) => load_stopwords(path, &settings.tokenizer)?,
            None => HashSet::new(),
        };

        let mut counts: Vec<(String, u64)> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut total = 0u64;
        for segment in corpus.segments() {
            segment.for_each_sentence(&settings.tokenizer, |sentence| {
                for word in sentence {
                    total += 1;
                    match seen.get(&word) {
                        Some(&i) => counts[i].1 += 1,
                        None => {
                            seen.insert(word.clone(), counts.len());
                            counts.push((word, 1));
                        }
                    }
                }
                Ok(())
            })?;
        }
        debug!(distinct = counts.len(), total, "corpus counted");

        Self::from_counts(counts, settings.min_frequency, &stopwords)
    }

    /// Build from `(word, count)` pairs given in first-seen order.
    ///
    /// ```
    /// use std::collections::HashSet;
    /// use word2vec::Vocabulary;
    ///
    /// let counts = vec![("b".to_string(), 2), ("a".to_string(), 5), ("c".to_string(), 2)];
    /// let vocab = Vocabulary::from_counts(counts, 0, &HashSet::new()).unwrap();
    /// let words: Vec<&str> = vocab.words().collect();
    /// assert_eq!(words, ["a", "b", "c"]);
    /// ```
    pub fn from_counts<I>(counts: I, min_frequency: u64, stopwords: &HashSet<String>) -> Result<Self>
    where
        I: IntoIterator<Item = (String, u64)>,
    {
        let mut kept: Vec<(String, u64)> = counts
            .into_iter()
            .filter(|(word, count)| *count >= min_frequency && !stopwords.contains(word))
            .collect();
        if kept.is_empty() {
            return Err(Error::EmptyVocabulary);
        }
        // Stable: equal counts keep their first-seen order.
        kept.sort_by(|a, b| b.1.cmp(&a.1));

        let raw: Vec<u64> = kept.iter().map(|(_, c)| *c).collect();
        let codes = huffman::build(&raw);

        let mut index = HashMap::with_capacity(kept.len());
        let mut entries = Vec::with_capacity(kept.len());
        for (i, ((word, count), code)) in kept.into_iter().zip(codes).enumerate() {
            if index.insert(word.clone(), i).is_some() {
                return Err(Error::Configuration(format!(
                    "duplicate vocabulary word {word:?}"
                )));
            }
            entries.push(VocabEntry {
                word,
                count,
                code: code.code,
                path: code.path,
            });
        }

        let train_words = raw.iter().sum();
        info!(vocab_size = entries.len(), train_words, "vocabulary built");
        Ok(Vocabulary {
            entries,
            index,
            train_words,
        })
    }

    /// Number of words. Never zero.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total occurrences of vocabulary words in the corpus.
    pub fn train_words(&self) -> u64 {
        self.train_words
    }

    pub fn index_of(&self, word: &str) -> Option<usize> {
        self.index.get(word).copied()
    }

    pub fn get(&self, index: usize) -> Option<&VocabEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[VocabEntry] {
        &self.entries
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.word.as_str())
    }

    pub fn counts(&self) -> Vec<u64> {
        self.entries.iter().map(|e| e.count).collect()
    }

    /// Save words and counts (codes are rebuilt on load).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let snapshot = VocabFile {
            version: VOCAB_FILE_VERSION,
            words: self
                .entries
                .iter()
                .map(|e| (e.word.clone(), e.count))
                .collect(),
        };
        let writer = BufWriter::new(File::create(path.as_ref())?);
        bincode::serialize_into(writer, &snapshot)
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
    }

    /// Load a vocabulary written by [`Vocabulary::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::corpus(path, e))?;
        let snapshot: VocabFile = bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| Error::Configuration(format!("invalid vocabulary file {}: {e}", path.display())))?;
        if snapshot.version != VOCAB_FILE_VERSION {
            return Err(Error::Configuration(format!(
                "unsupported vocabulary file version {}",
                snapshot.version
            )));
        }
        Self::from_counts(snapshot.words, 0, &HashSet::new())
    }
}

/// Read a stop-word list; words are split with the corpus tokenizer.
pub fn load_stopwords<P: AsRef<Path>>(path: P, tokenizer: &Tokenizer) -> Result<HashSet<String>> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| Error::corpus(path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(tokenizer.words(&text).map(str::to_string).collect())
}
