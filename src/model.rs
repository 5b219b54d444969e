//! Trained model and inference
//!
//! A [`Model`] is the published result of training: the vocabulary in index
//! order and one vector per word. It is immutable and `Send + Sync`, so any
//! number of threads may query it concurrently without locking.

use crate::error::{Error, Result};
use crate::similarity;
use crate::tokenizer::Tokenizer;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// A nearest-neighbour result.
#[derive(Clone, Debug, PartialEq)]
pub struct Neighbor {
    pub word: String,
    /// Cosine distance, `1 - cos`.
    pub distance: f32,
}

/// Whether the query's own words may appear among lookup results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelfMatch {
    /// Exclude the query's words when enough other words remain to fill
    /// `k` results; otherwise rank everything.
    #[default]
    Auto,
    Include,
    Exclude,
}

/// Word vectors in vocabulary order.
#[derive(Clone, Debug)]
pub struct Model {
    words: Vec<String>,
    index: HashMap<String, usize>,
    dim: usize,
    vectors: Vec<f32>,
    norms: Vec<f32>,
    tokenizer: Tokenizer,
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    distance: f32,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    // Smaller distance first, then smaller index.
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.index.cmp(&other.index))
    }
}

impl Model {
    /// Assemble a model from words and a row-major `words.len() × dim` matrix.
    ///
    /// ```
    /// use word2vec::Model;
    ///
    /// let model = Model::new(
    ///     vec!["king".into(), "queen".into()],
    ///     2,
    ///     vec![1.0, 0.0, 0.9, 0.1],
    /// ).unwrap();
    /// assert_eq!(model.vector_of("queen").unwrap(), vec![0.9, 0.1]);
    /// assert!(model.vector_of("jack").is_err());
    /// ```
    pub fn new(words: Vec<String>, dim: usize, vectors: Vec<f32>) -> Result<Self> {
        if dim == 0 {
            return Err(Error::ModelLoad("vector dimension must be positive".into()));
        }
        let expected = words.len().checked_mul(dim).ok_or_else(|| {
            Error::ModelLoad(format!("{} × {dim} vectors overflow", words.len()))
        })?;
        if vectors.len() != expected {
            return Err(Error::ModelLoad(format!(
                "expected {expected} vector values for {} words of dimension {dim}, got {}",
                words.len(),
                vectors.len()
            )));
        }

        let mut index = HashMap::with_capacity(words.len());
        for (i, word) in words.iter().enumerate() {
            if index.insert(word.clone(), i).is_some() {
                return Err(Error::ModelLoad(format!("duplicate word {word:?}")));
            }
        }
        let norms = vectors.chunks_exact(dim).map(similarity::norm).collect();

        Ok(Model {
            words,
            index,
            dim,
            vectors,
            norms,
            tokenizer: Tokenizer::default(),
        })
    }

    /// Use a different delimiter policy for [`embedding`](Self::embedding)
    /// and [`lookup`](Self::lookup).
    pub fn with_tokenizer(mut self, tokenizer: Tokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Vocabulary in index order.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Row-major vector matrix.
    pub fn vectors(&self) -> &[f32] {
        &self.vectors
    }

    pub fn index_of(&self, word: &str) -> Option<usize> {
        self.index.get(word).copied()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    /// Vector of the word at `index`.
    pub fn row(&self, index: usize) -> &[f32] {
        &self.vectors[index * self.dim..(index + 1) * self.dim]
    }

    /// Exact vector of a vocabulary word.
    pub fn vector_of(&self, word: &str) -> Result<Vec<f32>> {
        self.index_of(word)
            .map(|i| self.row(i).to_vec())
            .ok_or_else(|| Error::UnknownWord(word.to_string()))
    }

    /// Indices of the known tokens of `text`, one per occurrence.
    fn known_tokens(&self, text: &str) -> Vec<usize> {
        self.tokenizer
            .words(text)
            .filter_map(|w| self.index_of(w))
            .collect()
    }

    fn mean(&self, indices: &[usize]) -> Vec<f32> {
        let mut acc = vec![0.0f32; self.dim];
        for &i in indices {
            for (a, x) in acc.iter_mut().zip(self.row(i)) {
                *a += x;
            }
        }
        let inv = 1.0 / indices.len() as f32;
        acc.iter_mut().for_each(|a| *a *= inv);
        acc
    }

    /// Mean of the vectors of the known words of `text`.
    ///
    /// Unknown words are ignored; if none is known the text has no embedding.
    pub fn embedding(&self, text: &str) -> Result<Vec<f32>> {
        let known = self.known_tokens(text);
        if known.is_empty() {
            return Err(Error::UnknownWord(text.to_string()));
        }
        Ok(self.mean(&known))
    }

    /// The `k` words closest to the embedding of `query`, using
    /// [`SelfMatch::Auto`].
    ///
    /// Results are sorted by ascending cosine distance, ties by ascending
    /// vocabulary index, and there are exactly `min(k, len)` of them.
    pub fn lookup(&self, query: &str, k: usize) -> Result<Vec<Neighbor>> {
        self.lookup_with(query, k, SelfMatch::Auto)
    }

    /// [`lookup`](Self::lookup) with an explicit self-match policy.
    pub fn lookup_with(&self, query: &str, k: usize, policy: SelfMatch) -> Result<Vec<Neighbor>> {
        let known = self.known_tokens(query);
        if known.is_empty() {
            return Err(Error::UnknownWord(query.to_string()));
        }
        let target = self.mean(&known);

        let mut own = known;
        own.sort_unstable();
        own.dedup();
        let excluded: &[usize] = match policy {
            SelfMatch::Include => &[],
            SelfMatch::Exclude => own.as_slice(),
            SelfMatch::Auto if k.saturating_add(own.len()) <= self.len() => own.as_slice(),
            SelfMatch::Auto => &[],
        };
        Ok(self.rank(&target, k, excluded))
    }

    /// The `k` words closest to an arbitrary vector of the model's dimension.
    pub fn lookup_vector(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if vector.len() != self.dim {
            return Err(Error::Configuration(format!(
                "query vector has dimension {}, model has {}",
                vector.len(),
                self.dim
            )));
        }
        Ok(self.rank(vector, k, &[]))
    }

    /// Exhaustive scan keeping the best `k` in a bounded max-heap.
    fn rank(&self, target: &[f32], k: usize, excluded: &[usize]) -> Vec<Neighbor> {
        let k = k.min(self.len());
        if k == 0 {
            return Vec::new();
        }
        let target_norm = similarity::norm(target);
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);

        for (index, row) in self.vectors.chunks_exact(self.dim).enumerate() {
            if excluded.binary_search(&index).is_ok() {
                continue;
            }
            let cos = similarity::cosine_with_norms(target, row, target_norm, self.norms[index]);
            let candidate = Candidate {
                distance: 1.0 - cos,
                index,
            };
            if heap.len() < k {
                heap.push(candidate);
            } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                heap.pop();
                heap.push(candidate);
            }
        }

        heap.into_sorted_vec()
            .into_iter()
            .map(|c| Neighbor {
                word: self.words[c.index].clone(),
                distance: c.distance,
            })
            .collect()
    }
}
