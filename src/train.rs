//! Multi-threaded skip-gram / CBOW training
//!
//! Worker threads are spawned once and each owns a fixed partition of the
//! corpus. They update the shared weight matrices without locking (see
//! [`weights`]) and meet at a barrier after every epoch; no thread starts
//! epoch `n + 1` before all threads have finished epoch `n`.

mod sigmoid;
mod weights;
mod worker;

pub use weights::SharedMatrix;

use crate::config::{OutputLayer, TrainSettings};
use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::model::Model;
use crate::vocab::{UnigramTable, Vocabulary};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sigmoid::SigmoidTable;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Barrier, Mutex};
use std::thread;
use std::time::Instant;
use tracing::{debug, info};
use worker::Worker;

/// State shared read-only (vocabulary, tables, settings) or through
/// relaxed atomics (weights, word counter) by every worker.
pub(crate) struct TrainState<'a> {
    settings: &'a TrainSettings,
    vocab: &'a Vocabulary,
    unigram: Option<UnigramTable>,
    input: SharedMatrix,
    output: SharedMatrix,
    sigmoid: SigmoidTable,
    words_processed: AtomicU64,
    total_words: u64,
    started: Instant,
}

impl<'a> TrainState<'a> {
    fn new(settings: &'a TrainSettings, vocab: &'a Vocabulary) -> Self {
        let rows = vocab.len();
        let dim = settings.vector_dim;
        let mut rng = StdRng::seed_from_u64(settings.seed);

        let unigram = match settings.output {
            OutputLayer::NegativeSampling { .. } => Some(UnigramTable::new(&vocab.counts())),
            OutputLayer::HierarchicalSoftmax => None,
        };

        TrainState {
            settings,
            vocab,
            unigram,
            input: SharedMatrix::random(rows, dim, &mut rng),
            output: SharedMatrix::zeros(rows, dim),
            sigmoid: SigmoidTable::new(),
            words_processed: AtomicU64::new(0),
            total_words: settings.epochs as u64 * vocab.train_words(),
            started: Instant::now(),
        }
    }

    fn alpha(&self, processed: u64) -> f32 {
        worker::decayed_alpha(self.settings.learning_rate, processed, self.total_words)
    }
}

/// Owns everything needed for one training run.
///
/// ```no_run
/// use word2vec::{store, LoadMode, TrainConfig, Trainer};
///
/// let settings = TrainConfig::default().validate()?;
/// let trainer = Trainer::new(settings, "corpus.txt")?;
/// let model = trainer.train()?;
/// store::save(&model, "model.bin")?;
/// # Ok::<(), word2vec::Error>(())
/// ```
pub struct Trainer {
    settings: TrainSettings,
    corpus: Corpus,
    vocab: Vocabulary,
}

impl Trainer {
    /// Open the corpus and build its vocabulary.
    pub fn new<P: AsRef<Path>>(settings: TrainSettings, corpus: P) -> Result<Self> {
        settings.check()?;
        let corpus = Corpus::open(corpus)?;
        let vocab = Vocabulary::learn(&corpus, &settings)?;
        Self::with_vocabulary(settings, corpus, vocab)
    }

    /// Train over `corpus` with a vocabulary built elsewhere (or loaded).
    ///
    /// Fails with [`Error::Configuration`] if `settings` no longer holds the
    /// invariants [`TrainConfig::validate`](crate::TrainConfig::validate)
    /// established.
    pub fn with_vocabulary(settings: TrainSettings, corpus: Corpus, vocab: Vocabulary) -> Result<Self> {
        settings.check()?;
        Ok(Trainer {
            settings,
            corpus,
            vocab,
        })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn settings(&self) -> &TrainSettings {
        &self.settings
    }

    /// Run every epoch and return the trained model.
    ///
    /// Fails with [`Error::TrainingFailed`] if any worker hits an error; no
    /// partial model is returned in that case.
    pub fn train(&self) -> Result<Model> {
        let settings = &self.settings;
        let threads = settings.threads;
        info!(
            architecture = ?settings.architecture,
            output = ?settings.output,
            vocab_size = self.vocab.len(),
            train_words = self.vocab.train_words(),
            threads,
            epochs = settings.epochs,
            vector_dim = settings.vector_dim,
            "training started"
        );

        let state = TrainState::new(settings, &self.vocab);
        let barrier = Barrier::new(threads);
        let abort = AtomicBool::new(false);
        let failure: Mutex<Option<(usize, Error)>> = Mutex::new(None);

        thread::scope(|scope| {
            for id in 0..threads {
                let state = &state;
                let barrier = &barrier;
                let abort = &abort;
                let failure = &failure;
                let segments = self.corpus.partition(id, threads);
                scope.spawn(move || {
                    let mut worker = Worker::new(state, id);
                    for epoch in 0..settings.epochs {
                        if !abort.load(Ordering::Acquire) {
                            if let Err(e) = worker.run_epoch(epoch, &segments) {
                                abort.store(true, Ordering::Release);
                                if let Ok(mut slot) = failure.lock() {
                                    slot.get_or_insert((id, e));
                                }
                            }
                        }
                        if barrier.wait().is_leader() && !abort.load(Ordering::Acquire) {
                            debug!(
                                epoch = epoch + 1,
                                words = state.words_processed.load(Ordering::Relaxed),
                                "epoch finished"
                            );
                        }
                        if abort.load(Ordering::Acquire) {
                            break;
                        }
                    }
                });
            }
        });

        let failed = match failure.into_inner() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some((id, e)) = failed {
            let cause = match std::error::Error::source(&e) {
                Some(source) => format!("worker {id}: {e}: {source}"),
                None => format!("worker {id}: {e}"),
            };
            return Err(Error::TrainingFailed(cause));
        }

        info!(
            elapsed_secs = state.started.elapsed().as_secs_f64(),
            "training finished"
        );

        let words = self.vocab.words().map(str::to_string).collect();
        let model = Model::new(words, settings.vector_dim, state.input.into_vec())?;
        Ok(model.with_tokenizer(settings.tokenizer.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrainConfig;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;

    fn vocab(words: &[(&str, u64)]) -> Vocabulary {
        Vocabulary::from_counts(
            words.iter().map(|(w, c)| (w.to_string(), *c)),
            0,
            &HashSet::new(),
        )
        .unwrap()
    }

    #[test]
    fn state_allocates_one_row_per_word() {
        let settings = {
            let mut c = TrainConfig::default();
            c.word.vector = 8;
            c.validate().unwrap()
        };
        let v = vocab(&[("a", 3), ("b", 2), ("c", 1)]);
        let state = TrainState::new(&settings, &v);
        assert_eq!(state.input.rows(), 3);
        assert_eq!(state.output.rows(), 3);
        assert_eq!(state.input.cols(), 8);
        assert!(state.unigram.as_ref().is_some_and(|t| !t.is_empty()));
        assert_eq!(state.total_words, 5 * 6);
    }

    #[test]
    fn tampered_settings_are_rejected_before_training() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.txt");
        fs::write(&path, "one two three. one two.\n").unwrap();

        let mut c = TrainConfig::default();
        c.word.vector = 4;
        c.word.frequency = 0;
        let valid = c.validate().unwrap();

        let mut zero_threads = valid.clone();
        zero_threads.threads = 0;
        assert!(matches!(
            Trainer::new(zero_threads, &path),
            Err(Error::Configuration(_))
        ));

        let mut zero_window = valid.clone();
        zero_window.window = 0;
        zero_window.threads = 3;
        let corpus = Corpus::open(&path).unwrap();
        let vocab = vocab(&[("one", 2), ("two", 2), ("three", 1)]);
        assert!(matches!(
            Trainer::with_vocabulary(zero_window, corpus, vocab),
            Err(Error::Configuration(_))
        ));

        let mut zero_dim = valid;
        zero_dim.vector_dim = 0;
        assert!(matches!(
            Trainer::new(zero_dim, &path),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn vanished_corpus_fails_the_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.txt");
        fs::write(&path, "one two three. one two.\n").unwrap();

        let mut c = TrainConfig::default();
        c.word.vector = 4;
        c.word.frequency = 0;
        c.threads = 2;
        let settings = c.validate().unwrap();
        let trainer = Trainer::new(settings, &path).unwrap();

        fs::remove_file(&path).unwrap();
        match trainer.train() {
            Err(Error::TrainingFailed(msg)) => assert!(msg.contains("corpus")),
            other => panic!("expected training failure, got {:?}", other.map(|m| m.len())),
        }
    }
}
