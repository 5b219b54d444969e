//! One training thread: sentence scanning, sub-sampling, window sliding and
//! gradient updates against the shared matrices.

use super::TrainState;
use crate::config::{Architecture, OutputLayer};
use crate::corpus::Segment;
use crate::error::Result;
use crate::tokenizer::MAX_SENTENCE_LENGTH;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::Ordering;
use tracing::{debug, info};

/// Words a thread processes between updates of the shared counter.
const COUNTER_BATCH: u64 = 10_000;

/// Alpha never decays below this fraction of its starting value.
const MIN_ALPHA_FRACTION: f32 = 1e-4;

pub(super) struct Worker<'a> {
    state: &'a TrainState<'a>,
    id: usize,
    rng: StdRng,
    alpha: f32,
    word_count: u64,
    last_word_count: u64,
    sentence: Vec<usize>,
    hidden: Vec<f32>,
    grad: Vec<f32>,
}

impl<'a> Worker<'a> {
    pub(super) fn new(state: &'a TrainState<'a>, id: usize) -> Self {
        let dim = state.settings.vector_dim;
        Worker {
            state,
            id,
            rng: StdRng::seed_from_u64(0),
            alpha: state.settings.learning_rate,
            word_count: 0,
            last_word_count: 0,
            sentence: Vec::with_capacity(MAX_SENTENCE_LENGTH),
            hidden: vec![0.0; dim],
            grad: vec![0.0; dim],
        }
    }

    /// Deterministic per-(seed, epoch, thread) stream.
    fn epoch_seed(&self, epoch: usize) -> u64 {
        let threads = self.state.settings.threads as u64;
        self.state
            .settings
            .seed
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(epoch as u64 * threads + self.id as u64)
    }

    pub(super) fn run_epoch(&mut self, epoch: usize, segments: &[Segment]) -> Result<()> {
        let state = self.state;
        self.rng = StdRng::seed_from_u64(self.epoch_seed(epoch));
        self.word_count = 0;
        self.last_word_count = 0;
        self.alpha = state.alpha(state.words_processed.load(Ordering::Relaxed));

        for segment in segments {
            segment.for_each_sentence(&state.settings.tokenizer, |words| {
                self.train_sentence(&words);
                Ok(())
            })?;
        }

        let rest = self.word_count - self.last_word_count;
        state.words_processed.fetch_add(rest, Ordering::Relaxed);
        Ok(())
    }

    fn train_sentence(&mut self, words: &[String]) {
        let state = self.state;
        let vocab = state.vocab;
        let threshold = state.settings.threshold;
        let train_words = vocab.train_words().max(1) as f64;

        self.sentence.clear();
        for word in words {
            let Some(index) = vocab.index_of(word) else {
                continue;
            };
            self.word_count += 1;

            if threshold > 0.0 {
                let freq = vocab.entries()[index].count as f64 / train_words;
                let keep = (threshold / freq).sqrt() + threshold / freq;
                if keep < self.rng.gen::<f64>() {
                    continue;
                }
            }
            self.sentence.push(index);
        }

        if self.word_count - self.last_word_count > COUNTER_BATCH {
            self.publish_progress();
        }

        for position in 0..self.sentence.len() {
            let radius = self.rng.gen_range(1..=state.settings.window);
            let lo = position.saturating_sub(radius);
            let hi = (position + radius).min(self.sentence.len() - 1);
            match state.settings.architecture {
                Architecture::SkipGram => self.skip_gram(position, lo, hi),
                Architecture::Cbow => self.cbow(position, lo, hi),
            }
        }
    }

    fn publish_progress(&mut self) {
        let state = self.state;
        let delta = self.word_count - self.last_word_count;
        let processed = state.words_processed.fetch_add(delta, Ordering::Relaxed) + delta;
        self.last_word_count = self.word_count;
        self.alpha = state.alpha(processed);

        if self.id == 0 {
            let progress = processed as f64 / state.total_words as f64 * 100.0;
            let elapsed = state.started.elapsed().as_secs_f64().max(1e-3);
            let rate = processed as f64 / elapsed / state.settings.threads as f64 / 1000.0;
            if state.settings.verbose {
                info!(
                    alpha = self.alpha,
                    progress = %format!("{progress:.2}%"),
                    words_per_thread_sec = %format!("{rate:.2}k"),
                    "training"
                );
            } else {
                debug!(alpha = self.alpha, progress = %format!("{progress:.2}%"), "training");
            }
        }
    }

    /// Predict every context word from the center word's input vector.
    fn skip_gram(&mut self, position: usize, lo: usize, hi: usize) {
        let state = self.state;
        let center = self.sentence[position];
        for c in lo..=hi {
            if c == position {
                continue;
            }
            let target = self.sentence[c];
            state.input.copy_row(center, &mut self.hidden);
            self.grad.fill(0.0);
            self.output_layer(target);
            state.input.add_scaled(center, &self.grad, 1.0);
        }
    }

    /// Predict the center word from the mean of its context vectors.
    fn cbow(&mut self, position: usize, lo: usize, hi: usize) {
        let state = self.state;
        self.hidden.fill(0.0);
        let mut context = 0usize;
        for c in lo..=hi {
            if c == position {
                continue;
            }
            let word = self.sentence[c];
            for (h, col) in self.hidden.iter_mut().zip(0..) {
                *h += state.input.get(word, col);
            }
            context += 1;
        }
        if context == 0 {
            return;
        }
        let inv = 1.0 / context as f32;
        self.hidden.iter_mut().for_each(|h| *h *= inv);

        self.grad.fill(0.0);
        self.output_layer(self.sentence[position]);

        for c in lo..=hi {
            if c != position {
                state.input.add_scaled(self.sentence[c], &self.grad, 1.0);
            }
        }
    }

    /// Update the output layer for predicting `target` from `self.hidden`,
    /// accumulating the input-side gradient in `self.grad`.
    fn output_layer(&mut self, target: usize) {
        let state = self.state;
        let alpha = self.alpha;
        match state.settings.output {
            OutputLayer::HierarchicalSoftmax => {
                let entry = &state.vocab.entries()[target];
                for (&node, &bit) in entry.path.iter().zip(&entry.code) {
                    let node = node as usize;
                    let Some(f) = state.sigmoid.get(state.output.dot(node, &self.hidden)) else {
                        continue;
                    };
                    let g = (1.0 - bit as f32 - f) * alpha;
                    state.output.accumulate_into(node, &mut self.grad, g);
                    state.output.add_scaled(node, &self.hidden, g);
                }
            }
            OutputLayer::NegativeSampling { samples } => {
                let Some(table) = state.unigram.as_ref() else {
                    return;
                };
                for d in 0..=samples {
                    let (word, label) = if d == 0 {
                        (target, 1.0)
                    } else {
                        let word = table.sample(&mut self.rng);
                        if word == target {
                            continue;
                        }
                        (word, 0.0)
                    };
                    let f = state.sigmoid.saturating(state.output.dot(word, &self.hidden));
                    let g = (label - f) * alpha;
                    state.output.accumulate_into(word, &mut self.grad, g);
                    state.output.add_scaled(word, &self.hidden, g);
                }
            }
        }
    }
}

/// Linear decay from `start` toward `start * 1e-4`.
pub(super) fn decayed_alpha(start: f32, processed: u64, total: u64) -> f32 {
    let remaining = 1.0 - processed as f32 / (total as f32 + 1.0);
    start * remaining.max(MIN_ALPHA_FRACTION)
}
