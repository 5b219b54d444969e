//! Training configuration
//!
//! [`TrainConfig`] is the serializable surface (JSON file or defaults).
//! [`TrainConfig::validate`] turns it into [`TrainSettings`], the checked,
//! strongly typed value the vocabulary builder and trainer consume.

use crate::error::{Error, Result};
use crate::tokenizer::Tokenizer;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Default word delimiters: whitespace plus common punctuation.
pub const DEFAULT_WORD_DELIMITERS: &str =
    " \n,.-!?:;/\"#$%&'()*+<=>@[]\\^_`{|}~\t\x0b\x0c\r";

/// Default end-of-sentence delimiters.
pub const DEFAULT_SENTENCE_DELIMITERS: &str = ".\n?!";

/// Corpus section
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CorpusConfig {
    /// Words listed here are excluded from the vocabulary.
    pub stopwords: Option<PathBuf>,
    /// Word delimiter characters
    pub tokenizer: String,
    /// End-of-sentence characters
    pub sequencer: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        CorpusConfig {
            stopwords: None,
            tokenizer: DEFAULT_WORD_DELIMITERS.to_string(),
            sequencer: DEFAULT_SENTENCE_DELIMITERS.to_string(),
        }
    }
}

/// Word vector section
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WordConfig {
    /// Vector dimension
    pub vector: usize,
    /// Maximum context radius
    pub window: usize,
    /// Sub-sampling threshold for frequent words (0 disables)
    pub threshold: f64,
    /// Words seen fewer times are dropped (0 disables)
    pub frequency: u64,
}

impl Default for WordConfig {
    fn default() -> Self {
        WordConfig {
            vector: 300,
            window: 5,
            threshold: 1e-3,
            frequency: 5,
        }
    }
}

/// Learning section
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LearningConfig {
    pub epoch: usize,
    /// Starting learning rate
    pub rate: f64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        LearningConfig {
            epoch: 5,
            rate: 0.05,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Toggle {
    pub enabled: bool,
}

impl Toggle {
    fn on() -> Self {
        Toggle { enabled: true }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegativeSamplingConfig {
    pub enabled: bool,
    /// Negative examples per positive one
    pub size: usize,
}

impl Default for NegativeSamplingConfig {
    fn default() -> Self {
        NegativeSamplingConfig {
            enabled: true,
            size: 5,
        }
    }
}

/// Full training configuration as read from a config file.
///
/// # Examples
///
/// ```
/// use word2vec::{Architecture, OutputLayer, TrainConfig};
///
/// let settings = TrainConfig::default().validate().unwrap();
/// assert_eq!(settings.vector_dim, 300);
/// assert_eq!(settings.architecture, Architecture::SkipGram);
/// assert_eq!(settings.output, OutputLayer::NegativeSampling { samples: 5 });
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TrainConfig {
    pub corpus: CorpusConfig,
    pub word: WordConfig,
    pub learning: LearningConfig,
    pub skip_gram: Toggle,
    pub cbow: Toggle,
    pub negative_sampling: NegativeSamplingConfig,
    pub hierarchical_softmax: Toggle,
    pub threads: usize,
    pub seed: u64,
    pub verbose: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            corpus: CorpusConfig::default(),
            word: WordConfig::default(),
            learning: LearningConfig::default(),
            skip_gram: Toggle::on(),
            cbow: Toggle::default(),
            negative_sampling: NegativeSamplingConfig::default(),
            hierarchical_softmax: Toggle::default(),
            threads: default_threads(),
            seed: 1,
            verbose: false,
        }
    }
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl TrainConfig {
    /// Load a JSON configuration file. Missing sections take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::Configuration(format!("cannot open {}: {e}", path.display()))
        })?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Configuration(format!("{}: {e}", path.display())))
    }

    /// Pretty-printed JSON of this configuration.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Configuration(e.to_string()))
    }

    /// The delimiter policy of the `corpus` section.
    pub fn tokenizer(&self) -> Result<Tokenizer> {
        Tokenizer::new(&self.corpus.tokenizer, &self.corpus.sequencer)
    }

    /// Check option consistency and produce the settings used for training.
    pub fn validate(&self) -> Result<TrainSettings> {
        let architecture = match (self.skip_gram.enabled, self.cbow.enabled) {
            (true, false) => Architecture::SkipGram,
            (false, true) => Architecture::Cbow,
            _ => {
                return Err(Error::Configuration(
                    "exactly one of skip-gram and cbow must be enabled".into(),
                ))
            }
        };

        let output = match (
            self.hierarchical_softmax.enabled,
            self.negative_sampling.enabled,
        ) {
            (true, false) => OutputLayer::HierarchicalSoftmax,
            (false, true) => {
                if self.negative_sampling.size == 0 {
                    return Err(Error::Configuration(
                        "negative sampling size must be positive".into(),
                    ));
                }
                OutputLayer::NegativeSampling {
                    samples: self.negative_sampling.size,
                }
            }
            _ => {
                return Err(Error::Configuration(
                    "exactly one of hierarchical-softmax and negative-sampling must be enabled"
                        .into(),
                ))
            }
        };

        let tokenizer = self.tokenizer()?;

        let settings = TrainSettings {
            stopwords: self.corpus.stopwords.clone(),
            tokenizer,
            vector_dim: self.word.vector,
            window: self.word.window,
            threshold: self.word.threshold,
            min_frequency: self.word.frequency,
            architecture,
            output,
            epochs: self.learning.epoch,
            learning_rate: self.learning.rate as f32,
            threads: self.threads,
            seed: self.seed,
            verbose: self.verbose,
        };
        settings.check()?;
        Ok(settings)
    }
}

/// Network architecture
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Architecture {
    /// Predict each context word from the center word.
    SkipGram,
    /// Predict the center word from the mean of its context.
    Cbow,
}

/// Output-layer approximation of the full softmax
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputLayer {
    HierarchicalSoftmax,
    NegativeSampling { samples: usize },
}

/// Validated, immutable settings for one training run.
#[derive(Clone, Debug)]
pub struct TrainSettings {
    pub stopwords: Option<PathBuf>,
    pub tokenizer: Tokenizer,
    pub vector_dim: usize,
    pub window: usize,
    pub threshold: f64,
    pub min_frequency: u64,
    pub architecture: Architecture,
    pub output: OutputLayer,
    pub epochs: usize,
    pub learning_rate: f32,
    pub threads: usize,
    pub seed: u64,
    pub verbose: bool,
}

impl TrainSettings {
    /// Re-check the numeric invariants. Settings are plain data, so the
    /// trainer runs this again before doing any work.
    pub fn check(&self) -> Result<()> {
        if self.vector_dim == 0 {
            return Err(Error::Configuration(
                "vector dimension must be positive".into(),
            ));
        }
        if self.window == 0 {
            return Err(Error::Configuration("window size must be positive".into()));
        }
        if self.threads == 0 {
            return Err(Error::Configuration("thread count must be positive".into()));
        }
        if self.epochs == 0 {
            return Err(Error::Configuration("epoch count must be positive".into()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::Configuration(format!(
                "learning rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        if !(self.threshold.is_finite() && self.threshold >= 0.0) {
            return Err(Error::Configuration(format!(
                "sub-sampling threshold must be non-negative, got {}",
                self.threshold
            )));
        }
        if let OutputLayer::NegativeSampling { samples: 0 } = self.output {
            return Err(Error::Configuration(
                "negative sampling size must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_configuration_error(config: TrainConfig) {
        match config.validate() {
            Err(Error::Configuration(_)) => {}
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let c = TrainConfig::default();
        assert_eq!(c.word.vector, 300);
        assert_eq!(c.word.window, 5);
        assert_eq!(c.word.threshold, 1e-3);
        assert_eq!(c.word.frequency, 5);
        assert_eq!(c.learning.epoch, 5);
        assert_eq!(c.learning.rate, 0.05);
        assert!(c.skip_gram.enabled && !c.cbow.enabled);
        assert!(c.negative_sampling.enabled && !c.hierarchical_softmax.enabled);
        assert_eq!(c.negative_sampling.size, 5);
        assert!(c.threads >= 1);
        assert_eq!(c.corpus.sequencer, ".\n?!");
    }

    #[test]
    fn both_architectures_rejected() {
        let mut c = TrainConfig::default();
        c.cbow.enabled = true;
        expect_configuration_error(c);
    }

    #[test]
    fn no_architecture_rejected() {
        let mut c = TrainConfig::default();
        c.skip_gram.enabled = false;
        expect_configuration_error(c);
    }

    #[test]
    fn both_output_layers_rejected() {
        let mut c = TrainConfig::default();
        c.hierarchical_softmax.enabled = true;
        expect_configuration_error(c);
    }

    #[test]
    fn zero_sizes_rejected() {
        let mut c = TrainConfig::default();
        c.word.vector = 0;
        expect_configuration_error(c);

        let mut c = TrainConfig::default();
        c.threads = 0;
        expect_configuration_error(c);

        let mut c = TrainConfig::default();
        c.negative_sampling.size = 0;
        expect_configuration_error(c);

        let mut c = TrainConfig::default();
        c.learning.rate = 0.0;
        expect_configuration_error(c);
    }

    #[test]
    fn settings_check_catches_edits_after_validation() {
        let valid = TrainConfig::default().validate().unwrap();
        assert!(valid.check().is_ok());

        let edits: [fn(&mut TrainSettings); 6] = [
            |s| s.threads = 0,
            |s| s.window = 0,
            |s| s.vector_dim = 0,
            |s| s.epochs = 0,
            |s| s.learning_rate = f32::NAN,
            |s| s.output = OutputLayer::NegativeSampling { samples: 0 },
        ];
        for edit in edits {
            let mut s = valid.clone();
            edit(&mut s);
            assert!(matches!(s.check(), Err(Error::Configuration(_))));
        }
    }

    #[test]
    fn cbow_with_hierarchical_softmax() {
        let mut c = TrainConfig::default();
        c.skip_gram.enabled = false;
        c.cbow.enabled = true;
        c.negative_sampling.enabled = false;
        c.hierarchical_softmax.enabled = true;
        let s = c.validate().unwrap();
        assert_eq!(s.architecture, Architecture::Cbow);
        assert_eq!(s.output, OutputLayer::HierarchicalSoftmax);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{ "word": { "vector": 64 }, "cbow": { "enabled": true }, "skip-gram": { "enabled": false } }"#;
        let c: TrainConfig = serde_json::from_str(json).unwrap();
        assert_eq!(c.word.vector, 64);
        assert_eq!(c.word.window, 5);
        assert_eq!(c.validate().unwrap().architecture, Architecture::Cbow);
    }

    #[test]
    fn json_round_trip() {
        let c = TrainConfig::default();
        let json = c.to_json().unwrap();
        assert!(json.contains("negative-sampling"));
        let back: TrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
