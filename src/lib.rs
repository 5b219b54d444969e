//! word2vec - Dense Word Embeddings
//!
//! Copyright (c) 2025 word2vec-rs Contributors
//! Licensed under MIT License
//!
//! Skip-gram and CBOW training with hierarchical softmax or negative
//! sampling, a compact binary model format, and nearest-neighbour lookup by
//! cosine distance.
//!
//! ```no_run
//! use word2vec::{store, LoadMode, TrainConfig, Trainer};
//!
//! let mut config = TrainConfig::default();
//! config.word.vector = 100;
//! let trainer = Trainer::new(config.validate()?, "corpus.txt")?;
//! store::save(&trainer.train()?, "model.bin")?;
//!
//! let model = store::load("model.bin", LoadMode::Mapped)?;
//! for n in model.lookup("king", 10)? {
//!     println!("{:>15} : {:.6}", n.word, n.distance);
//! }
//! # Ok::<(), word2vec::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod fvecs;
pub mod model;
pub mod similarity;
pub mod store;
pub mod tokenizer;
pub mod train;
pub mod vocab;

// Re-export main types for convenience
pub use config::{Architecture, OutputLayer, TrainConfig, TrainSettings};
pub use corpus::{Corpus, Segment};
pub use error::{Error, Result};
pub use model::{Model, Neighbor, SelfMatch};
pub use store::LoadMode;
pub use tokenizer::Tokenizer;
pub use train::Trainer;
pub use vocab::{VocabEntry, Vocabulary};
