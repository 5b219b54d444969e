//! Training corpus: one text file or a directory tree of text files
//!
//! The corpus is treated as the concatenation of its files for the purpose
//! of splitting work between training threads. Each file is still read as
//! an independent stream, so words and sentences never span two files.

use crate::error::{Error, Result};
use crate::tokenizer::{Sentences, Tokenizer};
use std::fs::{self, File};
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Clone, Debug)]
struct CorpusFile {
    path: PathBuf,
    len: u64,
}

/// A set of corpus files with known sizes.
#[derive(Clone, Debug)]
pub struct Corpus {
    files: Vec<CorpusFile>,
    total_bytes: u64,
}

/// A byte range of a single corpus file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub path: PathBuf,
    pub start: u64,
    pub end: u64,
}

impl Corpus {
    /// Open a corpus file, or walk a directory (sorted, recursively) for files.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let meta = fs::metadata(path).map_err(|e| Error::corpus(path, e))?;

        let mut files = Vec::new();
        if meta.is_dir() {
            for entry in WalkDir::new(path).follow_links(true).sort_by_file_name() {
                let entry = entry.map_err(|e| Error::corpus(path, e.into()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let len = entry
                    .metadata()
                    .map_err(|e| Error::corpus(entry.path(), e.into()))?
                    .len();
                files.push(CorpusFile {
                    path: entry.into_path(),
                    len,
                });
            }
        } else {
            files.push(CorpusFile {
                path: path.to_path_buf(),
                len: meta.len(),
            });
        }

        let total_bytes = files.iter().map(|f| f.len).sum();
        Ok(Corpus { files, total_bytes })
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|f| f.path.as_path())
    }

    /// Every segment of the corpus, in order.
    pub fn segments(&self) -> Vec<Segment> {
        self.partition(0, 1)
    }

    /// Segments of partition `id` out of `parts` near-equal byte ranges.
    ///
    /// Partitions are disjoint and together cover the whole corpus. A
    /// partition may be empty when there are more parts than bytes.
    pub fn partition(&self, id: usize, parts: usize) -> Vec<Segment> {
        let parts = parts.max(1) as u128;
        let total = self.total_bytes as u128;
        let start = (total * id as u128 / parts) as u64;
        let end = (total * (id as u128 + 1) / parts) as u64;

        let mut segments = Vec::new();
        let mut offset = 0u64;
        for file in &self.files {
            let file_end = offset + file.len;
            let s = start.max(offset);
            let e = end.min(file_end);
            if s < e {
                segments.push(Segment {
                    path: file.path.clone(),
                    start: s - offset,
                    end: e - offset,
                });
            }
            offset = file_end;
        }
        segments
    }
}

impl Segment {
    /// Open this segment as a sentence stream.
    ///
    /// Words are owned by the segment that contains their first byte.
    pub fn sentences<'t>(&self, tokenizer: &'t Tokenizer) -> Result<Sentences<'t, BufReader<File>>> {
        let mut file = File::open(&self.path).map_err(|e| Error::corpus(&self.path, e))?;
        let origin = self.start.saturating_sub(1);
        if origin > 0 {
            file.seek(SeekFrom::Start(origin))
                .map_err(|e| Error::corpus(&self.path, e))?;
        }

        let stream = tokenizer
            .sentences(BufReader::new(file))
            .with_limit(self.end - origin);
        Ok(if self.start > 0 {
            stream.aligned()
        } else {
            stream
        })
    }

    /// Visit every sentence of the segment.
    pub fn for_each_sentence<F>(&self, tokenizer: &Tokenizer, mut visit: F) -> Result<()>
    where
        F: FnMut(Vec<String>) -> Result<()>,
    {
        for sentence in self.sentences(tokenizer)? {
            let sentence = sentence.map_err(|e| Error::corpus(&self.path, e))?;
            visit(sentence)?;
        }
        Ok(())
    }
}
