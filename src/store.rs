//! Binary model persistence
//!
//! File layout, all integers little-endian:
//!
//! ```text
//! [Header: 20 bytes]
//!   Magic:       4 bytes "W2VB"
//!   Version:     4 bytes (u32)
//!   Vector dim:  4 bytes (u32, > 0)
//!   Vocab size:  8 bytes (u64)
//!
//! [Vocabulary: vocab size entries, in index order]
//!   Word length: 4 bytes (u32)
//!   Word:        variable bytes (UTF-8)
//!
//! [Vectors: vocab size × vector dim × 4 bytes (f32)]
//! ```
//!
//! A file is accepted only if it is consumed exactly; anything short, long
//! or inconsistent is rejected with [`Error::ModelLoad`].

use crate::error::{Error, Result};
use crate::model::Model;
use memmap2::Mmap;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info};

pub const MAGIC: &[u8; 4] = b"W2VB";
pub const VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 20;

/// Longest word accepted when loading.
const MAX_WORD_BYTES: u32 = 1 << 20;

/// Upper bound on speculative allocation before the data has been seen.
const MAX_PREALLOC: usize = 1 << 20;

/// How [`load`] reads the file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadMode {
    /// Stream through a `BufReader`.
    #[default]
    Buffered,
    /// Parse directly from a read-only memory map.
    Mapped,
}

/// Write `model` to `path`, replacing any existing file.
pub fn save<P: AsRef<Path>>(model: &Model, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_to(model, &mut writer)?;
    writer.flush()?;
    info!(
        path = %path.display(),
        words = model.len(),
        dim = model.dim(),
        "model saved"
    );
    Ok(())
}

/// Serialize `model` into any writer.
pub fn write_to<W: Write>(model: &Model, writer: &mut W) -> Result<()> {
    let dim = u32::try_from(model.dim())
        .map_err(|_| Error::Configuration(format!("vector dimension {} too large", model.dim())))?;

    writer.write_all(MAGIC)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    writer.write_all(&dim.to_le_bytes())?;
    writer.write_all(&(model.len() as u64).to_le_bytes())?;

    for word in model.words() {
        let len = u32::try_from(word.len())
            .map_err(|_| Error::Configuration(format!("word of {} bytes too long", word.len())))?;
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(word.as_bytes())?;
    }

    let mut row = Vec::with_capacity(model.dim() * 4);
    for values in model.vectors().chunks_exact(model.dim()) {
        row.clear();
        for v in values {
            row.extend_from_slice(&v.to_le_bytes());
        }
        writer.write_all(&row)?;
    }
    Ok(())
}

/// Load a model saved by [`save`].
///
/// Delimiters are not part of the file: the loaded model splits text with
/// the default [`Tokenizer`](crate::Tokenizer). A model trained with custom
/// delimiters should be given the same policy again through
/// [`Model::with_tokenizer`].
pub fn load<P: AsRef<Path>>(path: P, mode: LoadMode) -> Result<Model> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::model_io(path, e))?;

    let model = match mode {
        LoadMode::Buffered => read_from(BufReader::new(file)),
        LoadMode::Mapped => {
            let len = file.metadata().map_err(|e| Error::model_io(path, e))?.len();
            if len == 0 {
                return Err(Error::ModelLoad("truncated header".into()));
            }
            // SAFETY: the map is read-only and dropped before returning; the
            // model owns copies of everything it keeps.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::model_io(path, e))?;
            read_from(&mmap[..])
        }
    }?;

    debug!(
        path = %path.display(),
        mode = ?mode,
        words = model.len(),
        dim = model.dim(),
        "model loaded"
    );
    Ok(model)
}

/// [`load`], rejecting a model whose dimension is not `expected`.
pub fn load_with_dimension<P: AsRef<Path>>(path: P, mode: LoadMode, expected: usize) -> Result<Model> {
    let model = load(path, mode)?;
    if model.dim() != expected {
        return Err(Error::ModelLoad(format!(
            "model has vector dimension {}, expected {expected}",
            model.dim()
        )));
    }
    Ok(model)
}

/// Parse a complete model from `reader`, which must hold nothing else.
pub fn read_from<R: Read>(mut reader: R) -> Result<Model> {
    let mut header = [0u8; HEADER_SIZE];
    read_section(&mut reader, &mut header, "header")?;

    if &header[0..4] != MAGIC {
        return Err(Error::ModelLoad("not a model file (bad magic)".into()));
    }
    let version = u32_at(&header, 4);
    if version != VERSION {
        return Err(Error::ModelLoad(format!("unsupported format version {version}")));
    }
    let dim = u32_at(&header, 8) as usize;
    if dim == 0 {
        return Err(Error::ModelLoad("vector dimension is zero".into()));
    }
    let vocab_size = usize::try_from(u64_at(&header, 12))
        .map_err(|_| Error::ModelLoad("vocabulary size out of range".into()))?;

    let mut words = Vec::with_capacity(vocab_size.min(MAX_PREALLOC));
    let mut len_buf = [0u8; 4];
    for _ in 0..vocab_size {
        read_section(&mut reader, &mut len_buf, "vocabulary")?;
        let len = u32::from_le_bytes(len_buf);
        if len > MAX_WORD_BYTES {
            return Err(Error::ModelLoad(format!("word length {len} out of range")));
        }
        let mut bytes = vec![0u8; len as usize];
        read_section(&mut reader, &mut bytes, "vocabulary")?;
        let word = String::from_utf8(bytes)
            .map_err(|_| Error::ModelLoad(format!("word {} is not valid UTF-8", words.len())))?;
        words.push(word);
    }

    let values = vocab_size
        .checked_mul(dim)
        .ok_or_else(|| Error::ModelLoad("vector matrix size overflows".into()))?;
    let mut vectors = Vec::with_capacity(values.min(MAX_PREALLOC));
    let mut row = vec![0u8; dim * 4];
    for _ in 0..vocab_size {
        read_section(&mut reader, &mut row, "vectors")?;
        vectors.extend(
            row.chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        );
    }

    let mut rest = [0u8; 1];
    let extra = reader
        .read(&mut rest)
        .map_err(|e| Error::ModelLoad(format!("cannot read past vectors: {e}")))?;
    if extra != 0 {
        return Err(Error::ModelLoad("unexpected trailing bytes".into()));
    }

    Model::new(words, dim, vectors)
}

fn read_section<R: Read>(reader: &mut R, buf: &mut [u8], section: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::ModelLoad(format!("truncated {section}")),
        _ => Error::ModelLoad(format!("cannot read {section}: {e}")),
    })
}

fn u32_at(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn u64_at(buf: &[u8], at: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(b)
}
