//! `.fvecs` / `.bvecs` export
//!
//! Each record is a little-endian `u32` element count followed by the
//! elements: `f32` for `.fvecs`, raw bytes for `.bvecs`. The embedding
//! pipeline writes one float record per text line plus one byte record
//! holding the text itself, so the two files stay aligned by record index.

use crate::error::Result;
use crate::model::Model;
use std::io::{self, BufRead, Write};
use std::marker::PhantomData;
use tracing::warn;

/// An element type storable in a vecs file.
pub trait VecsElement: Copy {
    fn write_le<W: Write>(&self, writer: &mut W) -> io::Result<()>;
}

impl VecsElement for f32 {
    fn write_le<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_le_bytes())
    }
}

impl VecsElement for u8 {
    fn write_le<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&[*self])
    }
}

/// Streaming writer of length-prefixed records.
pub struct VecsWriter<W, T> {
    inner: W,
    records: u64,
    _element: PhantomData<T>,
}

pub type FvecsWriter<W> = VecsWriter<W, f32>;
pub type BvecsWriter<W> = VecsWriter<W, u8>;

impl<W: Write, T: VecsElement> VecsWriter<W, T> {
    pub fn new(inner: W) -> Self {
        VecsWriter {
            inner,
            records: 0,
            _element: PhantomData,
        }
    }

    pub fn write(&mut self, record: &[T]) -> io::Result<()> {
        let len = u32::try_from(record.len()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "record longer than u32::MAX")
        })?;
        self.inner.write_all(&len.to_le_bytes())?;
        for x in record {
            x.write_le(&mut self.inner)?;
        }
        self.records += 1;
        Ok(())
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Outcome of [`export_embeddings`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub vectors: u64,
    pub skipped: u64,
}

/// Embed every non-empty line of `input`.
///
/// Lines are trimmed of word delimiters first. Lines with no known word are
/// logged and skipped; every other line produces one vector record and one
/// text record.
pub fn export_embeddings<R, V, B>(
    model: &Model,
    input: R,
    vectors: &mut FvecsWriter<V>,
    texts: &mut BvecsWriter<B>,
) -> Result<ExportStats>
where
    R: BufRead,
    V: Write,
    B: Write,
{
    let mut stats = ExportStats::default();
    for line in input.lines() {
        let line = line?;
        let text = model.tokenizer().trim(&line);
        if text.is_empty() {
            continue;
        }

        match model.embedding(text) {
            Ok(vector) => {
                vectors.write(&vector)?;
                texts.write(text.as_bytes())?;
                stats.vectors += 1;
            }
            Err(e) if e.is_recoverable() => {
                warn!(text, "skip");
                stats.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }
    vectors.flush()?;
    texts.flush()?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn record_framing() {
        let mut w = FvecsWriter::new(Vec::new());
        w.write(&[1.0, -2.0]).unwrap();
        w.write(&[]).unwrap();
        assert_eq!(w.records(), 2);
        let buf = w.into_inner();

        let mut expected = 2u32.to_le_bytes().to_vec();
        expected.extend_from_slice(&1.0f32.to_le_bytes());
        expected.extend_from_slice(&(-2.0f32).to_le_bytes());
        expected.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(buf, expected);

        let mut b = BvecsWriter::new(Vec::new());
        b.write(b"hi").unwrap();
        assert_eq!(b.into_inner(), [2, 0, 0, 0, b'h', b'i']);
    }

    #[test]
    fn exports_known_lines_and_skips_the_rest() {
        let model = Model::new(
            vec!["red".into(), "blue".into()],
            2,
            vec![1.0, 0.0, 0.0, 1.0],
        )
        .unwrap();
        let input = Cursor::new("  red blue.\n\n...\ngreen\nblue\n");

        let mut vectors = FvecsWriter::new(Vec::new());
        let mut texts = BvecsWriter::new(Vec::new());
        let stats = export_embeddings(&model, input, &mut vectors, &mut texts).unwrap();

        assert_eq!(stats, ExportStats { vectors: 2, skipped: 1 });
        assert_eq!(vectors.records(), 2);
        assert_eq!(texts.records(), 2);

        let v = vectors.into_inner();
        assert_eq!(v.len(), 2 * (4 + 2 * 4));
        assert_eq!(&v[4..8], &0.5f32.to_le_bytes());

        let t = texts.into_inner();
        assert_eq!(&t[0..4], &8u32.to_le_bytes());
        assert_eq!(&t[4..12], b"red blue");
    }
}
