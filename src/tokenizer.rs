//! Byte-level word and sentence splitting
//!
//! The tokenizer performs a raw split: no case folding, no stemming. Word
//! and sentence delimiters are ASCII byte sets; every other byte (including
//! every byte of a multi-byte UTF-8 sequence) belongs to a word.

use crate::config::{DEFAULT_SENTENCE_DELIMITERS, DEFAULT_WORD_DELIMITERS};
use crate::error::{Error, Result};
use std::fmt;
use std::io::{self, BufRead};

/// Sentences longer than this are split into several sentences.
pub const MAX_SENTENCE_LENGTH: usize = 1000;

/// Delimiter policy shared by corpus reading, stop-word loading and inference.
#[derive(Clone, PartialEq, Eq)]
pub struct Tokenizer {
    words: [bool; 256],
    sentences: [bool; 256],
}

impl Default for Tokenizer {
    fn default() -> Self {
        Tokenizer::from_ascii(DEFAULT_WORD_DELIMITERS, DEFAULT_SENTENCE_DELIMITERS)
    }
}

impl fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set = |s: &[bool; 256]| -> String {
            (0u8..128)
                .filter(|&b| s[b as usize])
                .map(|b| (b as char).escape_default().to_string())
                .collect()
        };
        f.debug_struct("Tokenizer")
            .field("words", &set(&self.words))
            .field("sentences", &set(&self.sentences))
            .finish()
    }
}

impl Tokenizer {
    /// Build a tokenizer from word and sentence delimiter characters.
    ///
    /// Sentence delimiters also end words. Only ASCII delimiters are accepted.
    ///
    /// ```
    /// use word2vec::Tokenizer;
    ///
    /// let t = Tokenizer::new(" ,", ".").unwrap();
    /// let words: Vec<_> = t.words("red, green.blue").collect();
    /// assert_eq!(words, ["red", "green", "blue"]);
    /// assert!(Tokenizer::new("·", ".").is_err());
    /// ```
    pub fn new(word_delimiters: &str, sentence_delimiters: &str) -> Result<Self> {
        for (name, set) in [
            ("word", word_delimiters),
            ("sentence", sentence_delimiters),
        ] {
            if let Some(c) = set.chars().find(|c| !c.is_ascii()) {
                return Err(Error::Configuration(format!(
                    "{name} delimiter {c:?} is not an ASCII character"
                )));
            }
        }
        Ok(Tokenizer::from_ascii(word_delimiters, sentence_delimiters))
    }

    fn from_ascii(word_delimiters: &str, sentence_delimiters: &str) -> Self {
        let mut words = [false; 256];
        let mut sentences = [false; 256];
        for b in sentence_delimiters.bytes() {
            sentences[b as usize] = true;
            words[b as usize] = true;
        }
        for b in word_delimiters.bytes() {
            words[b as usize] = true;
        }
        Tokenizer { words, sentences }
    }

    #[inline]
    pub fn is_word_delimiter(&self, b: u8) -> bool {
        self.words[b as usize]
    }

    #[inline]
    pub fn is_sentence_delimiter(&self, b: u8) -> bool {
        self.sentences[b as usize]
    }

    /// Split a single text into words, ignoring sentence structure.
    pub fn words<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        text.split(move |c: char| c.is_ascii() && self.is_word_delimiter(c as u8))
            .filter(|w| !w.is_empty())
    }

    /// Strip delimiter characters from both ends of `text`.
    pub fn trim<'a>(&self, text: &'a str) -> &'a str {
        text.trim_matches(|c: char| c.is_ascii() && self.is_word_delimiter(c as u8))
    }

    /// Lazily read sentences from a byte stream.
    pub fn sentences<R: BufRead>(&self, reader: R) -> Sentences<'_, R> {
        Sentences {
            tokenizer: self,
            reader,
            align: false,
            limit: None,
            consumed: 0,
            word: Vec::new(),
            sentence: Vec::new(),
            done: false,
        }
    }
}

/// Iterator over the sentences of a stream; each sentence is a non-empty
/// sequence of non-empty words.
pub struct Sentences<'t, R> {
    tokenizer: &'t Tokenizer,
    reader: R,
    align: bool,
    limit: Option<u64>,
    consumed: u64,
    word: Vec<u8>,
    sentence: Vec<String>,
    done: bool,
}

impl<'t, R: BufRead> Sentences<'t, R> {
    /// Skip everything up to and including the first delimiter byte.
    ///
    /// Used when the stream was positioned one byte before a partition
    /// boundary: a partial word left over from the previous partition is
    /// dropped, a word starting exactly on the boundary is kept.
    pub(crate) fn aligned(mut self) -> Self {
        self.align = true;
        self
    }

    /// Stop before starting any word whose first byte is at offset `limit`
    /// or later. A word that started before the limit is read to its end.
    pub(crate) fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    fn take_sentence(&mut self) -> Option<Vec<String>> {
        if self.sentence.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.sentence))
        }
    }
}

fn push_word(word: &mut Vec<u8>, sentence: &mut Vec<String>) {
    if word.is_empty() {
        return;
    }
    let bytes = std::mem::take(word);
    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    };
    sentence.push(text);
}

impl<'t, R: BufRead> Iterator for Sentences<'t, R> {
    type Item = io::Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let buf = match self.reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            if buf.is_empty() {
                self.done = true;
                push_word(&mut self.word, &mut self.sentence);
                return self.take_sentence().map(Ok);
            }

            let mut used = 0;
            let mut ready = false;
            let mut stop = false;
            for &b in buf {
                let pos = self.consumed;
                if let Some(limit) = self.limit {
                    if pos >= limit && self.word.is_empty() {
                        stop = true;
                        break;
                    }
                }
                used += 1;
                self.consumed += 1;

                let delimiter = self.tokenizer.is_word_delimiter(b);
                if self.align {
                    self.align = !delimiter;
                    continue;
                }
                if !delimiter {
                    self.word.push(b);
                    continue;
                }

                push_word(&mut self.word, &mut self.sentence);
                if !self.sentence.is_empty()
                    && (self.tokenizer.is_sentence_delimiter(b)
                        || self.sentence.len() >= MAX_SENTENCE_LENGTH)
                {
                    ready = true;
                    break;
                }
            }
            self.reader.consume(used);

            if stop {
                self.done = true;
                return self.take_sentence().map(Ok);
            }
            if ready {
                return self.take_sentence().map(Ok);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    fn read_all(t: &Tokenizer, text: &str) -> Vec<Vec<String>> {
        t.sentences(Cursor::new(text.as_bytes().to_vec()))
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn splits_words_and_sentences() {
        let t = Tokenizer::default();
        let s = read_all(&t, "The cat sat. The dog ran!\nWho? ");
        assert_eq!(
            s,
            vec![
                vec!["The", "cat", "sat"],
                vec!["The", "dog", "ran"],
                vec!["Who"],
            ]
        );
    }

    #[test]
    fn no_normalization() {
        let t = Tokenizer::default();
        let s = read_all(&t, "Apple apple APPLE");
        assert_eq!(s, vec![vec!["Apple", "apple", "APPLE"]]);
    }

    #[test]
    fn utf8_words_survive() {
        let t = Tokenizer::default();
        let s = read_all(&t, "война и мир. naïve café");
        assert_eq!(s, vec![vec!["война", "и", "мир"], vec!["naïve", "café"]]);
    }

    #[test]
    fn empty_input_has_no_sentences() {
        let t = Tokenizer::default();
        assert!(read_all(&t, "").is_empty());
        assert!(read_all(&t, " ... \n\n !? ").is_empty());
    }

    #[test]
    fn long_sentences_are_split() {
        let t = Tokenizer::default();
        let text = "w ".repeat(MAX_SENTENCE_LENGTH + 5);
        let s = read_all(&t, &text);
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].len(), MAX_SENTENCE_LENGTH);
        assert_eq!(s[1].len(), 5);
    }

    #[test]
    fn aligned_stream_drops_partial_leading_word() {
        let t = Tokenizer::default();
        // Positioned one byte before a boundary that falls inside "quick".
        let s: Vec<_> = t
            .sentences(Cursor::new(b"uick brown fox".to_vec()))
            .aligned()
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(s, vec![vec!["brown", "fox"]]);

        // Positioned on the delimiter right before a word.
        let s: Vec<_> = t
            .sentences(Cursor::new(b" brown fox".to_vec()))
            .aligned()
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(s, vec![vec!["brown", "fox"]]);
    }

    #[test]
    fn limit_finishes_the_current_word() {
        let t = Tokenizer::default();
        // limit falls inside "brown": it is finished, "fox" is not started.
        let s: Vec<_> = t
            .sentences(Cursor::new(b"quick brown fox".to_vec()))
            .with_limit(8)
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(s, vec![vec!["quick", "brown"]]);

        // limit exactly at the start of "fox".
        let s: Vec<_> = t
            .sentences(Cursor::new(b"quick brown fox".to_vec()))
            .with_limit(12)
            .collect::<io::Result<_>>()
            .unwrap();
        assert_eq!(s, vec![vec!["quick", "brown"]]);
    }

    #[test]
    fn trim_strips_delimiters() {
        let t = Tokenizer::default();
        assert_eq!(t.trim("  -- hello world!\n"), "hello world");
        assert_eq!(t.trim("..."), "");
    }

    proptest! {
        #[test]
        fn stream_and_text_splitting_agree(text in "[a-c .,!\n]{0,200}") {
            let t = Tokenizer::default();
            let streamed: Vec<String> = read_all(&t, &text).into_iter().flatten().collect();
            let direct: Vec<&str> = t.words(&text).collect();
            prop_assert_eq!(streamed, direct);
        }

        #[test]
        fn tokens_never_contain_delimiters(text in "\\PC{0,120}") {
            let t = Tokenizer::default();
            for sentence in read_all(&t, &text) {
                prop_assert!(!sentence.is_empty());
                for word in sentence {
                    prop_assert!(!word.is_empty());
                    prop_assert!(!word.bytes().any(|b| t.is_word_delimiter(b)));
                }
            }
        }
    }
}
