//! Pluggable tokenization.
//!
//! A [`Tokenizer`] is a stateful consumer of lines: feed one line, drain the
//! tokens it produced, repeat. Tokenizers are cloned per file so several
//! files can be tokenized concurrently with the same strategy.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Line-fed token producer.
pub trait Tokenizer: Send + Sync {
    /// Resets internal state and accepts one line (no trailing newline).
    fn feed_line(&mut self, line: &str);

    /// Notifies end of file, for tokenizers that buffer across lines.
    fn feed_eof(&mut self) {}

    /// Produces the next token, or `None` when the current input is drained.
    fn next_token(&mut self) -> Option<String>;

    /// Produces an independent instance with the same strategy.
    fn clone_box(&self) -> Box<dyn Tokenizer>;
}

/// The default tokenizer: a token is a maximal run of ASCII-alphanumeric
/// bytes. Case is preserved; no stemming.
#[derive(Debug, Default)]
pub struct WordTokenizer {
    line: Vec<u8>,
    cursor: usize,
}

impl Tokenizer for WordTokenizer {
    fn feed_line(&mut self, line: &str) {
        self.line.clear();
        self.line.extend_from_slice(line.as_bytes());
        self.cursor = 0;
    }

    fn next_token(&mut self) -> Option<String> {
        while self.cursor < self.line.len() && !self.line[self.cursor].is_ascii_alphanumeric() {
            self.cursor += 1;
        }
        if self.cursor >= self.line.len() {
            return None;
        }

        let start = self.cursor;
        while self.cursor < self.line.len() && self.line[self.cursor].is_ascii_alphanumeric() {
            self.cursor += 1;
        }
        // alphanumeric ASCII runs are always valid UTF-8
        Some(String::from_utf8_lossy(&self.line[start..self.cursor]).into_owned())
    }

    fn clone_box(&self) -> Box<dyn Tokenizer> {
        Box::new(WordTokenizer::default())
    }
}

/// Tokenizes a whole file line by line into a token set.
///
/// A file that cannot be opened or read is treated as having no tokens; the
/// failure is logged and the caller's bookkeeping proceeds unchanged so a
/// later modification event can retry.
pub(crate) fn file_tokens(path: &Path, mut tokenizer: Box<dyn Tokenizer>) -> HashSet<String> {
    let mut tokens = HashSet::new();

    let file = match File::open(path) {
        Ok(file) => file,
        Err(error) => {
            tracing::warn!("token scan skipped path={} error={}", path.display(), error);
            return tokens;
        }
    };

    let mut reader = BufReader::new(file);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(error) => {
                tracing::warn!("token scan truncated path={} error={}", path.display(), error);
                break;
            }
        }
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        tokenizer.feed_line(&String::from_utf8_lossy(&line));
        while let Some(token) = tokenizer.next_token() {
            tokens.insert(token);
        }
    }

    tokenizer.feed_eof();
    while let Some(token) = tokenizer.next_token() {
        tokens.insert(token);
    }

    tokens
}
