//! Line-oriented statement splitting
//!
//! A statement ends exactly at a line whose last byte is `;`. Lines are kept
//! as bytes since binary literals need not be valid UTF-8.

use std::io::{self, BufRead};

/// Iterator over the complete statements of a dump stream.
///
/// Each yielded statement keeps a trailing `\n` per line. Blank lines are
/// dropped. Whatever remains after the last terminated statement is
/// available through [`StatementSplitter::remainder`] once the iterator is
/// exhausted; it is never yielded.
pub struct StatementSplitter<R> {
    reader: R,
    buffer: Vec<u8>,
    line: Vec<u8>,
    lines_read: u64,
}

impl<R: BufRead> StatementSplitter<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            line: Vec::new(),
            lines_read: 0,
        }
    }

    /// Unterminated text left at end of input
    pub fn remainder(&self) -> &[u8] {
        &self.buffer
    }

    /// Whether the remainder holds anything besides `--` comments
    pub fn remainder_has_sql(&self) -> bool {
        self.buffer
            .split(|&b| b == b'\n')
            .map(|line| line.trim_ascii_start())
            .any(|line| !line.is_empty() && !line.starts_with(b"--"))
    }

    /// Lines consumed so far; after a yield, the line the statement ended on
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }
}

impl<R: BufRead> Iterator for StatementSplitter<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_until(b'\n', &mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e)),
            }
            self.lines_read += 1;

            if self.line.last() == Some(&b'\n') {
                self.line.pop();
                if self.line.last() == Some(&b'\r') {
                    self.line.pop();
                }
            }
            if self.line.is_empty() {
                continue;
            }

            self.buffer.extend_from_slice(&self.line);
            self.buffer.push(b'\n');

            if self.line.last() == Some(&b';') {
                return Some(Ok(std::mem::take(&mut self.buffer)));
            }
        }
    }
}
