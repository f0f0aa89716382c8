//! Line sources feeding the scan

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::error::{LinehuntError, Result};

/// A blocking, ordered supply of text lines
///
/// `None` means the source is exhausted. An `Err` ends the scan early;
/// the reader treats it as end of stream.
pub trait LineSource {
    fn next_line(&mut self) -> Option<io::Result<String>>;
}

impl<I> LineSource for I
where
    I: Iterator<Item = io::Result<String>>,
{
    fn next_line(&mut self) -> Option<io::Result<String>> {
        self.next()
    }
}

/// Reads lines from any buffered reader
///
/// Line terminators (`\n` or `\r\n`) are stripped and invalid UTF-8 is
/// replaced rather than treated as an error.
pub struct ReaderSource<R> {
    reader: R,
    buf: Vec<u8>,
    lines_read: u64,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(256),
            lines_read: 0,
        }
    }

    /// Number of lines returned so far
    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }
}

impl ReaderSource<BufReader<File>> {
    /// Open a file for line-by-line reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(LinehuntError::SourceRead)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> LineSource for ReaderSource<R> {
    fn next_line(&mut self) -> Option<io::Result<String>> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                self.lines_read += 1;
                // Copy out so the read buffer is never aliased by queued work
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
