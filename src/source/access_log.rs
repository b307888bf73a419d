//! Common Log Format reader
//!
//! Lines look like
//! `199.72.81.55 - - [01/Jul/1995:00:00:01 -0400] "GET /history/apollo/ HTTP/1.0" 200 6245`.
//! Only the host and the bracketed timestamp are extracted.

use chrono::DateTime;
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::analytics::models::LogRecord;
use crate::error::{Error, Result};

const IDENTITY_SEPARATOR: &str = " - - [";
const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Parse a single log line into its host and timestamp
pub fn parse_line(line: &str) -> std::result::Result<LogRecord, String> {
    let (host, rest) = line
        .split_once(IDENTITY_SEPARATOR)
        .ok_or_else(|| "missing `- - [` after host".to_string())?;

    if host.is_empty() {
        return Err("empty host".to_string());
    }

    let (stamp, request) = rest
        .split_once(']')
        .ok_or_else(|| "unterminated timestamp".to_string())?;

    match request.strip_prefix(' ') {
        Some(request) if !request.is_empty() => {}
        _ => return Err("missing request after timestamp".to_string()),
    }

    let timestamp = DateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
        .map_err(|e| format!("bad timestamp {stamp:?}: {e}"))?;

    Ok(LogRecord {
        host: host.to_string(),
        timestamp,
    })
}

/// Forward-only iterator of records read from a line stream
///
/// Bytes are decoded as Latin-1, which maps every byte to a char, so stray
/// high bytes in old logs never break decoding.
pub struct AccessLog<R> {
    reader: R,
    line: u64,
    buf: Vec<u8>,
}

impl<R: BufRead> AccessLog<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: Vec::with_capacity(256),
        }
    }

    /// Number of lines read so far
    pub fn lines_read(&self) -> u64 {
        self.line
    }
}

impl AccessLog<Box<dyn BufRead>> {
    /// Open a plain or gzip-compressed (`.gz`) log file
    ///
    /// Every gzip member is decoded, so logs joined with `cat` or rotated
    /// into a multi-member archive are read to the end.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let is_gzip = path.extension().is_some_and(|ext| ext == "gz");

        let reader: Box<dyn BufRead> = if is_gzip {
            Box::new(BufReader::new(MultiGzDecoder::new(BufReader::new(file))))
        } else {
            Box::new(BufReader::new(file))
        };

        Ok(Self::new(reader))
    }
}

impl<R: BufRead> Iterator for AccessLog<R> {
    type Item = Result<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();

        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => return None,
            Ok(_) => {}
            Err(e) => return Some(Err(Error::Io(e))),
        }
        self.line += 1;

        while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
            self.buf.pop();
        }
        let text: String = self.buf.iter().map(|&b| char::from(b)).collect();

        Some(parse_line(&text).map_err(|reason| Error::MalformedRecord {
            line: self.line,
            reason,
        }))
    }
}
