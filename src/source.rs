//! Book level source abstraction.
//!
//! The slippage core only needs a stream of [`BookLevel`] records; where they
//! come from (object storage tables, vendor files, test fixtures) is an
//! ingestion concern. Filtering by date, exchange and pair happens before the
//! levels reach this crate.
//!
//! # Implementing Custom Sources
//!
//! ```ignore
//! use lob_slippage::source::{LevelSource, SourceMetadata};
//! use lob_slippage::{BookLevel, Result};
//!
//! struct TableSource {
//!     rows: Vec<BookLevel>,
//!     metadata: SourceMetadata,
//! }
//!
//! impl LevelSource for TableSource {
//!     type LevelIter = std::vec::IntoIter<Result<BookLevel>>;
//!
//!     fn levels(self) -> Result<Self::LevelIter> {
//!         let rows: Vec<Result<BookLevel>> = self.rows.into_iter().map(Ok).collect();
//!         Ok(rows.into_iter())
//!     }
//!
//!     fn metadata(&self) -> &SourceMetadata {
//!         &self.metadata
//!     }
//! }
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{Result, SlippageError};
use crate::types::BookLevel;

// ============================================================================
// Source Metadata
// ============================================================================

/// Metadata about a level source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMetadata {
    /// Exchange name (e.g., "BINANCE")
    pub exchange: Option<String>,

    /// Trading pair (e.g., "ETH-USDT")
    pub pair: Option<String>,

    /// Trading date in YYYY-MM-DD format
    pub date: Option<String>,

    /// Original file path (if loaded from file)
    pub file_path: Option<PathBuf>,

    /// Provider name (e.g., "jsonl", "memory")
    pub provider: Option<String>,

    /// Estimated level count (for progress tracking)
    pub estimated_levels: Option<u64>,
}

impl SourceMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }

    pub fn with_pair(mut self, pair: impl Into<String>) -> Self {
        self.pair = Some(pair.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_file_path(mut self, path: impl AsRef<Path>) -> Self {
        self.file_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_estimated_levels(mut self, count: u64) -> Self {
        self.estimated_levels = Some(count);
        self
    }

    /// Extract metadata from a file path.
    ///
    /// Recognised file name patterns:
    /// - `BINANCE_ETH-USDT_2023-01-05.jsonl` → exchange, pair and date
    /// - `BINANCE_ETH-USDT.jsonl` → exchange and pair
    /// - `ETH-USDT.jsonl` → pair only
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut metadata = Self::new().with_file_path(path);

        let Some(stem) = path.file_name().and_then(|n| n.to_str()) else {
            return metadata;
        };
        let base = stem.split('.').next().unwrap_or(stem);
        let mut parts: Vec<&str> = base.split('_').filter(|p| !p.is_empty()).collect();

        if let Some(last) = parts.last() {
            if looks_like_date(last) {
                metadata.date = Some(last.to_string());
                parts.pop();
            }
        }

        match parts.as_slice() {
            [pair] => metadata.pair = Some(pair.to_string()),
            [exchange, pair, ..] => {
                metadata.exchange = Some(exchange.to_string());
                metadata.pair = Some(pair.to_string());
            }
            [] => {}
        }

        metadata
    }
}

fn looks_like_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
}

// ============================================================================
// Level Source Trait
// ============================================================================

/// Trait for book level sources.
///
/// `levels()` consumes the source for single-pass iteration. Each item is a
/// `Result` so decoding failures surface per record instead of aborting the
/// whole stream.
pub trait LevelSource {
    /// The iterator type for levels.
    type LevelIter: Iterator<Item = Result<BookLevel>>;

    /// Consume the source and return an iterator over levels.
    fn levels(self) -> Result<Self::LevelIter>;

    /// Get metadata about the source.
    fn metadata(&self) -> &SourceMetadata;
}

// ============================================================================
// Vector Source (for testing)
// ============================================================================

/// An in-memory source.
///
/// # Example
///
/// ```
/// use lob_slippage::source::{LevelSource, SourceMetadata, VecSource};
/// use lob_slippage::BookLevel;
///
/// let source = VecSource::new(vec![
///     BookLevel::bid(1, 99.5, 2.0),
///     BookLevel::ask(1, 100.5, 3.0),
/// ])
/// .with_metadata(SourceMetadata::new().with_pair("ETH-USDT"));
///
/// let levels: Vec<_> = source.levels().unwrap().collect::<Result<_, _>>().unwrap();
/// assert_eq!(levels.len(), 2);
/// ```
pub struct VecSource {
    levels: Vec<BookLevel>,
    metadata: SourceMetadata,
}

impl VecSource {
    pub fn new(levels: Vec<BookLevel>) -> Self {
        Self {
            metadata: SourceMetadata::new()
                .with_provider("memory")
                .with_estimated_levels(levels.len() as u64),
            levels,
        }
    }

    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl LevelSource for VecSource {
    type LevelIter = VecLevelIter;

    fn levels(self) -> Result<Self::LevelIter> {
        Ok(VecLevelIter {
            inner: self.levels.into_iter(),
        })
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

/// Iterator returned by [`VecSource`].
pub struct VecLevelIter {
    inner: std::vec::IntoIter<BookLevel>,
}

impl Iterator for VecLevelIter {
    type Item = Result<BookLevel>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(Ok)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

// ============================================================================
// JSON Lines Source
// ============================================================================

/// Reads one JSON object per line:
///
/// ```text
/// {"timestamp":1672876800000,"side":"bid","price":1250.31,"quantity":4.2}
/// ```
///
/// Blank lines are skipped. Undecodable lines yield
/// [`SlippageError::Parse`] with the 1-based line number.
pub struct JsonLinesSource<R: BufRead> {
    reader: R,
    metadata: SourceMetadata,
}

impl JsonLinesSource<BufReader<File>> {
    /// Open a JSON lines file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            SlippageError::Io(format!("failed to open {}: {e}", path.display()))
        })?;
        let metadata = SourceMetadata::from_path(path).with_provider("jsonl");
        Ok(Self {
            reader: BufReader::new(file),
            metadata,
        })
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    /// Wrap any buffered reader.
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            metadata: SourceMetadata::new().with_provider("jsonl"),
        }
    }

    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl<R: BufRead> LevelSource for JsonLinesSource<R> {
    type LevelIter = JsonLinesIter<R>;

    fn levels(self) -> Result<Self::LevelIter> {
        Ok(JsonLinesIter {
            reader: self.reader,
            buf: Vec::new(),
            line_no: 0,
            failed: false,
        })
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

/// Iterator returned by [`JsonLinesSource`].
///
/// A line that is not valid UTF-8 or not a valid level is a `Parse` error for
/// that line only. A failed read is `Io` and ends the stream.
pub struct JsonLinesIter<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
    failed: bool,
}

impl<R: BufRead> Iterator for JsonLinesIter<R> {
    type Item = Result<BookLevel>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    self.failed = true;
                    return Some(Err(SlippageError::from(e)));
                }
            }
            self.line_no += 1;

            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line,
                Err(e) => {
                    return Some(Err(SlippageError::Parse {
                        line: self.line_no,
                        reason: format!("invalid UTF-8: {e}"),
                    }))
                }
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            return Some(
                serde_json::from_str::<BookLevel>(trimmed).map_err(|e| SlippageError::Parse {
                    line: self.line_no,
                    reason: e.to_string(),
                }),
            );
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
