//! Hand-off of combined records to reporting.
//!
//! Charting, resampling and dashboards live outside this crate. A
//! [`MetricsSink`] is the point where combined records leave it.

use std::io::{BufWriter, Write};

use crate::error::Result;
use crate::types::CombinedRecord;

/// Destination for combined records.
pub trait MetricsSink {
    /// Write one record.
    fn write_record(&mut self, record: &CombinedRecord) -> Result<()>;

    /// Flush buffered output.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Write every record in order, then flush. Returns the count written.
    fn write_all<'a, I>(&mut self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a CombinedRecord>,
        Self: Sized,
    {
        let mut written = 0;
        for record in records {
            self.write_record(record)?;
            written += 1;
        }
        self.flush()?;
        Ok(written)
    }
}

/// Writes one JSON object per record, newline separated.
pub struct JsonLinesSink<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| crate::SlippageError::Io(e.error().to_string()))
    }
}

impl<W: Write> MetricsSink for JsonLinesSink<W> {
    fn write_record(&mut self, record: &CombinedRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    pub records: Vec<CombinedRecord>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsSink for VecSink {
    fn write_record(&mut self, record: &CombinedRecord) -> Result<()> {
        self.records.push(*record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ts: i64) -> CombinedRecord {
        CombinedRecord {
            timestamp: ts,
            buy_currency_slippage: 0.5,
            buy_dollar_slippage: 50.0,
            buy_percent_slippage: 0.0005,
            sell_currency_slippage: 0.25,
            sell_dollar_slippage: 25.0,
            sell_percent_slippage: 0.00025,
        }
    }

    #[test]
    fn test_jsonl_sink_writes_one_line_per_record() {
        let mut sink = JsonLinesSink::new(Vec::new());
        let written = sink.write_all(&[record(1), record(2)]).unwrap();
        assert_eq!(written, 2);

        let bytes = sink.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let back: CombinedRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(back, record(2));
        assert!(lines[0].contains("\"buy_percent_slippage\":0.0005"));
    }

    #[test]
    fn test_vec_sink() {
        let mut sink = VecSink::new();
        sink.write_all(&[record(7)]).unwrap();
        assert_eq!(sink.records, vec![record(7)]);
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"))
        }
    }

    #[test]
    fn test_jsonl_sink_write_failure_is_io() {
        let mut sink = JsonLinesSink::new(ClosedPipe);
        let err = sink.write_all(&[record(1), record(2)]).unwrap_err();
        assert!(matches!(err, crate::SlippageError::Io(_)));
        assert!(err.is_fatal());
    }
}
