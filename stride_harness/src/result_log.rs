//! Append-only CSV log of transmissions.
//!
//! The header is written once when the log is created. Every record is then
//! appended with its own open-append-flush-close cycle, so a crash loses at
//! most the in-flight record and readers can tail the file mid-run.

use crate::error::HarnessError;
use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Column names, in file order.
pub const HEADER: [&str; 16] = [
    "experiment_start_time",
    "cache_evict_interval",
    "runtime",
    "stride_size",
    "pattern",
    "repetition",
    "received_pattern",
    "bit_errors",
    "duration_ms",
    "send_cycles",
    "send_ns",
    "cached_count",
    "avg_cycles",
    "min_cycles",
    "max_cycles",
    "cycle_values",
];

/// One transmission attempt, as logged.
#[derive(Debug, Clone, PartialEq)]
pub struct TransmissionRecord {
    /// Run start, seconds since the Unix epoch
    pub experiment_start_time: f64,
    pub cache_evict_interval: u32,
    pub runtime: String,
    pub stride_size: u32,
    pub pattern: String,
    /// 1-based
    pub repetition: u32,
    pub received_pattern: String,
    pub bit_errors: usize,
    pub duration_ms: f64,
    pub send_cycles: String,
    pub send_ns: String,
    pub cached_count: String,
    pub avg_cycles: String,
    pub min_cycles: String,
    pub max_cycles: String,
    pub cycle_values: String,
}

impl TransmissionRecord {
    /// Formats the record as one CSV line (without the newline).
    pub fn to_row(&self) -> String {
        let fields: [Cow<'_, str>; 16] = [
            Cow::Owned(self.experiment_start_time.to_string()),
            Cow::Owned(self.cache_evict_interval.to_string()),
            escape_field(&self.runtime),
            Cow::Owned(self.stride_size.to_string()),
            escape_field(&self.pattern),
            Cow::Owned(self.repetition.to_string()),
            escape_field(&self.received_pattern),
            Cow::Owned(self.bit_errors.to_string()),
            Cow::Owned(format!("{:.2}", self.duration_ms)),
            escape_field(&self.send_cycles),
            escape_field(&self.send_ns),
            escape_field(&self.cached_count),
            escape_field(&self.avg_cycles),
            escape_field(&self.min_cycles),
            escape_field(&self.max_cycles),
            escape_field(&self.cycle_values),
        ];
        fields.join(",")
    }
}

/// Quotes a field containing a delimiter, quote or line break (RFC 4180).
fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Durable, append-only transmission log.
#[derive(Debug)]
pub struct ResultLog {
    path: PathBuf,
    rows_written: u64,
}

impl ResultLog {
    /// Creates (or truncates) the log and writes the header row.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::create(&path).map_err(|source| HarnessError::ResultLog {
            path: path.clone(),
            source,
        })?;
        writeln!(file, "{}", HEADER.join(","))
            .and_then(|_| file.flush())
            .map_err(|source| HarnessError::ResultLog {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            path,
            rows_written: 0,
        })
    }

    /// Appends one record and flushes it before returning.
    pub fn append(&mut self, record: &TransmissionRecord) -> Result<(), HarnessError> {
        let row = record.to_row();
        let result = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .and_then(|mut file| {
                writeln!(file, "{}", row)?;
                file.flush()
            });
        result.map_err(|source| HarnessError::ResultLog {
            path: self.path.clone(),
            source,
        })?;
        self.rows_written += 1;
        Ok(())
    }

    /// Data rows appended so far.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Location of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(repetition: u32) -> TransmissionRecord {
        TransmissionRecord {
            experiment_start_time: 1_700_000_000.25,
            cache_evict_interval: 5,
            runtime: "runc".to_string(),
            stride_size: 32,
            pattern: "0101".to_string(),
            repetition,
            received_pattern: "0111".to_string(),
            bit_errors: 1,
            duration_ms: 102.456,
            send_cycles: "21000".to_string(),
            send_ns: "7200".to_string(),
            cached_count: "3".to_string(),
            avg_cycles: "120".to_string(),
            min_cycles: "90".to_string(),
            max_cycles: "250000".to_string(),
            cycle_values: "90 250000 100 95".to_string(),
        }
    }

    #[test]
    fn test_row_format() {
        assert_eq!(
            record(2).to_row(),
            concat!(
                "1700000000.25,5,runc,32,0101,2,0111,1,102.46,21000,7200,",
                "3,120,90,250000,90 250000 100 95",
            )
        );
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_header_then_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");

        let mut log = ResultLog::create(&path).unwrap();
        log.append(&record(1)).unwrap();
        log.append(&record(2)).unwrap();
        assert_eq!(log.rows_written(), 2);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER.join(","));
        assert!(lines[1].contains(",1,0111,"));
        assert!(lines[2].contains(",2,0111,"));
    }

    #[test]
    fn test_rows_visible_before_log_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tail.csv");

        let mut log = ResultLog::create(&path).unwrap();
        log.append(&record(1)).unwrap();

        // Still holding `log`: the row must already be on disk.
        let text = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn test_create_truncates_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        std::fs::write(&path, "stale\nrows\nhere\n").unwrap();

        ResultLog::create(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("results.csv");
        assert!(matches!(
            ResultLog::create(&path),
            Err(HarnessError::ResultLog { .. })
        ));
    }
}
