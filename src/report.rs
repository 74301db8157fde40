//! Count reports and report sinks.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::counter::Counters;
use crate::{Error, Result};

/// A snapshot of the session counters at a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountReport {
    /// Frame the snapshot was taken at.
    pub frame: u64,

    /// Tally per category label.
    pub counts: BTreeMap<String, u64>,

    /// Sum of all tallies.
    pub total: u64,
}

impl CountReport {
    pub fn from_counters(counters: &Counters, frame: u64) -> Self {
        Self {
            frame,
            counts: counters.iter().map(|(label, n)| (label.to_string(), n)).collect(),
            total: counters.total(),
        }
    }
}

/// Destination for count reports.
pub trait ReportSink {
    /// Publish one report.
    fn publish(&mut self, report: &CountReport) -> Result<()>;

    /// Flush buffered reports.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: ReportSink + ?Sized> ReportSink for Box<S> {
    fn publish(&mut self, report: &CountReport) -> Result<()> {
        (**self).publish(report)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Sink that drops every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReport;

impl ReportSink for NullReport {
    fn publish(&mut self, _report: &CountReport) -> Result<()> {
        Ok(())
    }
}

/// Sink that keeps every report in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryReport {
    pub reports: Vec<CountReport>,
}

impl MemoryReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent report.
    pub fn last(&self) -> Option<&CountReport> {
        self.reports.last()
    }
}

impl ReportSink for MemoryReport {
    fn publish(&mut self, report: &CountReport) -> Result<()> {
        self.reports.push(report.clone());
        Ok(())
    }
}

/// Writer for count reports as JSON lines.
///
/// Each line is one serialized [`CountReport`]:
/// `{"frame":10,"counts":{"female":1,"male":2},"total":3}`
pub struct JsonLinesReport {
    writer: BufWriter<File>,
    written: usize,
}

impl JsonLinesReport {
    /// Create (or truncate) the report file, creating parent directories.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                Error::IoError(std::io::Error::new(
                    e.kind(),
                    format!("failed to create report folder: {}", e),
                ))
            })?;
        }

        let file = File::create(path).map_err(|e| {
            Error::IoError(std::io::Error::new(
                e.kind(),
                format!("failed to create report file: {}", e),
            ))
        })?;

        Ok(Self {
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    /// Number of reports written so far.
    pub fn written(&self) -> usize {
        self.written
    }
}

impl ReportSink for JsonLinesReport {
    fn publish(&mut self, report: &CountReport) -> Result<()> {
        serde_json::to_writer(&mut self.writer, report)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(Error::IoError)
    }
}

impl Drop for JsonLinesReport {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::CategorySet;
    use tempfile::TempDir;

    fn report(frame: u64, female: u64, male: u64) -> CountReport {
        let mut counts = BTreeMap::new();
        counts.insert("female".to_string(), female);
        counts.insert("male".to_string(), male);
        CountReport {
            frame,
            counts,
            total: female + male,
        }
    }

    #[test]
    fn test_from_counters_zeroed() {
        let counters = Counters::new(CategorySet::default());
        let r = CountReport::from_counters(&counters, 7);

        assert_eq!(r.frame, 7);
        assert_eq!(r.total, 0);
        assert_eq!(r.counts.len(), 2);
        assert_eq!(r.counts["female"], 0);
    }

    #[test]
    fn test_memory_report_collects() {
        let mut sink = MemoryReport::new();
        sink.publish(&report(10, 1, 0)).unwrap();
        sink.publish(&report(20, 1, 2)).unwrap();

        assert_eq!(sink.reports.len(), 2);
        assert_eq!(sink.last().unwrap().total, 3);
    }

    #[test]
    fn test_json_lines_report_writes_one_line_per_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("counts.jsonl");

        {
            let mut sink = JsonLinesReport::create(&path).unwrap();
            sink.publish(&report(10, 1, 0)).unwrap();
            sink.publish(&report(20, 2, 3)).unwrap();
            assert_eq!(sink.written(), 2);
        }

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#"{"frame":10,"counts":{"female":1,"male":0},"total":1}"#
        );

        let parsed: CountReport = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed, report(20, 2, 3));
    }
}
