//! Run reporting: progress lines and the closing summary
//! (made by FontLab https://www.fontlab.com/)

use std::fmt;
use std::io::Write;
use std::time::Instant;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::features::FaceLayout;
use crate::output::{write_summary_json, write_summary_line};
use crate::tags::tag_to_string;

/// Counters for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub files_scanned: u64,
    pub faces_opened: u64,
    pub faces_cataloged: u64,
    pub feature_records_written: u64,
    pub open_failures: u64,
    pub duplicates: u64,
    pub faces_without_layout: u64,
    /// Files whose path is not valid UTF-8 and so cannot be a catalog key.
    pub non_utf8_paths: u64,
    pub elapsed_secs: f64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "files_scanned={} faces_opened={} faces_cataloged={} feature_records_written={} \
             open_failures={} duplicates={} faces_without_layout={} non_utf8_paths={} \
             elapsed={:.3}s",
            self.files_scanned,
            self.faces_opened,
            self.faces_cataloged,
            self.feature_records_written,
            self.open_failures,
            self.duplicates,
            self.faces_without_layout,
            self.non_utf8_paths,
            self.elapsed_secs,
        )
    }
}

/// What became of an opened face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceOutcome {
    /// Entry written together with this many feature rows.
    Cataloged(usize),
    /// Key already present; nothing written.
    Duplicate,
    /// No layout, or layout without features.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryFormat {
    #[default]
    Plain,
    Json,
}

/// Observes the pipeline and writes one line per face plus a final summary.
///
/// Write failures on the sink are logged once and otherwise ignored; they
/// never abort a run.
pub struct RunReporter<W: Write> {
    out: W,
    summary: RunSummary,
    started: Instant,
    format: SummaryFormat,
    sink_failed: bool,
}

impl<W: Write> RunReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            summary: RunSummary::default(),
            started: Instant::now(),
            format: SummaryFormat::Plain,
            sink_failed: false,
        }
    }

    pub fn with_summary_format(mut self, format: SummaryFormat) -> Self {
        self.format = format;
        self
    }

    pub fn file_scanned(&mut self) {
        self.summary.files_scanned += 1;
    }

    pub fn face_open_failed(&mut self) {
        self.summary.open_failures += 1;
    }

    pub fn non_utf8_path(&mut self) {
        self.summary.non_utf8_paths += 1;
    }

    pub fn face(&mut self, filename: &str, index: u32, layout: &FaceLayout, outcome: FaceOutcome) {
        self.summary.faces_opened += 1;
        if !layout.has_layout() {
            self.summary.faces_without_layout += 1;
        }

        let layout_flag = if layout.has_layout() { "yes" } else { "no" };
        let line = match outcome {
            FaceOutcome::Cataloged(written) => {
                self.summary.faces_cataloged += 1;
                self.summary.feature_records_written += written as u64;
                let tags: Vec<String> = layout
                    .catalog_tags()
                    .into_iter()
                    .flatten()
                    .copied()
                    .map(tag_to_string)
                    .collect();
                format!(
                    "{filename}#{index}\tlayout={layout_flag}\tfeatures={}",
                    tags.join(",")
                )
            }
            FaceOutcome::Duplicate => {
                self.summary.duplicates += 1;
                format!("{filename}#{index}\tlayout={layout_flag}\tduplicate")
            }
            FaceOutcome::Skipped => format!("{filename}#{index}\tlayout={layout_flag}"),
        };

        self.emit(&line);
    }

    /// Current counters, elapsed time included.
    pub fn snapshot(&self) -> RunSummary {
        let mut summary = self.summary.clone();
        summary.elapsed_secs = self.started.elapsed().as_secs_f64();
        summary
    }

    /// Write the summary and hand back the final counters.
    pub fn finish(mut self) -> RunSummary {
        let summary = self.snapshot();
        let written = match self.format {
            SummaryFormat::Plain => write_summary_line(&summary, &mut self.out),
            SummaryFormat::Json => write_summary_json(&summary, &mut self.out),
        };
        if let Err(err) = written.and_then(|_| Ok(self.out.flush()?)) {
            self.sink_failure(&err);
        }
        summary
    }

    fn emit(&mut self, line: &str) {
        if self.sink_failed {
            return;
        }
        if let Err(err) = writeln!(self.out, "{line}") {
            self.sink_failure(&err);
        }
    }

    fn sink_failure(&mut self, err: &dyn fmt::Display) {
        if !self.sink_failed {
            warn!("run log output failed: {err}");
            self.sink_failed = true;
        }
    }
}
