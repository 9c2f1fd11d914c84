//! Streaming output helpers (made by FontLab https://www.fontlab.com/)

use std::io::Write;

use anyhow::Result;

use crate::catalog::{CatalogEntry, FeatureCount};
use crate::report::RunSummary;

/// Write the run summary as a single `key=value` line.
pub fn write_summary_line(summary: &RunSummary, mut w: impl Write) -> Result<()> {
    writeln!(w, "{summary}")?;
    Ok(())
}

/// Write the run summary as prettified JSON.
pub fn write_summary_json(summary: &RunSummary, mut w: impl Write) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    w.write_all(json.as_bytes())?;
    w.write_all(b"\n")?;
    Ok(())
}

/// Write catalog entries as `path#index<TAB>family<TAB>style` lines.
pub fn write_entries_plain(entries: &[CatalogEntry], mut w: impl Write) -> Result<()> {
    for entry in entries {
        writeln!(
            w,
            "{}\t{}\t{}",
            entry.path_with_index(),
            entry.family,
            entry.style
        )?;
    }
    Ok(())
}

/// Write catalog entries as newline-delimited JSON (NDJSON).
pub fn write_entries_ndjson(entries: &[CatalogEntry], mut w: impl Write) -> Result<()> {
    for item in entries {
        let line = serde_json::to_string(item)?;
        w.write_all(line.as_bytes())?;
        w.write_all(b"\n")?;
    }
    Ok(())
}

/// Write per-tag face counts, one `tag<TAB>count` line each.
pub fn write_feature_counts(counts: &[FeatureCount], mut w: impl Write) -> Result<()> {
    for count in counts {
        writeln!(w, "{}\t{}", count.tag, count.faces)?;
    }
    Ok(())
}
