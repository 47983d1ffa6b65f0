//! Append-only CSV persistence of probe outcomes (spec.md §6).
//!
//! Three columns, no header: timestamp, hard timeout, idle timeout.

use std::path::Path;

use chrono::Local;

pub fn append_result(path: &Path, hard_timeout: u64, idle_timeout: u64) -> anyhow::Result<()> {
    let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

    // Comma-free so the timestamp column never needs CSV quoting.
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S %z").to_string();
    writer.write_record([timestamp.as_str(), &hard_timeout.to_string(), &idle_timeout.to_string()])?;
    writer.flush()?;

    Ok(())
}
