//! Report serialization and persistence
//!
//! The report is a JSON array indented with four spaces. Writes go to a
//! temporary file next to the destination which is then renamed over it,
//! so readers see either the old file or the complete new one.

use crate::activity::AddrActivity;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Serialize the ranked activity list.
pub fn render_report(activities: &[AddrActivity]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    activities
        .serialize(&mut serializer)
        .context("Failed to serialize top addresses")?;
    Ok(out)
}

/// Write `bytes` to `path` all-or-nothing.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;
    file.write_all(bytes)
        .with_context(|| format!("Failed to write report for {:?}", path))?;
    file.as_file()
        .sync_all()
        .with_context(|| format!("Failed to flush report for {:?}", path))?;
    file.persist(path)
        .with_context(|| format!("Failed to move report into place at {:?}", path))?;
    Ok(())
}
