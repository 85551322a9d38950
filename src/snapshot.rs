use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::course::RawCourse;

/// Replace the snapshot at `path` with `courses`.
///
/// Writes to a sibling `.tmp` file first and renames it over the target.
pub fn write_snapshot(path: &Path, courses: &[RawCourse]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let json = serde_json::to_string_pretty(courses)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("Failed to write {:?}", tmp))?;
    fs::rename(&tmp, path).with_context(|| format!("Failed to replace {:?}", path))?;
    info!("Saved {} courses to {:?}", courses.len(), path);
    Ok(())
}

pub fn read_snapshot(path: &Path) -> Result<Vec<RawCourse>> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let courses: Vec<RawCourse> = serde_json::from_str(&text)
        .with_context(|| format!("Malformed snapshot {:?}", path))?;
    Ok(courses)
}
