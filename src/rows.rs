use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::model::TabularRecord;

/// Reads a tabular dataset stored as a JSON array of objects.
pub fn load_rows(path: impl AsRef<Path>) -> Result<Vec<TabularRecord>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening rows {}", path.display()))?;
    let rows: Vec<TabularRecord> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing rows {}", path.display()))?;
    Ok(rows)
}
