//! Load the source → historian tag name mapping from a two-column CSV.

use anyhow::{Context, Result, bail};
use std::path::Path;

use crate::types::NameMap;

/// Header cells recognised (and skipped) in the first row.
const HEADER_NAMES: [&str; 3] = ["source", "tagname", "datalog"];

/// Read `source,target` rows. Blank lines and `#` comments are skipped; extra columns ignored.
pub fn load_name_map(path: &Path) -> Result<NameMap> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;

    let mut map = NameMap::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("row {} of {}", line + 1, path.display()))?;
        let (Some(source), Some(target)) = (row.get(0), row.get(1)) else {
            if row.iter().all(str::is_empty) {
                continue;
            }
            bail!("row {} of {} needs two columns", line + 1, path.display());
        };
        if line == 0
            && HEADER_NAMES
                .iter()
                .any(|h| source.eq_ignore_ascii_case(h))
        {
            continue;
        }
        if source.is_empty() || target.is_empty() {
            continue;
        }
        map.insert(source.to_string(), target.to_string());
    }
    Ok(map)
}
