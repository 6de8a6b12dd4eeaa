//! Time-bucketed shading override table.
//!
//! The table is wide: one row per shading sample with a `link_id` column and
//! one value column per half-month/hour bucket (`MMDD_HH_me`). Only the
//! bucket selected for the request time is read; samples are averaged per
//! link and clamped to `[0, 1]`.

use std::fs::File;
use std::path::Path;

use hashbrown::HashMap;
use log::warn;

use crate::model::season::clamp01;
use crate::{Error, LinkId};

/// Load the per-link average of `column`. A `None` column (outside the
/// daylight window) or a column absent from the file yields an empty map,
/// which disables the override.
pub fn load_shading(
    path: &Path,
    column: Option<&str>,
) -> Result<HashMap<LinkId, f64>, Error> {
    let Some(column) = column else {
        return Ok(HashMap::new());
    };

    let file = File::open(path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("failed to open shading file '{}': {e}", path.display()),
        )
    })?;
    let mut reader = csv::Reader::from_reader(file);

    let headers = reader.headers()?;
    let Some(link_idx) = headers.iter().position(|h| h == "link_id") else {
        return Err(Error::InvalidData(
            "shading table has no link_id column".into(),
        ));
    };
    let Some(value_idx) = headers.iter().position(|h| h == column) else {
        warn!("shading table has no column '{column}', override disabled");
        return Ok(HashMap::new());
    };

    let mut sums: HashMap<LinkId, (f64, u32)> = HashMap::new();
    for (line, row) in reader.records().enumerate() {
        let record = match row {
            Ok(r) => r,
            Err(e) => {
                warn!("skipping malformed shading row {}: {e}", line + 2);
                continue;
            }
        };
        let parsed = record
            .get(link_idx)
            .and_then(|s| s.trim().parse::<LinkId>().ok())
            .zip(record.get(value_idx).and_then(|s| s.trim().parse::<f64>().ok()));
        let Some((link_id, value)) = parsed else {
            warn!("skipping unparsable shading row {}", line + 2);
            continue;
        };
        let entry = sums.entry(link_id).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    Ok(sums
        .into_iter()
        .map(|(link_id, (sum, count))| (link_id, clamp01(sum / f64::from(count))))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn averages_samples_per_link() {
        let file = write_csv(
            "link_id,0715_14_me,0715_15_me\n\
             100,0.2,0.9\n\
             100,0.4,0.9\n\
             200,1.0,0.0\n",
        );
        let map = load_shading(file.path(), Some("0715_14_me")).unwrap();
        assert_eq!(map.len(), 2);
        assert!((map[&100] - 0.3).abs() < 1e-9);
        assert!((map[&200] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn missing_column_disables_override() {
        let file = write_csv("link_id,0715_14_me\n100,0.5\n");
        let map = load_shading(file.path(), Some("1201_09_me")).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn no_column_request_is_empty() {
        let file = write_csv("link_id,0715_14_me\n100,0.5\n");
        let map = load_shading(file.path(), None).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn values_are_clamped() {
        let file = write_csv("link_id,0715_14_me\n100,1.8\n");
        let map = load_shading(file.path(), Some("0715_14_me")).unwrap();
        assert_eq!(map[&100], 1.0);
    }
}
