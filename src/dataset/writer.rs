use std::path::Path;
use csv::{ReaderBuilder, WriterBuilder};
use tracing::info;

use crate::error::{Result, PrepError};
use super::DatasetRow;

/// Header of the dataset table, in column order
pub const DATASET_COLUMNS: [&str; 5] = ["text", "audio_path", "start_time", "end_time", "duration"];

/// Read every row of an existing dataset table. Columns are matched by
/// header name; extra columns are ignored.
pub fn read_dataset<P: AsRef<Path>>(path: P) -> Result<Vec<DatasetRow>> {
    let path = path.as_ref();
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let headers = reader.headers()?.clone();
    let missing: Vec<_> = DATASET_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|h| h == **column))
        .collect();
    if !missing.is_empty() {
        return Err(PrepError::Dataset(format!(
            "{} is missing column(s) {:?}",
            path.display(),
            missing
        )));
    }

    let rows = reader
        .deserialize::<DatasetRow>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Append `rows` to the table at `output_path`, creating it if needed, and
/// return the combined table. Existing rows keep their order and come first.
pub fn append_dataset<P: AsRef<Path>>(rows: &[DatasetRow], output_path: P) -> Result<Vec<DatasetRow>> {
    let output_path = output_path.as_ref();

    let mut table = if output_path.exists() && std::fs::metadata(output_path)?.len() > 0 {
        let existing = read_dataset(output_path)?;
        info!("Appending {} rows to {} existing rows in {}", rows.len(), existing.len(), output_path.display());
        existing
    } else {
        info!("Creating dataset {} with {} rows", output_path.display(), rows.len());
        Vec::new()
    };
    table.extend_from_slice(rows);

    let parent = match output_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    // Rewrite in full through a sibling temp file so a failed write leaves
    // the previous table intact
    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    {
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(&mut temp);
        writer.write_record(DATASET_COLUMNS)?;
        for row in &table {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    temp.persist(output_path).map_err(|e| PrepError::Io(e.error))?;

    info!("Dataset {} now holds {} rows", output_path.display(), table.len());
    Ok(table)
}
