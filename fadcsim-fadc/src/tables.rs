//! Loading conditions tables from JSON.
//!
//! Schema: `{ "channels": [ { "channel": 1, "ix": 1, "iy": 1,
//! "gain": 0.15, "pedestal": 100.0, "time_shift": 0.0 }, ... ] }`.
//! `time_shift` may be omitted.

use crate::error::Result;
use fadcsim_core::{reload, ChannelRecord, ChannelTable};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Deserialize)]
struct JsonTable {
    channels: Vec<ChannelRecord>,
}

/// Parse conditions records from a JSON string.
pub fn channel_records_from_json(json: &str) -> Result<Vec<ChannelRecord>> {
    let table: JsonTable = serde_json::from_str(json)?;
    Ok(table.channels)
}

/// Parse conditions records from a JSON file.
pub fn channel_records_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<ChannelRecord>> {
    let reader = BufReader::new(File::open(path)?);
    let table: JsonTable = serde_json::from_reader(reader)?;
    Ok(table.channels)
}

/// Build a channel table from a JSON string.
pub fn channel_table_from_json(json: &str) -> Result<ChannelTable> {
    Ok(reload(&channel_records_from_json(json)?)?)
}

/// Build a channel table from a JSON file.
pub fn channel_table_from_file<P: AsRef<Path>>(path: P) -> Result<ChannelTable> {
    Ok(reload(&channel_records_from_file(path)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use approx::assert_relative_eq;
    use fadcsim_core::{CalibrationProvider, ChannelId, Error as CoreError, GeometryError};
    use std::io::Write;

    const TABLE: &str = r#"{
        "channels": [
            { "channel": 1, "ix": -3, "iy": 2, "gain": 0.15, "pedestal": 101.5, "time_shift": 1.25 },
            { "channel": 2, "ix": 3, "iy": -2, "gain": 0.18, "pedestal": 98.0 }
        ]
    }"#;

    #[test]
    fn test_table_from_json() {
        let table = channel_table_from_json(TABLE).unwrap();
        assert_eq!(table.len(), 2);
        assert_relative_eq!(table.time_shift(ChannelId(1)).unwrap(), 1.25);
        assert_relative_eq!(table.time_shift(ChannelId(2)).unwrap(), 0.0);
        assert!(!table.crystal(ChannelId(2)).unwrap().is_top());
    }

    #[test]
    fn test_table_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TABLE.as_bytes()).unwrap();
        let table = channel_table_from_file(file.path()).unwrap();
        assert_relative_eq!(table.gain(ChannelId(2)).unwrap(), 0.18);
    }

    #[test]
    fn test_bad_geometry_is_fatal() {
        let json = r#"{ "channels": [ { "channel": 1, "ix": 24, "iy": 2, "gain": 0.1, "pedestal": 100.0 } ] }"#;
        assert!(matches!(
            channel_table_from_json(json),
            Err(Error::CoreError(CoreError::Geometry(GeometryError::InvalidIndex { ix: 24, iy: 2 })))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            channel_table_from_file("/nonexistent/table.json"),
            Err(Error::IoError(_))
        ));
    }
}
