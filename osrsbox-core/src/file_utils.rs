//! File utility functions for the batch collaborator.

use crate::error::{OsrsboxError, Result};
use crate::models::{RawEntity, TypedRecord};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recursively find files with given extension in a directory, sorted by path.
pub fn find_files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(OsrsboxError::NotFound(format!("Directory not found: {}", dir.display())));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() {
            if let Some(ext) = entry.path().extension() {
                if ext == extension {
                    files.push(entry.path().to_path_buf());
                }
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Read file with UTF-8 encoding.
pub fn read_utf8_file(path: &Path) -> Result<String> {
    Ok(std::fs::read_to_string(path)?)
}

/// Load raw entities from one JSON file, or from every `*.json` file under a directory.
///
/// Each file holds a JSON array of entities.
pub fn load_raw_entities(path: &Path) -> Result<Vec<RawEntity>> {
    let files = if path.is_dir() {
        find_files_with_extension(path, "json")?
    } else if path.exists() {
        vec![path.to_path_buf()]
    } else {
        return Err(OsrsboxError::NotFound(format!("Input not found: {}", path.display())));
    };

    let mut entities = Vec::new();
    for file in files {
        let text = read_utf8_file(&file)?;
        let parsed: Vec<RawEntity> = serde_json::from_str(&text).map_err(|e| {
            OsrsboxError::InvalidFileFormat(format!("{}: {}", file.display(), e))
        })?;
        entities.extend(parsed);
    }
    Ok(entities)
}

/// Output file name for one record: `<id>.json`, or `<id>-<version>.json` for versioned entities.
pub fn record_file_name(entity_id: i64, version: Option<&str>) -> String {
    match version {
        Some(v) => format!("{}-{}.json", entity_id, v),
        None => format!("{}.json", entity_id),
    }
}

/// Serialize a record as a JSON object into `dir`.
pub fn write_record(dir: &Path, file_name: &str, record: &TypedRecord, pretty: bool) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let json = if pretty {
        serde_json::to_string_pretty(record)?
    } else {
        serde_json::to_string(record)?
    };
    let path = dir.join(file_name);
    std::fs::write(&path, json)?;
    Ok(path)
}
