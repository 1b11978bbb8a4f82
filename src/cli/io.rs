//! File and stdout handling for the CLI
//!
//! - Data: JSON lines, blank lines skipped, every record an object
//! - Output: a single JSON object on stdout, `{"status": "ok", "data": ...}`
//!   or `{"status": "error", "code": ..., "message": ...}`

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Read records from a JSON lines file
pub fn read_records(path: &Path) -> CliResult<Vec<Value>> {
    let file = File::open(path).map_err(|e| CliError::Io(format!("{}: {}", path.display(), e)))?;
    let mut records = Vec::new();

    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let data_error = |reason: String| CliError::Data {
            path: path.display().to_string(),
            line: n + 1,
            reason,
        };
        let record: Value = serde_json::from_str(&line).map_err(|e| data_error(e.to_string()))?;
        if !record.is_object() {
            return Err(data_error("record must be a JSON object".to_string()));
        }
        records.push(record);
    }
    Ok(records)
}

/// Read and deserialize a JSON file
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> CliResult<T> {
    let content = std::fs::read_to_string(path).map_err(|e| CliError::Io(format!("{}: {}", path.display(), e)))?;
    Ok(serde_json::from_str(&content)?)
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_line(&response)
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_line(&response)
}

fn write_line(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn file_with(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_records_skips_blank_lines() {
        let file = file_with("{\"id\": 1}\n\n{\"id\": 2}\n");
        let records = read_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["id"], 2);
    }

    #[test]
    fn test_read_records_rejects_non_objects() {
        let file = file_with("{\"id\": 1}\n[1, 2]\n");
        match read_records(file.path()).unwrap_err() {
            CliError::Data { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_read_json_file() {
        let file = file_with(r#"{"id_attr": "key"}"#);
        let value: Value = read_json_file(file.path()).unwrap();
        assert_eq!(value["id_attr"], "key");
    }
}
