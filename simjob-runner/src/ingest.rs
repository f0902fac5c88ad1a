//! Result ingestion
//!
//! Reads the simulator's raw tabular output from a result directory and
//! projects it into a canonical `key -> value` mapping.
//!
//! Rules:
//! - exactly one `*.{extension}` file must exist (none is
//!   [`SimJobError::MissingOutput`], several is [`SimJobError::AmbiguousOutput`])
//! - the header must expose the key and value columns ([`SimJobError::Schema`])
//! - duplicate keys are last-write-wins
//! - a header without data rows yields an empty mapping

use simjob_core::SimJobError;
use simjob_core::domain::entity::{
    DEFAULT_KEY_COLUMN, DEFAULT_RAW_OUTPUT_EXTENSION, DEFAULT_VALUE_COLUMN, OrchestratorBinding,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::process::PARAMS_FILE_NAME;

/// Interval between checks while waiting for the raw output to appear
const OUTPUT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Ingests raw output files of one shape
#[derive(Debug, Clone)]
pub struct Ingestor {
    extension: String,
    key_column: String,
    value_column: String,
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new(
            DEFAULT_RAW_OUTPUT_EXTENSION,
            DEFAULT_KEY_COLUMN,
            DEFAULT_VALUE_COLUMN,
        )
    }
}

/// Ingests `result_dir` with the default file shape (`*.csv`, `break`/`value`)
pub fn ingest(result_dir: &Path) -> Result<BTreeMap<String, f64>, SimJobError> {
    Ingestor::default().ingest(result_dir)
}

impl Ingestor {
    pub fn new(extension: &str, key_column: &str, value_column: &str) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_string(),
            key_column: key_column.to_string(),
            value_column: value_column.to_string(),
        }
    }

    /// Ingestor matching an entity's binding
    pub fn for_binding(binding: &OrchestratorBinding) -> Self {
        Self::new(
            &binding.raw_output_extension,
            &binding.key_column,
            &binding.value_column,
        )
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Raw output candidates in `dir`, sorted by path
    pub fn candidates(&self, dir: &Path) -> Result<Vec<PathBuf>, SimJobError> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SimJobError::file(dir, e)),
        };

        let mut found = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| SimJobError::file(dir, e))?.path();
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension));
            let is_params = path.file_name().is_some_and(|name| name == PARAMS_FILE_NAME);
            if matches && !is_params && path.is_file() {
                found.push(path);
            }
        }
        found.sort();
        Ok(found)
    }

    /// The single raw output file in `dir`
    pub fn locate(&self, dir: &Path) -> Result<PathBuf, SimJobError> {
        let mut candidates = self.candidates(dir)?;
        match candidates.len() {
            0 => Err(SimJobError::MissingOutput {
                dir: dir.to_path_buf(),
                extension: self.extension.clone(),
            }),
            1 => Ok(candidates.remove(0)),
            _ => Err(SimJobError::AmbiguousOutput {
                dir: dir.to_path_buf(),
                candidates,
            }),
        }
    }

    /// Waits until at least one candidate exists or `timeout` elapses
    ///
    /// Returns whether a candidate was seen. Ingestion still decides
    /// whether the directory content is valid.
    pub async fn wait_for_output(&self, dir: &Path, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if matches!(self.candidates(dir), Ok(c) if !c.is_empty()) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                debug!("No *.{} output appeared in {:?}", self.extension, dir);
                return false;
            }
            tokio::time::sleep(OUTPUT_POLL_INTERVAL).await;
        }
    }

    /// Locates and ingests the raw output of `dir`
    pub fn ingest(&self, dir: &Path) -> Result<BTreeMap<String, f64>, SimJobError> {
        let path = self.locate(dir)?;
        let mapping = self.read_file(&path)?;
        info!("Ingested {} result row(s) from {:?}", mapping.len(), path);
        Ok(mapping)
    }

    /// Projects one raw output file
    pub fn read_file(&self, path: &Path) -> Result<BTreeMap<String, f64>, SimJobError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| csv_error(path, e))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| csv_error(path, e))?
            .iter()
            .map(str::to_string)
            .collect();

        let key_idx = headers.iter().position(|h| *h == self.key_column);
        let value_idx = headers.iter().position(|h| *h == self.value_column);
        let (key_idx, value_idx) = match (key_idx, value_idx) {
            (Some(k), Some(v)) => (k, v),
            _ => {
                let missing = [&self.key_column, &self.value_column]
                    .into_iter()
                    .filter(|c| !headers.contains(c))
                    .cloned()
                    .collect();
                return Err(SimJobError::Schema {
                    missing,
                    present: headers.into_iter().filter(|h| !h.is_empty()).collect(),
                });
            }
        };

        let mut mapping = BTreeMap::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record.map_err(|e| csv_error(path, e))?;
            let row = idx + 1;

            let key = record.get(key_idx).unwrap_or("").to_string();
            let raw_value = record.get(value_idx).unwrap_or("");
            let value = raw_value
                .parse::<f64>()
                .map_err(|_| SimJobError::InvalidValue {
                    row,
                    column: self.value_column.clone(),
                    value: raw_value.to_string(),
                })?;

            // Later rows win.
            mapping.insert(key, value);
        }

        Ok(mapping)
    }
}

fn csv_error(path: &Path, err: csv::Error) -> SimJobError {
    match err.into_kind() {
        csv::ErrorKind::Io(io) => SimJobError::file(path, io),
        other => SimJobError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("malformed raw output {}: {:?}", path.display(), other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) {
        std::fs::write(dir.path().join(name), content).unwrap();
    }

    #[test]
    fn test_ingest_well_formed_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, "result.csv", "break,value\n1,6.30862\n2,6.36131\n");

        let mapping = ingest(dir.path()).unwrap();

        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping["1"], 6.30862);
        assert_eq!(mapping["2"], 6.36131);
    }

    #[test]
    fn test_missing_output() {
        let dir = TempDir::new().unwrap();
        write(&dir, "params.json", "{}");

        let err = ingest(dir.path()).unwrap_err();
        assert!(matches!(err, SimJobError::MissingOutput { .. }));
    }

    #[test]
    fn test_missing_directory_is_missing_output() {
        let dir = TempDir::new().unwrap();
        let err = ingest(&dir.path().join("never-created")).unwrap_err();
        assert!(matches!(err, SimJobError::MissingOutput { .. }));
    }

    #[test]
    fn test_params_file_is_never_output() {
        let dir = TempDir::new().unwrap();
        write(&dir, PARAMS_FILE_NAME, "{}");
        write(&dir, "result.json", "break,value\n1,2.0\n");

        let ingestor = Ingestor::new("json", "break", "value");
        assert_eq!(ingestor.candidates(dir.path()).unwrap(), vec![dir.path().join("result.json")]);
    }

    #[test]
    fn test_two_files_are_ambiguous() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.csv", "break,value\n1,1.0\n");
        write(&dir, "b.csv", "break,value\n1,2.0\n");

        match ingest(dir.path()).unwrap_err() {
            SimJobError::AmbiguousOutput { candidates, .. } => assert_eq!(candidates.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_value_column_is_schema_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "result.csv", "break,throughput\n1,6.3\n");

        match ingest(dir.path()).unwrap_err() {
            SimJobError::Schema { missing, present } => {
                assert_eq!(missing, vec!["value".to_string()]);
                assert_eq!(present, vec!["break".to_string(), "throughput".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_keys_last_write_wins() {
        let dir = TempDir::new().unwrap();
        write(&dir, "result.csv", "break,value\n1,1.0\n2,2.0\n1,3.5\n");

        let mapping = ingest(dir.path()).unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping["1"], 3.5);
    }

    #[test]
    fn test_header_only_is_empty_mapping() {
        let dir = TempDir::new().unwrap();
        write(&dir, "result.csv", "break,value\n");

        assert!(ingest(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_empty_file_is_schema_error() {
        let dir = TempDir::new().unwrap();
        write(&dir, "result.csv", "");

        assert!(matches!(
            ingest(dir.path()).unwrap_err(),
            SimJobError::Schema { .. }
        ));
    }

    #[test]
    fn test_non_numeric_value() {
        let dir = TempDir::new().unwrap();
        write(&dir, "result.csv", "break,value\n1,1.0\n2,n/a\n");

        match ingest(dir.path()).unwrap_err() {
            SimJobError::InvalidValue { row, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(value, "n/a");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_custom_columns_and_extra_fields() {
        let dir = TempDir::new().unwrap();
        write(&dir, "out.tsv.csv", "sat, snr ,beam\nA,12.5,3\nB, 9.0 ,4\n");

        let mapping = Ingestor::new("csv", "sat", "snr").ingest(dir.path()).unwrap();
        assert_eq!(mapping["A"], 12.5);
        assert_eq!(mapping["B"], 9.0);
    }

    #[tokio::test]
    async fn test_wait_for_output_times_out() {
        let dir = TempDir::new().unwrap();
        let seen = Ingestor::default()
            .wait_for_output(dir.path(), Duration::from_millis(150))
            .await;
        assert!(!seen);
    }

    #[tokio::test]
    async fn test_wait_for_output_sees_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, "result.csv", "break,value\n");
        assert!(
            Ingestor::default()
                .wait_for_output(dir.path(), Duration::from_secs(1))
                .await
        );
    }
}
