//! The per-run JSON result file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use serde_json::Value;
use tracing::debug;

use crate::error::{DocflowError, Result};
use crate::models::record::ResultRecord;

/// A JSON array of result records, rewritten in full on every append.
#[derive(Debug, Clone)]
pub struct ResultFile {
    path: PathBuf,
}

impl ResultFile {
    /// Result file in `dir` stamped with the run's start time.
    pub fn for_run<Tz: TimeZone>(dir: &Path, started: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let name = format!("result_{}.json", started.format("%Y%m%d_%H%M%S"));
        Self { path: dir.join(name) }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record, creating the file on first use.
    ///
    /// Existing entries are kept as raw JSON so fields set downstream
    /// survive the rewrite. Returns the new entry count.
    pub async fn append(&self, record: &ResultRecord) -> Result<usize> {
        let mut entries = self.read_entries().await?;
        entries.push(serde_json::to_value(record)?);

        let content = serde_json::to_string_pretty(&entries)?;
        tokio::fs::write(&self.path, content).await?;

        debug!(path = %self.path.display(), entries = entries.len(), "Result file written");
        Ok(entries.len())
    }

    /// All records currently in the file; empty if it does not exist.
    pub async fn records(&self) -> Result<Vec<ResultRecord>> {
        self.read_entries()
            .await?
            .into_iter()
            .map(|entry| serde_json::from_value(entry).map_err(DocflowError::from))
            .collect()
    }

    async fn read_entries(&self) -> Result<Vec<Value>> {
        match tokio::fs::read(&self.path).await {
            Ok(body) => serde_json::from_slice(&body)
                .map_err(|e| DocflowError::Parse(format!("{}: {}", self.path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(DocflowError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::{Map, json};

    fn record(name: &str, amount: &str) -> ResultRecord {
        let fields = json!({"invoice_amount": amount, "purchase_date": "2024-03-02"});
        ResultRecord::from_fields(name, fields.as_object().unwrap())
    }

    #[test]
    fn test_file_name_uses_start_time() {
        let started = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 7, 9)
            .unwrap()
            .and_utc();
        let file = ResultFile::for_run(Path::new("input/march"), &started);
        assert_eq!(file.path(), Path::new("input/march/result_20240305_140709.json"));
    }

    #[tokio::test]
    async fn test_append_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let file = ResultFile::for_run(dir.path(), &Utc::now());
        assert!(file.records().await.unwrap().is_empty());
        assert!(!file.path().exists());

        assert_eq!(file.append(&record("a.pdf", "1.00")).await.unwrap(), 1);
        assert_eq!(file.append(&record("b.pdf", "2.00")).await.unwrap(), 2);
        assert_eq!(file.append(&record("c.pdf", "3.00")).await.unwrap(), 3);

        let names: Vec<_> = file.records().await.unwrap().into_iter().map(|r| r.filename).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf", "c.pdf"]);
    }

    #[tokio::test]
    async fn test_reparse_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let file = ResultFile::at(dir.path().join("result.json"));
        file.append(&record("a.pdf", "1.00")).await.unwrap();
        file.append(&ResultRecord::from_fields("b.pdf", &Map::new())).await.unwrap();

        let first: Value = serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        let reserialized = serde_json::to_string_pretty(&first).unwrap();
        let second: Value = serde_json::from_str(&reserialized).unwrap();

        assert_eq!(first, second);
        assert_eq!(second.as_array().unwrap().len(), 2);
        assert_eq!(second[1]["ticket_number"], Value::Null);
        assert_eq!(second[1]["submitted"], json!(false));
    }

    #[tokio::test]
    async fn test_append_preserves_downstream_edits() {
        let dir = tempfile::tempdir().unwrap();
        let file = ResultFile::at(dir.path().join("result.json"));
        std::fs::write(
            file.path(),
            r#"[{"filename": "a.pdf", "purchase_date": null, "invoice_amount": null,
                 "ticket_number": null, "submitted": true, "note": "sent"}]"#,
        )
        .unwrap();

        file.append(&record("b.pdf", "2.00")).await.unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(raw[0]["note"], json!("sent"));
        assert_eq!(raw[0]["submitted"], json!(true));
        assert_eq!(raw[1]["filename"], json!("b.pdf"));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = ResultFile::at(dir.path().join("result.json"));
        std::fs::write(file.path(), "[{").unwrap();

        let result = file.append(&record("a.pdf", "1.00")).await;
        assert!(matches!(result, Err(DocflowError::Parse(_))));
    }
}
