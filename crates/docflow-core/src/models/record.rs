//! Result records persisted per batch, and per-document outcomes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::job::JobStatus;

/// One row of a batch result file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Local filename of the source document.
    pub filename: String,

    /// Extracted purchase date, raw as returned by the service.
    pub purchase_date: Option<Value>,

    /// Extracted invoice amount, raw as returned by the service.
    pub invoice_amount: Option<Value>,

    /// Extracted ticket number, raw as returned by the service.
    pub ticket_number: Option<Value>,

    /// Set by a downstream workflow, never by docflow.
    pub submitted: bool,
}

impl ResultRecord {
    /// Build a record from an extracted field mapping.
    ///
    /// Only the three persisted fields are read; anything else configured
    /// for display is dropped. Absent and null both serialize as `null`.
    pub fn from_fields(filename: impl Into<String>, fields: &Map<String, Value>) -> Self {
        let pick = |name: &str| fields.get(name).filter(|v| !v.is_null()).cloned();
        Self {
            filename: filename.into(),
            purchase_date: pick("purchase_date"),
            invoice_amount: pick("invoice_amount"),
            ticket_number: pick("ticket_number"),
            submitted: false,
        }
    }
}

/// Why a document produced no record.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The job ended in a terminal status other than Success.
    JobStatus(JobStatus),

    /// The job succeeded but no segment matched the configured blueprint.
    NoMatch,

    /// Upload, submission, polling, or extraction failed.
    Error(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::JobStatus(status) => write!(f, "job ended with status {}", status),
            SkipReason::NoMatch => write!(f, "no segment matched the blueprint"),
            SkipReason::Error(message) => write!(f, "{}", message),
        }
    }
}

/// Outcome of driving one document through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOutcome {
    /// A record was appended to the result file.
    Recorded(ResultRecord),

    /// Nothing was appended.
    Skipped(SkipReason),
}

impl DocumentOutcome {
    /// Whether the document counts towards the processed total.
    ///
    /// A successful job whose output matched no blueprint still counts.
    pub fn is_processed(&self) -> bool {
        matches!(
            self,
            DocumentOutcome::Recorded(_) | DocumentOutcome::Skipped(SkipReason::NoMatch)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_record_from_fields() {
        let fields = json!({
            "invoice_amount": "249.00",
            "purchase_date": "2024-03-02",
            "ticket_number": null,
            "vendor/name": "Ruter AS"
        });
        let record = ResultRecord::from_fields("a.pdf", fields.as_object().unwrap());

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "filename": "a.pdf",
                "purchase_date": "2024-03-02",
                "invoice_amount": "249.00",
                "ticket_number": null,
                "submitted": false
            })
        );
    }

    #[test]
    fn test_missing_fields_are_null() {
        let record = ResultRecord::from_fields("b.pdf", &Map::new());
        assert_eq!(record.purchase_date, None);
        assert!(!record.submitted);
    }

    #[test]
    fn test_processed_outcomes() {
        let recorded = DocumentOutcome::Recorded(ResultRecord::from_fields("a.pdf", &Map::new()));
        assert!(recorded.is_processed());
        assert!(DocumentOutcome::Skipped(SkipReason::NoMatch).is_processed());
        assert!(!DocumentOutcome::Skipped(SkipReason::JobStatus(JobStatus::ClientError)).is_processed());
        assert!(!DocumentOutcome::Skipped(SkipReason::Error("boom".into())).is_processed());
    }
}
