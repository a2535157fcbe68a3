//! Typed views of the documents a finished job writes to storage.
//!
//! Each view is decoded from the raw JSON right after it is fetched, so a
//! missing required key surfaces as [`DocflowError::DataShape`] at that point.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{DocflowError, Result};

/// Custom output status marking a blueprint match.
pub const MATCH_STATUS: &str = "MATCH";

/// Top-level job metadata document.
#[derive(Debug, Clone, Deserialize)]
pub struct JobMetadata {
    pub output_metadata: Vec<AssetMetadata>,
}

/// One analysed input asset.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetMetadata {
    #[serde(default)]
    pub asset_id: Value,

    pub segment_metadata: Vec<SegmentMetadata>,
}

/// Output locations for one segment of an asset.
#[derive(Debug, Clone, Deserialize)]
pub struct SegmentMetadata {
    pub standard_output_path: String,

    #[serde(default)]
    pub custom_output_path: Option<String>,

    #[serde(default)]
    pub custom_output_status: Option<String>,
}

impl SegmentMetadata {
    /// Custom output location when the segment matched a blueprint.
    pub fn matched_custom_output(&self) -> Result<Option<&str>> {
        match self.custom_output_status.as_deref() {
            Some(MATCH_STATUS) => self
                .custom_output_path
                .as_deref()
                .map(Some)
                .ok_or_else(|| DocflowError::missing("custom_output_path")),
            _ => Ok(None),
        }
    }
}

/// Modality tag of a standard output document.
///
/// Only used for display, so any shape is accepted: strings are returned as
/// is, other non-null values in their JSON form, and a missing tag is `None`.
pub fn semantic_modality(standard_output: &Value) -> Option<String> {
    match standard_output.pointer("/metadata/semantic_modality")? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Blueprint-specific extraction result.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomOutput {
    pub matched_blueprint: MatchedBlueprint,

    #[serde(default)]
    pub document_class: Option<DocumentClass>,

    #[serde(default)]
    pub inference_result: Option<Map<String, Value>>,

    #[serde(default)]
    pub explainability_info: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchedBlueprint {
    pub name: String,

    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentClass {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Decode a fetched document, mapping shape mismatches to `DataShape`.
pub fn decode<T: DeserializeOwned>(what: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| DocflowError::DataShape(format!("{}: {}", what, e)))
}
