//! Result extraction from finished job output.

mod field;

pub use field::{EMPTY_MARKER, FieldReading, FieldSpec, GROUP_SEPARATOR};

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::Result;
use crate::logging::PayloadLog;
use crate::models::output::{CustomOutput, JobMetadata, decode, semantic_modality};
use crate::storage::BlobStore;

/// Fields extracted from one job, with a per-segment report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Spec key to raw value, merged across segments (later segments win).
    pub fields: Map<String, Value>,
    pub segments: Vec<SegmentReport>,
}

impl Extraction {
    /// Whether any segment matched the blueprint and yielded fields.
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }
}

/// What was found in one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentReport {
    pub asset_id: String,
    pub semantic_modality: Option<String>,
    pub custom: Option<CustomReport>,
}

/// Blueprint match details for a segment with custom output.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomReport {
    pub blueprint_name: String,
    pub blueprint_confidence: Option<f64>,
    pub document_class: Option<String>,
    /// Whether the matched blueprint is the configured one.
    pub matched: bool,
    /// Resolved fields; empty unless `matched`.
    pub readings: Vec<FieldReading>,
}

/// Walks job output and resolves blueprint fields.
#[derive(Clone)]
pub struct ResultExtractor {
    store: Arc<dyn BlobStore>,
    payloads: Arc<dyn PayloadLog>,
}

impl ResultExtractor {
    pub fn new(store: Arc<dyn BlobStore>, payloads: Arc<dyn PayloadLog>) -> Self {
        Self { store, payloads }
    }

    /// Extract `specs` from every segment whose custom output matched
    /// `blueprint_name`.
    ///
    /// Standard output is fetched for its modality tag only; a fetch failure
    /// fails the extraction, a missing or oddly shaped tag does not.
    pub async fn extract(
        &self,
        output_metadata_uri: &str,
        filename: &str,
        blueprint_name: &str,
        specs: &[FieldSpec],
    ) -> Result<Extraction> {
        self.extract_with(output_metadata_uri, filename, blueprint_name, specs, |_| {})
            .await
    }

    /// Like [`extract`](Self::extract), calling `on_segment` as each segment
    /// is read, so segments before a failing one are still reported.
    pub async fn extract_with<F>(
        &self,
        output_metadata_uri: &str,
        filename: &str,
        blueprint_name: &str,
        specs: &[FieldSpec],
        mut on_segment: F,
    ) -> Result<Extraction>
    where
        F: FnMut(&SegmentReport),
    {
        let raw = self.store.fetch_json(output_metadata_uri).await?;
        self.payloads.log("job metadata", &raw);
        let metadata: JobMetadata = decode("job metadata", raw)?;

        let mut extraction = Extraction::default();

        for asset in &metadata.output_metadata {
            let asset_id = match &asset.asset_id {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            debug!(file = %filename, asset = %asset_id, segments = asset.segment_metadata.len(), "Reading asset");

            for segment in &asset.segment_metadata {
                let raw = self.store.fetch_json(&segment.standard_output_path).await?;
                self.payloads.log("standard output", &raw);
                let modality = semantic_modality(&raw);

                let custom = match segment.matched_custom_output()? {
                    Some(path) => {
                        let raw = self.store.fetch_json(path).await?;
                        self.payloads.log("custom output", &raw);
                        let output: CustomOutput = decode("custom output", raw)?;
                        Some(self.read_custom(&output, blueprint_name, specs, &mut extraction.fields)?)
                    }
                    None => None,
                };

                let report = SegmentReport {
                    asset_id: asset_id.clone(),
                    semantic_modality: modality,
                    custom,
                };
                on_segment(&report);
                extraction.segments.push(report);
            }
        }

        info!(file = %filename, fields = extraction.fields.len(), "Extraction finished");
        Ok(extraction)
    }

    fn read_custom(
        &self,
        output: &CustomOutput,
        blueprint_name: &str,
        specs: &[FieldSpec],
        fields: &mut Map<String, Value>,
    ) -> Result<CustomReport> {
        let matched = output.matched_blueprint.name == blueprint_name;

        let readings = if matched {
            specs
                .iter()
                .map(|spec| spec.resolve(output))
                .collect::<Result<Vec<_>>>()?
        } else {
            debug!(
                matched = %output.matched_blueprint.name,
                expected = %blueprint_name,
                "Custom output matched a different blueprint"
            );
            Vec::new()
        };

        for reading in &readings {
            fields.insert(reading.key.clone(), reading.value.clone());
        }

        Ok(CustomReport {
            blueprint_name: output.matched_blueprint.name.clone(),
            blueprint_confidence: output.matched_blueprint.confidence,
            document_class: output.document_class.as_ref().map(|c| c.kind.clone()),
            matched,
            readings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocflowError;
    use crate::logging::NoopPayloadLog;
    use crate::storage::MemoryBlobStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const BUCKET: &str = "out";
    const BLUEPRINT: &str = "ruter_invoice_blueprint";

    fn custom(name: &str, amount: Value) -> Value {
        json!({
            "matched_blueprint": {"name": name, "confidence": 0.93},
            "document_class": {"type": "Invoice"},
            "inference_result": {
                "invoice_amount": amount,
                "purchase_date": "2024-03-02",
                "ticket_number": null
            },
            "explainability_info": [{
                "invoice_amount": {"confidence": 0.9},
                "purchase_date": {"confidence": 0.8},
                "ticket_number": {"confidence": 0.1}
            }]
        })
    }

    /// Seed job metadata whose single asset has one segment per custom output.
    fn seed(store: &MemoryBlobStore, customs: &[Option<Value>]) -> String {
        let mut segments = Vec::new();
        for (i, custom) in customs.iter().enumerate() {
            let standard_key = format!("job/0/standard_output/{}/result.json", i);
            store.insert_json(BUCKET, &standard_key, &json!({"metadata": {"semantic_modality": "DOCUMENT"}}));

            let mut segment = json!({"standard_output_path": format!("s3://{}/{}", BUCKET, standard_key)});
            if let Some(custom) = custom {
                let custom_key = format!("job/0/custom_output/{}/result.json", i);
                store.insert_json(BUCKET, &custom_key, custom);
                segment["custom_output_status"] = json!("MATCH");
                segment["custom_output_path"] = json!(format!("s3://{}/{}", BUCKET, custom_key));
            }
            segments.push(segment);
        }

        store.insert_json(
            BUCKET,
            "job/job_metadata.json",
            &json!({"output_metadata": [{"asset_id": 0, "segment_metadata": segments}]}),
        );
        format!("s3://{}/job/job_metadata.json", BUCKET)
    }

    fn extractor(store: Arc<MemoryBlobStore>) -> ResultExtractor {
        ResultExtractor::new(store, Arc::new(NoopPayloadLog))
    }

    fn specs() -> Vec<FieldSpec> {
        FieldSpec::parse_all(&["invoice_amount", "purchase_date", "ticket_number"]).unwrap()
    }

    #[tokio::test]
    async fn test_extract_matching_segment() {
        let store = Arc::new(MemoryBlobStore::new());
        let uri = seed(&store, &[Some(custom(BLUEPRINT, json!("349.00")))]);

        let extraction = extractor(store)
            .extract(&uri, "a.pdf", BLUEPRINT, &specs())
            .await
            .unwrap();

        assert_eq!(
            Value::Object(extraction.fields.clone()),
            json!({
                "invoice_amount": "349.00",
                "purchase_date": "2024-03-02",
                "ticket_number": null
            })
        );
        let segment = &extraction.segments[0];
        assert_eq!(segment.asset_id, "0");
        assert_eq!(segment.semantic_modality.as_deref(), Some("DOCUMENT"));
        let custom = segment.custom.as_ref().unwrap();
        assert!(custom.matched);
        assert_eq!(custom.document_class.as_deref(), Some("Invoice"));
        assert_eq!(custom.readings[2].display_value(), EMPTY_MARKER);
    }

    #[tokio::test]
    async fn test_other_blueprint_yields_no_fields() {
        let store = Arc::new(MemoryBlobStore::new());
        let uri = seed(&store, &[Some(custom("other_blueprint", json!("10.00")))]);

        let extraction = extractor(store)
            .extract(&uri, "a.pdf", BLUEPRINT, &specs())
            .await
            .unwrap();

        assert!(!extraction.has_fields());
        let custom = extraction.segments[0].custom.as_ref().unwrap();
        assert!(!custom.matched);
        assert_eq!(custom.blueprint_name, "other_blueprint");
        assert!(custom.readings.is_empty());
    }

    #[tokio::test]
    async fn test_later_segment_wins() {
        let store = Arc::new(MemoryBlobStore::new());
        let uri = seed(
            &store,
            &[
                Some(custom(BLUEPRINT, json!("100.00"))),
                None,
                Some(custom(BLUEPRINT, json!("200.00"))),
            ],
        );

        let extraction = extractor(store)
            .extract(&uri, "a.pdf", BLUEPRINT, &specs())
            .await
            .unwrap();

        assert_eq!(extraction.fields["invoice_amount"], json!("200.00"));
        assert_eq!(extraction.segments.len(), 3);
        assert!(extraction.segments[1].custom.is_none());
    }

    #[tokio::test]
    async fn test_missing_standard_output_fails() {
        let store = Arc::new(MemoryBlobStore::new());
        store.insert_json(
            BUCKET,
            "job/job_metadata.json",
            &json!({"output_metadata": [{
                "asset_id": 0,
                "segment_metadata": [{"standard_output_path": "s3://out/absent.json"}]
            }]}),
        );

        let result = extractor(store)
            .extract("s3://out/job/job_metadata.json", "a.pdf", BLUEPRINT, &specs())
            .await;
        assert!(matches!(result, Err(DocflowError::Transport(_))));
    }

    #[tokio::test]
    async fn test_odd_modality_shape_does_not_fail() {
        let store = Arc::new(MemoryBlobStore::new());
        let uri = seed(&store, &[Some(custom(BLUEPRINT, json!("12.00")))]);
        store.insert_json(
            BUCKET,
            "job/0/standard_output/0/result.json",
            &json!({"metadata": {"semantic_modality": {"type": "DOCUMENT"}}}),
        );

        let extraction = extractor(store)
            .extract(&uri, "a.pdf", BLUEPRINT, &specs())
            .await
            .unwrap();

        assert_eq!(extraction.fields["invoice_amount"], json!("12.00"));
        assert_eq!(
            extraction.segments[0].semantic_modality.as_deref(),
            Some(r#"{"type":"DOCUMENT"}"#)
        );
    }

    #[tokio::test]
    async fn test_segments_reported_before_failure() {
        let store = Arc::new(MemoryBlobStore::new());
        let broken = json!({"matched_blueprint": {"name": BLUEPRINT}});
        let uri = seed(&store, &[Some(custom(BLUEPRINT, json!("1.00"))), Some(broken)]);

        let mut seen = Vec::new();
        let result = extractor(store)
            .extract_with(&uri, "a.pdf", BLUEPRINT, &specs(), |segment| seen.push(segment.clone()))
            .await;

        assert!(matches!(result, Err(DocflowError::DataShape(_))));
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].semantic_modality.as_deref(), Some("DOCUMENT"));
        assert!(seen[0].custom.as_ref().unwrap().matched);
    }

    #[tokio::test]
    async fn test_missing_field_fails_document() {
        let store = Arc::new(MemoryBlobStore::new());
        let uri = seed(&store, &[Some(custom(BLUEPRINT, json!("1.00")))]);
        let specs = FieldSpec::parse_all(&["invoice_amount", "due_date"]).unwrap();

        let result = extractor(store).extract(&uri, "a.pdf", BLUEPRINT, &specs).await;
        assert!(matches!(result, Err(DocflowError::DataShape(_))));
    }
}
