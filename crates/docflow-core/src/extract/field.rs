//! Blueprint field specs and their resolution against a custom output.

use serde_json::{Map, Value};

use crate::error::{DocflowError, Result};
use crate::models::output::CustomOutput;

/// Separator between a group name and a field name.
pub const GROUP_SEPARATOR: char = '/';

/// Shown in place of an empty extracted value.
pub const EMPTY_MARKER: &str = "<EMPTY>";

/// A field to read from the inference result, optionally inside a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub group: Option<String>,
    pub field: String,
}

impl FieldSpec {
    /// Parse `field` or `group/field`.
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = || DocflowError::Config(format!("invalid field spec `{}`", spec));

        match spec.split_once(GROUP_SEPARATOR) {
            Some((group, field)) => {
                if group.is_empty() || field.is_empty() || field.contains(GROUP_SEPARATOR) {
                    return Err(invalid());
                }
                Ok(Self {
                    group: Some(group.to_string()),
                    field: field.to_string(),
                })
            }
            None if spec.is_empty() => Err(invalid()),
            None => Ok(Self {
                group: None,
                field: spec.to_string(),
            }),
        }
    }

    /// Parse a list of specs, failing on the first invalid one.
    pub fn parse_all<S: AsRef<str>>(specs: &[S]) -> Result<Vec<Self>> {
        specs.iter().map(|s| Self::parse(s.as_ref())).collect()
    }

    /// Key under which the resolved value is stored.
    pub fn key(&self) -> String {
        match &self.group {
            Some(group) => format!("{}{}{}", group, GROUP_SEPARATOR, self.field),
            None => self.field.clone(),
        }
    }

    /// Read the value and its confidence from a custom output.
    ///
    /// The value comes from `inference_result[group][field]` and the
    /// confidence from `explainability_info[0][group][field].confidence`
    /// (without the group level for bare specs). A missing key is a
    /// data-shape error; a null value is returned as is.
    pub fn resolve(&self, output: &CustomOutput) -> Result<FieldReading> {
        let inference = output
            .inference_result
            .as_ref()
            .ok_or_else(|| DocflowError::missing("inference_result"))?;
        let explainability = output
            .explainability_info
            .first()
            .and_then(Value::as_object)
            .ok_or_else(|| DocflowError::missing("explainability_info[0]"))?;

        let (inference, explainability) = match &self.group {
            Some(group) => (
                descend(inference, group, "inference_result")?,
                descend(explainability, group, "explainability_info[0]")?,
            ),
            None => (inference, explainability),
        };

        let value = inference
            .get(&self.field)
            .cloned()
            .ok_or_else(|| DocflowError::missing(format!("inference_result.{}", self.key())))?;
        let confidence = explainability
            .get(&self.field)
            .ok_or_else(|| DocflowError::missing(format!("explainability_info[0].{}", self.key())))?
            .get("confidence")
            .and_then(Value::as_f64);

        Ok(FieldReading {
            key: self.key(),
            field: self.field.clone(),
            value,
            confidence,
        })
    }
}

fn descend<'a>(map: &'a Map<String, Value>, group: &str, root: &str) -> Result<&'a Map<String, Value>> {
    map.get(group)
        .and_then(Value::as_object)
        .ok_or_else(|| DocflowError::missing(format!("{}.{}", root, group)))
}

/// One resolved field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldReading {
    /// Spec key, `field` or `group/field`.
    pub key: String,
    pub field: String,
    /// Raw value, possibly null or empty.
    pub value: Value,
    pub confidence: Option<f64>,
}

impl FieldReading {
    /// Value formatted for display; empty values show [`EMPTY_MARKER`].
    pub fn display_value(&self) -> String {
        match &self.value {
            Value::Null | Value::Bool(false) => EMPTY_MARKER.to_string(),
            Value::String(s) if s.is_empty() => EMPTY_MARKER.to_string(),
            Value::Array(a) if a.is_empty() => EMPTY_MARKER.to_string(),
            Value::Object(o) if o.is_empty() => EMPTY_MARKER.to_string(),
            Value::Number(n) if n.as_f64() == Some(0.0) => EMPTY_MARKER.to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::output::decode;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn output() -> CustomOutput {
        decode(
            "custom output",
            json!({
                "matched_blueprint": {"name": "ruter_invoice_blueprint", "confidence": 1},
                "document_class": {"type": "Invoice"},
                "inference_result": {
                    "invoice_amount": "349.00",
                    "ticket_number": null,
                    "vendor": {"name": "Ruter AS", "org_number": ""}
                },
                "explainability_info": [{
                    "invoice_amount": {"confidence": 0.97, "value": "349.00"},
                    "ticket_number": {"confidence": 0.0},
                    "vendor": {
                        "name": {"confidence": 0.88},
                        "org_number": {"confidence": 0.12}
                    }
                }]
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_specs() {
        assert_eq!(
            FieldSpec::parse("vendor/name").unwrap(),
            FieldSpec { group: Some("vendor".into()), field: "name".into() }
        );
        assert_eq!(FieldSpec::parse("ticket_number").unwrap().group, None);
        assert_eq!(FieldSpec::parse("vendor/name").unwrap().key(), "vendor/name");

        for bad in ["", "/name", "vendor/", "a/b/c"] {
            assert!(FieldSpec::parse(bad).is_err(), "accepted `{}`", bad);
        }
    }

    #[test]
    fn test_resolve_bare_field() {
        let reading = FieldSpec::parse("invoice_amount").unwrap().resolve(&output()).unwrap();
        assert_eq!(reading.value, json!("349.00"));
        assert_eq!(reading.confidence, Some(0.97));
        assert_eq!(reading.display_value(), "349.00");
    }

    #[test]
    fn test_resolve_grouped_field() {
        let reading = FieldSpec::parse("vendor/name").unwrap().resolve(&output()).unwrap();
        assert_eq!(reading.key, "vendor/name");
        assert_eq!(reading.field, "name");
        assert_eq!(reading.value, json!("Ruter AS"));
        assert_eq!(reading.confidence, Some(0.88));
    }

    #[test]
    fn test_null_value_shows_empty_marker() {
        let reading = FieldSpec::parse("ticket_number").unwrap().resolve(&output()).unwrap();
        assert_eq!(reading.value, Value::Null);
        assert_eq!(reading.display_value(), EMPTY_MARKER);

        let reading = FieldSpec::parse("vendor/org_number").unwrap().resolve(&output()).unwrap();
        assert_eq!(reading.value, json!(""));
        assert_eq!(reading.display_value(), EMPTY_MARKER);
    }

    #[test]
    fn test_missing_field_is_data_shape() {
        let result = FieldSpec::parse("purchase_date").unwrap().resolve(&output());
        assert!(matches!(result, Err(DocflowError::DataShape(_))));

        let result = FieldSpec::parse("customer/name").unwrap().resolve(&output());
        assert!(matches!(result, Err(DocflowError::DataShape(_))));
    }

    #[test]
    fn test_missing_inference_result_is_data_shape() {
        let output: CustomOutput = decode(
            "custom output",
            json!({"matched_blueprint": {"name": "ruter_invoice_blueprint"}}),
        )
        .unwrap();
        let result = FieldSpec::parse("invoice_amount").unwrap().resolve(&output);
        assert!(matches!(result, Err(DocflowError::DataShape(_))));
    }
}
