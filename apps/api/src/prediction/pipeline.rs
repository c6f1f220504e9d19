//! Feature alignment: raw JSON payload → the positional vector the regressor expects.
//!
//! Two stages:
//! 1. [`map_columns`] widens the schema-less payload into named columns, with
//!    the categorical fields replaced by their one-hot block.
//! 2. [`project`] strictly projects those named columns onto `model_columns`,
//!    zero-filling anything absent and coercing what is kept to `f64`.
//!
//! Regressors consume positions, not names. A misordered vector does not error,
//! it silently predicts garbage, so the projection is the only place ordering
//! is decided.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::prediction::encoder::OneHotEncoder;
use crate::prediction::PredictionError;

/// Categorical attributes the encoder was fitted on, in transform order.
pub const CATEGORICAL_FIELDS: [&str; 3] = ["Department", "EducationField", "JobRole"];

/// Substituted for a categorical field the payload does not carry.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Stage 1: named-column record. Non-categorical values are kept raw; they are
/// only coerced if the projection keeps them.
pub fn map_columns(
    payload: &Map<String, Value>,
    encoder: &OneHotEncoder,
) -> Result<BTreeMap<String, Value>, PredictionError> {
    if !encoder.is_fitted_for(&CATEGORICAL_FIELDS) {
        return Err(PredictionError::EncoderNotReady);
    }

    let categorical_values = CATEGORICAL_FIELDS
        .iter()
        .map(|field| categorical_value(field, payload.get(*field)))
        .collect::<Result<Vec<_>, _>>()?;

    let one_hot = encoder.transform(&CATEGORICAL_FIELDS, &categorical_values)?;

    let mut merged: BTreeMap<String, Value> = payload
        .iter()
        .filter(|(key, _)| !CATEGORICAL_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    for (column, indicator) in one_hot {
        merged.insert(column, Value::from(indicator));
    }

    Ok(merged)
}

/// Stage 2: ordered vector, exactly one value per model column.
pub fn project(
    merged: &BTreeMap<String, Value>,
    model_columns: &[String],
) -> Result<Vec<f64>, PredictionError> {
    model_columns
        .iter()
        .map(|column| match merged.get(column) {
            None => Ok(0.0),
            Some(value) => coerce_numeric(column, value),
        })
        .collect()
}

/// Runs both stages.
pub fn align_features(
    payload: &Map<String, Value>,
    encoder: &OneHotEncoder,
    model_columns: &[String],
) -> Result<Vec<f64>, PredictionError> {
    let merged = map_columns(payload, encoder)?;
    project(&merged, model_columns)
}

fn categorical_value(field: &str, value: Option<&Value>) -> Result<String, PredictionError> {
    match value {
        None | Some(Value::Null) => Ok(UNKNOWN_CATEGORY.to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(PredictionError::Failed(format!(
            "categorical field '{field}' must be a string, got {}",
            type_name(other)
        ))),
    }
}

fn coerce_numeric(column: &str, value: &Value) -> Result<f64, PredictionError> {
    let coerced = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    coerced.filter(|x| x.is_finite()).ok_or_else(|| {
        PredictionError::Failed(format!(
            "could not convert {} value {value} in column '{column}' to float",
            type_name(value)
        ))
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::encoder::{EncodedFeature, HandleUnknown};
    use serde_json::json;

    fn encoder() -> OneHotEncoder {
        OneHotEncoder {
            features: vec![
                EncodedFeature {
                    name: "Department".into(),
                    categories: vec!["Sales".into(), "RnD".into()],
                },
                EncodedFeature {
                    name: "EducationField".into(),
                    categories: vec!["Medical".into(), "Unknown".into()],
                },
                EncodedFeature {
                    name: "JobRole".into(),
                    categories: vec!["Manager".into(), "Unknown".into()],
                },
            ],
            handle_unknown: HandleUnknown::Ignore,
        }
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_reference_example() {
        let payload = object(json!({"Department": "Sales", "Age": 30}));
        let cols = columns(&["Age", "Department_Sales", "Department_RnD"]);
        let vector = align_features(&payload, &encoder(), &cols).unwrap();
        assert_eq!(vector, vec![30.0, 1.0, 0.0]);
    }

    #[test]
    fn test_missing_categoricals_default_to_unknown() {
        let payload = object(json!({"Age": 41, "MonthlyRate": 1200}));
        let cols = columns(&[
            "JobRole_Unknown",
            "Age",
            "EducationField_Unknown",
            "Department_Sales",
            "MonthlyRate",
            "YearsAtCompany",
        ]);
        let vector = align_features(&payload, &encoder(), &cols).unwrap();
        assert_eq!(vector.len(), cols.len());
        assert_eq!(vector, vec![1.0, 41.0, 1.0, 0.0, 1200.0, 0.0]);
    }

    #[test]
    fn test_null_categorical_treated_as_missing() {
        let payload = object(json!({"JobRole": null}));
        let merged = map_columns(&payload, &encoder()).unwrap();
        assert_eq!(merged["JobRole_Unknown"], json!(1.0));
        assert!(!merged.contains_key("JobRole"));
    }

    #[test]
    fn test_key_order_does_not_change_vector() {
        let cols = columns(&["Age", "DistanceFromHome", "Department_RnD", "JobRole_Manager"]);
        let a: Map<String, Value> = serde_json::from_str(
            r#"{"Age": 35, "Department": "RnD", "DistanceFromHome": 7, "JobRole": "Manager"}"#,
        )
        .unwrap();
        let b: Map<String, Value> = serde_json::from_str(
            r#"{"JobRole": "Manager", "DistanceFromHome": 7, "Department": "RnD", "Age": 35}"#,
        )
        .unwrap();
        let va = align_features(&a, &encoder(), &cols).unwrap();
        let vb = align_features(&b, &encoder(), &cols).unwrap();
        assert_eq!(va, vb);
        assert_eq!(va, vec![35.0, 7.0, 1.0, 1.0]);
    }

    #[test]
    fn test_unseen_category_yields_zero_block() {
        let payload = object(json!({"Department": "Legal"}));
        let cols = columns(&["Department_Sales", "Department_RnD"]);
        let vector = align_features(&payload, &encoder(), &cols).unwrap();
        assert_eq!(vector, vec![0.0, 0.0]);
    }

    #[test]
    fn test_extra_columns_are_ignored_even_if_not_numeric() {
        let payload = object(json!({"Age": 30, "Name": "Jane", "Tags": ["a"]}));
        let cols = columns(&["Age"]);
        assert_eq!(align_features(&payload, &encoder(), &cols).unwrap(), vec![30.0]);
    }

    #[test]
    fn test_non_numeric_model_column_fails() {
        let payload = object(json!({"Age": "thirty"}));
        let cols = columns(&["Age"]);
        let err = align_features(&payload, &encoder(), &cols).unwrap_err();
        assert!(matches!(err, PredictionError::Failed(msg) if msg.contains("'Age'")));
    }

    #[test]
    fn test_numeric_strings_and_bools_coerced() {
        let payload = object(json!({"Age": " 30.5 ", "OverTime": true}));
        let cols = columns(&["OverTime", "Age"]);
        assert_eq!(
            align_features(&payload, &encoder(), &cols).unwrap(),
            vec![1.0, 30.5]
        );
    }

    #[test]
    fn test_object_categorical_fails() {
        let payload = object(json!({"Department": {"name": "Sales"}}));
        let err = align_features(&payload, &encoder(), &columns(&["Age"])).unwrap_err();
        assert!(matches!(err, PredictionError::Failed(_)));
    }

    #[test]
    fn test_unfitted_encoder_reports_not_ready() {
        let mut enc = encoder();
        enc.features.retain(|f| f.name != "JobRole");
        let err = align_features(&Map::new(), &enc, &columns(&["Age"])).unwrap_err();
        assert!(matches!(err, PredictionError::EncoderNotReady));
    }
}
