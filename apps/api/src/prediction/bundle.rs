use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::prediction::encoder::OneHotEncoder;
use crate::prediction::pipeline::{align_features, CATEGORICAL_FIELDS};
use crate::prediction::regressor::{Regressor, RegressorArtifact};
use crate::prediction::PredictionError;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid model artifact: {0}")]
    Invalid(String),
}

/// Locations of the three serialized training artifacts.
#[derive(Debug, Clone)]
pub struct BundlePaths {
    pub model: PathBuf,
    pub encoder: PathBuf,
    pub columns: PathBuf,
}

/// Regressor, fitted encoder and expected column order. Built once at startup,
/// shared read-only behind an `Arc` for the process lifetime.
pub struct ModelBundle {
    regressor: Box<dyn Regressor>,
    encoder: OneHotEncoder,
    model_columns: Vec<String>,
}

impl fmt::Debug for ModelBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBundle")
            .field("n_features", &self.regressor.n_features())
            .field("encoder", &self.encoder)
            .field("model_columns", &self.model_columns)
            .finish()
    }
}

impl ModelBundle {
    /// Assembles a bundle from already-parsed parts, validating the encoder
    /// vocabulary and that the regressor and the column list agree.
    pub fn new(
        regressor: RegressorArtifact,
        encoder: OneHotEncoder,
        model_columns: Vec<String>,
    ) -> Result<Self, BundleError> {
        if model_columns.is_empty() {
            return Err(BundleError::Invalid("model column list is empty".into()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = model_columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(BundleError::Invalid(format!("duplicate model column '{dup}'")));
        }
        encoder.validate().map_err(BundleError::Invalid)?;
        regressor
            .validate(model_columns.len())
            .map_err(BundleError::Invalid)?;

        Ok(Self {
            regressor: regressor.into_regressor(model_columns.len()),
            encoder,
            model_columns,
        })
    }

    pub fn load(paths: &BundlePaths) -> Result<Self, BundleError> {
        let regressor: RegressorArtifact = read_json(&paths.model)?;
        let encoder: OneHotEncoder = read_json(&paths.encoder)?;
        let model_columns: Vec<String> = read_json(&paths.columns)?;

        let bundle = Self::new(regressor, encoder, model_columns)?;
        info!(
            "Loaded model bundle: {} columns, encoder fitted: {}",
            bundle.model_columns.len(),
            bundle.encoder.is_fitted_for(&CATEGORICAL_FIELDS)
        );
        Ok(bundle)
    }

    pub fn model_columns(&self) -> &[String] {
        &self.model_columns
    }

    /// Aligns the payload to the model columns and runs the regressor.
    pub fn predict(&self, payload: &Map<String, Value>) -> Result<f64, PredictionError> {
        let features = align_features(payload, &self.encoder, &self.model_columns)?;
        debug!("Aligned feature vector: {features:?}");

        let predicted = self.regressor.predict(&features)?;
        if !predicted.is_finite() {
            return Err(PredictionError::Failed(format!(
                "model produced a non-finite prediction ({predicted})"
            )));
        }
        Ok(predicted)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, BundleError> {
    let raw = std::fs::read_to_string(path).map_err(|source| BundleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| BundleError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    /// A small linear bundle shared by handler tests.
    pub(crate) fn sample_bundle() -> ModelBundle {
        let regressor: RegressorArtifact = serde_json::from_value(json!({
            "kind": "linear",
            "intercept": 1000.0,
            "coefficients": [100.0, 2500.0, 500.0]
        }))
        .unwrap();
        let encoder: OneHotEncoder = serde_json::from_value(json!({
            "features": [
                { "name": "Department", "categories": ["Sales", "RnD"] },
                { "name": "EducationField", "categories": ["Medical", "Other"] },
                { "name": "JobRole", "categories": ["Manager", "Engineer"] }
            ]
        }))
        .unwrap();
        let columns = vec![
            "Age".to_string(),
            "Department_Sales".to_string(),
            "Department_RnD".to_string(),
        ];
        ModelBundle::new(regressor, encoder, columns).unwrap()
    }

    fn write(dir: &Path, name: &str, value: Value) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, value.to_string()).unwrap();
        path
    }

    #[test]
    fn test_reference_prediction() {
        let bundle = sample_bundle();
        let payload = json!({"Department": "Sales", "Age": 30});
        let y = bundle.predict(payload.as_object().unwrap()).unwrap();
        // 1000 + 30*100 + 1*2500 + 0*500
        assert!((y - 6500.0).abs() < 1e-9);
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let paths = BundlePaths {
            model: write(
                dir.path(),
                "salary_model.json",
                json!({"kind": "linear", "intercept": 0.0, "coefficients": [2.0]}),
            ),
            encoder: write(
                dir.path(),
                "encoder.json",
                json!({"features": [
                    {"name": "Department", "categories": ["Sales"]},
                    {"name": "EducationField", "categories": ["Medical"]},
                    {"name": "JobRole", "categories": ["Manager"]}
                ]}),
            ),
            columns: write(dir.path(), "model_columns.json", json!(["Age"])),
        };
        let bundle = ModelBundle::load(&paths).unwrap();
        assert_eq!(bundle.model_columns(), &["Age".to_string()]);
        let y = bundle.predict(json!({"Age": 21}).as_object().unwrap()).unwrap();
        assert!((y - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = BundlePaths {
            model: dir.path().join("nope.json"),
            encoder: dir.path().join("encoder.json"),
            columns: dir.path().join("columns.json"),
        };
        assert!(matches!(
            ModelBundle::load(&paths),
            Err(BundleError::Io { .. })
        ));
    }

    #[test]
    fn test_new_rejects_duplicate_columns() {
        let regressor: RegressorArtifact = serde_json::from_value(json!({
            "kind": "linear", "coefficients": [1.0, 1.0]
        }))
        .unwrap();
        let encoder: OneHotEncoder = serde_json::from_value(json!({"features": []})).unwrap();
        let err = ModelBundle::new(regressor, encoder, vec!["Age".into(), "Age".into()]).unwrap_err();
        assert!(matches!(err, BundleError::Invalid(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn test_load_rejects_duplicate_encoder_category() {
        let dir = tempfile::tempdir().unwrap();
        let paths = BundlePaths {
            model: write(
                dir.path(),
                "salary_model.json",
                json!({"kind": "linear", "coefficients": [1.0]}),
            ),
            encoder: write(
                dir.path(),
                "encoder.json",
                json!({"features": [
                    {"name": "Department", "categories": ["Sales", "Sales"]}
                ]}),
            ),
            columns: write(dir.path(), "model_columns.json", json!(["Age"])),
        };
        let err = ModelBundle::load(&paths).unwrap_err();
        assert!(matches!(err, BundleError::Invalid(msg) if msg.contains("'Sales'")));
    }

    #[test]
    fn test_unfitted_encoder_still_loads_but_cannot_predict() {
        let regressor: RegressorArtifact = serde_json::from_value(json!({
            "kind": "linear", "coefficients": [1.0]
        }))
        .unwrap();
        let encoder: OneHotEncoder = serde_json::from_value(json!({"features": []})).unwrap();
        let bundle = ModelBundle::new(regressor, encoder, vec!["Age".into()]).unwrap();
        let err = bundle.predict(&Map::new()).unwrap_err();
        assert!(matches!(err, PredictionError::EncoderNotReady));
    }
}
