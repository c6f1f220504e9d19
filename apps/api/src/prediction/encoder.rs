//! One-hot encoder for the categorical employee attributes.
//!
//! The vocabulary is fitted at training time and shipped as `encoder.json`:
//!
//! ```json
//! {
//!   "features": [
//!     { "name": "Department", "categories": ["Human Resources", "Sales"] }
//!   ],
//!   "handle_unknown": "ignore"
//! }
//! ```
//!
//! Output columns are named `<field>_<category>`, fields in the order requested
//! by the caller and categories in fitted order.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::prediction::PredictionError;

/// What to do with a category that was not seen during fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    /// Emit an all-zero indicator block for the field.
    #[default]
    Ignore,
    /// Reject the payload.
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodedFeature {
    pub name: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneHotEncoder {
    #[serde(default)]
    pub features: Vec<EncodedFeature>,
    #[serde(default)]
    pub handle_unknown: HandleUnknown,
}

impl OneHotEncoder {
    /// Rejects vocabularies that would emit the same output column twice:
    /// a field listed more than once, or a category repeated within a field.
    pub fn validate(&self) -> Result<(), String> {
        let mut names = HashSet::new();
        for feature in &self.features {
            if !names.insert(feature.name.as_str()) {
                return Err(format!("duplicate encoder feature '{}'", feature.name));
            }
            let mut seen = HashSet::new();
            if let Some(dup) = feature.categories.iter().find(|c| !seen.insert(c.as_str())) {
                return Err(format!(
                    "duplicate category '{dup}' in encoder feature '{}'",
                    feature.name
                ));
            }
        }
        Ok(())
    }

    /// True when every requested field has a non-empty fitted vocabulary.
    pub fn is_fitted_for(&self, fields: &[&str]) -> bool {
        fields.iter().all(|field| {
            self.vocabulary(field)
                .is_some_and(|categories| !categories.is_empty())
        })
    }

    pub fn vocabulary(&self, field: &str) -> Option<&[String]> {
        self.features
            .iter()
            .find(|f| f.name == field)
            .map(|f| f.categories.as_slice())
    }

    /// Names of every output column, in transform order.
    pub fn feature_names_out(&self, fields: &[&str]) -> Vec<String> {
        fields
            .iter()
            .flat_map(|field| {
                self.vocabulary(field)
                    .unwrap_or_default()
                    .iter()
                    .map(move |category| format!("{field}_{category}"))
            })
            .collect()
    }

    /// Encodes one value per field into a flat block of `(column, indicator)` pairs.
    ///
    /// `values` must line up with `fields`. Callers are expected to check
    /// [`is_fitted_for`](Self::is_fitted_for) first; a missing vocabulary here
    /// surfaces as [`PredictionError::EncoderNotReady`].
    pub fn transform(
        &self,
        fields: &[&str],
        values: &[String],
    ) -> Result<Vec<(String, f64)>, PredictionError> {
        if fields.len() != values.len() {
            return Err(PredictionError::Failed(format!(
                "encoder expected {} categorical values, got {}",
                fields.len(),
                values.len()
            )));
        }

        let mut block = Vec::with_capacity(self.feature_names_out(fields).len());
        for (field, value) in fields.iter().zip(values) {
            let categories = self
                .vocabulary(field)
                .filter(|c| !c.is_empty())
                .ok_or(PredictionError::EncoderNotReady)?;

            let known = categories.iter().any(|c| c == value);
            if !known && self.handle_unknown == HandleUnknown::Error {
                return Err(PredictionError::Failed(format!(
                    "Found unknown category '{value}' in column '{field}' during transform"
                )));
            }

            for category in categories {
                let hot = if category == value { 1.0 } else { 0.0 };
                block.push((format!("{field}_{category}"), hot));
            }
        }
        Ok(block)
    }
}
