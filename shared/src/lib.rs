use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Coarse soil quality tier for tomato cultivation, derived from the
/// predicted soil type and whether the pH estimate sits in the tomato
/// sweet spot.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum SoilQuality {
    Excellent,
    Good,
    Okay,
    Challenging,
    Unknown,
}

/// JSON body returned by `POST /predict` on success.
///
/// The pH, quality, per-class and chart fields are only populated when the
/// loaded model carries the regression head (the dual-output variant).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PredictionResponse {
    pub predicted_soil_type: String,
    /// Percentage in [0, 100], rounded to two decimals.
    pub confidence: f32,
    #[serde(rename = "predicted_pH", skip_serializing_if = "Option::is_none")]
    pub predicted_ph: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_quality: Option<SoilQuality>,
    /// Per-class confidence percentages, keyed by class label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_confidences: Option<BTreeMap<String, f32>>,
    pub recommendations: String,
    /// Base64-encoded PNG bar chart of the per-class confidences.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_image: Option<String>,
    pub timestamp: String,
}

/// JSON body returned on any request failure.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorResponse {
    pub error: String,
}
