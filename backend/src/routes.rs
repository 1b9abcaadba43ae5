use std::collections::BTreeMap;
use std::path::Path;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{SecondsFormat, Utc};
use futures::{StreamExt, TryStreamExt};
use log::{error, warn};
use shared::PredictionResponse;
use uuid::Uuid;

use crate::chart;
use crate::error::PredictionError;
use crate::preprocess;
use crate::recommend;
use crate::state::AppState;

const ALLOWED_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(web::resource("/predict").route(web::post().to(handle_predict)));
}

async fn home() -> HttpResponse {
    HttpResponse::Ok().body(
        "Soil Quality Monitoring Backend is running! Send a POST request to /predict with an image.",
    )
}

/// Extension allow-list check on the uploaded filename suffix only; the
/// actual bytes are format-sniffed later during decoding.
fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

async fn handle_predict(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, PredictionError> {
    let mut saw_image_field = false;
    let mut file_name = String::new();
    let mut image_data: Vec<u8> = Vec::new();

    while let Ok(Some(mut field)) = payload.try_next().await {
        if field.name() != Some("image") {
            continue;
        }
        saw_image_field = true;
        if let Some(name) = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
        {
            file_name = name.to_string();
        }
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| PredictionError::Processing(e.to_string()))?;
            image_data.extend_from_slice(&data);
        }
    }

    if !saw_image_field {
        return Err(PredictionError::InvalidInput(
            "No image file provided in the request. Please select a file.".to_string(),
        ));
    }
    if file_name.is_empty() {
        return Err(PredictionError::InvalidInput(
            "No selected file. Please choose an image.".to_string(),
        ));
    }
    if !allowed_file(&file_name) {
        return Err(PredictionError::InvalidInput(
            "Invalid file type. Please upload a PNG, JPG, JPEG, GIF or BMP image.".to_string(),
        ));
    }

    let model = state
        .model
        .as_ref()
        .ok_or(PredictionError::ModelUnavailable)?;

    let input = preprocess::decode_and_preprocess(&image_data)?;
    let raw = {
        let model = model
            .lock()
            .map_err(|_| PredictionError::Processing("model lock poisoned".to_string()))?;
        model.predict(&input)?
    };

    let (predicted_idx, top_probability) = raw
        .probabilities
        .iter()
        .copied()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .unwrap_or((0, 0.0));

    let predicted_soil_type = state
        .classes
        .get(predicted_idx)
        .cloned()
        .unwrap_or_else(|| "Unknown".to_string());
    let confidence = round2(top_probability * 100.0);

    let (recommendations, soil_quality) = recommend::recommend(&predicted_soil_type, raw.ph);

    // Extended-variant extras: the per-class breakdown and its chart. The
    // chart is a side channel; its failure must never fail the prediction.
    let (class_confidences, chart_image) = if raw.ph.is_some() {
        let percentages: Vec<f32> = raw
            .probabilities
            .iter()
            .map(|p| round2(p * 100.0))
            .collect();
        let confidences: BTreeMap<String, f32> = state
            .classes
            .iter()
            .cloned()
            .zip(percentages.iter().copied())
            .collect();
        (Some(confidences), render_chart(&state, &percentages))
    } else {
        (None, None)
    };

    Ok(HttpResponse::Ok().json(PredictionResponse {
        predicted_soil_type,
        confidence,
        predicted_ph: raw.ph,
        soil_quality,
        class_confidences,
        recommendations,
        chart_image,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
}

fn render_chart(state: &AppState, percentages: &[f32]) -> Option<String> {
    match chart::render_confidence_chart(percentages) {
        Ok(png) => {
            if let Err(err) = persist_chart(&state.config.uploads_dir, &png) {
                warn!("Failed to save confidence chart: {}", err);
            }
            Some(BASE64.encode(&png))
        }
        Err(err) => {
            error!("Confidence chart rendering failed: {}", err);
            None
        }
    }
}

fn persist_chart(dir: &Path, png: &[u8]) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let name = format!(
        "chart_{}_{}.png",
        Utc::now().format("%Y%m%d%H%M%S"),
        Uuid::new_v4().simple()
    );
    std::fs::write(dir.join(name), png)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_is_case_insensitive_suffix_only() {
        assert!(allowed_file("soil.PNG"));
        assert!(allowed_file("a.b.jpeg"));
        assert!(allowed_file("photo.bmp"));
        assert!(!allowed_file("notes.txt"));
        assert!(!allowed_file("no_extension"));
        assert!(!allowed_file("archive.webp"));
    }

    #[test]
    fn confidence_rounding_keeps_two_decimals() {
        assert_eq!(round2(0.98765 * 100.0), 98.77);
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(1.0 * 100.0), 100.0);
    }
}
