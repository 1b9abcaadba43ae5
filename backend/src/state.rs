//! Application state: the configuration, the loaded model, and the class
//! list, constructed once at startup and shared by reference with every
//! request handler.

use std::sync::Mutex;

use log::{error, info, warn};

use crate::classes;
use crate::config::AppConfig;
use crate::model::SoilModel;

pub struct AppState {
    pub config: AppConfig,
    /// None when the startup load failed; the service still answers, every
    /// prediction attempt reports `ModelUnavailable`.
    pub model: Option<Mutex<SoilModel>>,
    pub classes: Vec<String>,
}

impl AppState {
    /// Load the model and class list with the degrade-don't-exit startup
    /// behavior: a missing class file falls back to the default label
    /// list, a failed model load leaves the service running with a
    /// single "Unknown" class.
    pub fn initialize(config: AppConfig) -> Self {
        let classes = classes::load_class_names_or_default(&config.class_names_path);
        info!("Loaded soil classes for prediction: {:?}", classes);

        match SoilModel::load(&config.model_path, config.variant, classes.len()) {
            Ok(model) => {
                info!(
                    "AI model {:?} loaded successfully ({:?} variant, {:?}).",
                    config.model_path,
                    config.variant,
                    model.device()
                );
                Self {
                    config,
                    model: Some(Mutex::new(model)),
                    classes,
                }
            }
            Err(err) => {
                error!("Failed to load AI model: {}", err);
                warn!(
                    "Check that {:?} and {:?} exist; run `soiltool train` to produce them. \
                     Predictions will return errors until then.",
                    config.model_path, config.class_names_path
                );
                Self {
                    config,
                    model: None,
                    classes: vec!["Unknown".to_string()],
                }
            }
        }
    }
}
