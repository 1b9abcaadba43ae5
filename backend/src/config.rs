use std::env;
use std::path::PathBuf;

use crate::model::ModelVariant;

/// Runtime configuration, read once from the environment at startup and
/// handed to the application state. Defaults match the artifact names the
/// trainer writes.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub model_path: PathBuf,
    pub class_names_path: PathBuf,
    pub variant: ModelVariant,
    pub uploads_dir: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("soil_model.ot"),
            class_names_path: PathBuf::from("soil_classes.txt"),
            variant: ModelVariant::DualHead,
            uploads_dir: PathBuf::from("uploads"),
            host: "0.0.0.0".to_string(),
            port: 8081,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = env::var("MODEL_PATH") {
            config.model_path = PathBuf::from(path);
        }
        if let Ok(path) = env::var("CLASS_NAMES_PATH") {
            config.class_names_path = PathBuf::from(path);
        }
        if let Ok(variant) = env::var("MODEL_VARIANT") {
            match ModelVariant::parse(&variant) {
                Some(v) => config.variant = v,
                None => log::warn!(
                    "Unrecognized MODEL_VARIANT {:?}, keeping {:?}",
                    variant,
                    config.variant
                ),
            }
        }
        if let Ok(dir) = env::var("UPLOADS_DIR") {
            config.uploads_dir = PathBuf::from(dir);
        }
        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }
        if let Ok(port) = env::var("PORT") {
            match port.parse() {
                Ok(p) => config.port = p,
                Err(_) => log::warn!("Invalid PORT {:?}, keeping {}", port, config.port),
            }
        }

        config
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_trainer_artifacts() {
        let config = AppConfig::default();
        assert_eq!(config.model_path, PathBuf::from("soil_model.ot"));
        assert_eq!(config.class_names_path, PathBuf::from("soil_classes.txt"));
        assert_eq!(config.variant, ModelVariant::DualHead);
        assert_eq!(config.bind_address(), "0.0.0.0:8081");
    }
}
