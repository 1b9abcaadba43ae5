//! Offline model training.
//!
//! Fits a `SoilNet` against a directory-structured dataset and persists
//! the two sibling artifacts the service loads at startup: the VarStore
//! weights and the class-name list in discovered order.

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tch::nn::OptimizerConfig;
use tch::{nn, Device, Tensor};

use crate::classes;
use crate::dataset::{load_batch, ImageSample, SoilDataset};
use crate::model::{ModelVariant, SoilNet};

#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub data_dir: PathBuf,
    pub model_path: PathBuf,
    pub class_names_path: PathBuf,
    pub variant: ModelVariant,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub validation_split: f64,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("Dataset/Train"),
            model_path: PathBuf::from("soil_model.ot"),
            class_names_path: PathBuf::from("soil_classes.txt"),
            variant: ModelVariant::DualHead,
            epochs: 10,
            batch_size: 32,
            learning_rate: 1e-3,
            validation_split: 0.2,
            seed: 123,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochStats {
    pub epoch: usize,
    pub train_loss: f64,
    pub val_accuracy: f64,
}

/// Synthetic pH targets for the regression head, drawn uniformly from
/// [6.0, 7.0]. Placeholder data, not measured soil pH.
fn synthetic_ph_targets(count: usize, rng: &mut StdRng, device: Device) -> Tensor {
    let targets: Vec<f32> = (0..count).map(|_| rng.random_range(6.0f32..7.0)).collect();
    Tensor::from_slice(&targets).to_device(device)
}

pub fn train(config: &TrainConfig) -> Result<Vec<EpochStats>> {
    let dataset = SoilDataset::from_directory(&config.data_dir)?;
    info!("Detected classes from dataset: {:?}", dataset.classes);
    info!("Loaded {} images", dataset.samples.len());

    let (mut train_samples, val_samples) = dataset.split(config.validation_split, config.seed);
    info!(
        "Split: {} training / {} validation (seed {})",
        train_samples.len(),
        val_samples.len(),
        config.seed
    );

    if config.variant.has_ph_head() {
        warn!(
            "pH regression targets are synthetic placeholders drawn uniformly from [6.0, 7.0], \
             not measured soil pH. Do not treat the trained pH head as calibrated."
        );
    }

    let device = Device::cuda_if_available();
    let vs = nn::VarStore::new(device);
    let net = SoilNet::new(&vs.root(), config.variant, dataset.classes.len() as i64);
    let mut opt = nn::Adam::default()
        .build(&vs, config.learning_rate)
        .context("Failed to build optimizer")?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut history = Vec::with_capacity(config.epochs);

    for epoch in 1..=config.epochs {
        train_samples.shuffle(&mut rng);

        let mut epoch_loss = 0.0;
        let mut batches = 0;
        for batch in train_samples.chunks(config.batch_size) {
            let (images, labels) = load_batch(batch, device)?;
            let (logits, ph) = net.forward(&images, true);

            let mut loss = logits.cross_entropy_for_logits(&labels);
            if let Some(ph_pred) = ph {
                let targets = synthetic_ph_targets(batch.len(), &mut rng, device);
                loss = loss + ph_pred.mse_loss(&targets, tch::Reduction::Mean);
            }

            opt.backward_step(&loss);
            epoch_loss += loss.double_value(&[]);
            batches += 1;
        }

        let train_loss = if batches > 0 { epoch_loss / batches as f64 } else { 0.0 };
        let val_accuracy = evaluate(&net, &val_samples, config.batch_size, device)?;

        info!(
            "Epoch {}/{}: train loss {:.4}, validation accuracy {:.2}%",
            epoch,
            config.epochs,
            train_loss,
            val_accuracy * 100.0
        );
        history.push(EpochStats {
            epoch,
            train_loss,
            val_accuracy,
        });
    }

    vs.save(&config.model_path)
        .with_context(|| format!("Failed to save model to {:?}", config.model_path))?;
    classes::save_class_names(&config.class_names_path, &dataset.classes)
        .with_context(|| format!("Failed to save class names to {:?}", config.class_names_path))?;

    let history_path = config.model_path.with_extension("history.json");
    let history_json = serde_json::to_string_pretty(&history)?;
    std::fs::write(&history_path, history_json)
        .with_context(|| format!("Failed to save training history to {:?}", history_path))?;

    info!(
        "Saved model to {:?}, class names to {:?}, history to {:?}",
        config.model_path, config.class_names_path, history_path
    );

    Ok(history)
}

fn evaluate(
    net: &SoilNet,
    samples: &[&ImageSample],
    batch_size: usize,
    device: Device,
) -> Result<f64> {
    if samples.is_empty() {
        return Ok(0.0);
    }

    let mut correct = 0i64;
    for batch in samples.chunks(batch_size) {
        let (images, labels) = load_batch(batch, device)?;
        let hits = tch::no_grad(|| {
            let (logits, _) = net.forward(&images, false);
            logits
                .argmax(-1, false)
                .eq_tensor(&labels)
                .sum(tch::Kind::Int64)
                .int64_value(&[])
        });
        correct += hits;
    }

    Ok(correct as f64 / samples.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat};
    use std::fs;

    fn tiny_dataset(root: &std::path::Path) {
        for class in ["Clay soil", "Red soil"] {
            let dir = root.join(class);
            fs::create_dir_all(&dir).unwrap();
            for i in 0..3 {
                DynamicImage::new_rgb8(32, 32)
                    .save_with_format(dir.join(format!("{}.png", i)), ImageFormat::Png)
                    .unwrap();
            }
        }
    }

    #[test]
    fn one_epoch_produces_loadable_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        tiny_dataset(dir.path());

        let config = TrainConfig {
            data_dir: dir.path().to_path_buf(),
            model_path: dir.path().join("soil_model.ot"),
            class_names_path: dir.path().join("soil_classes.txt"),
            epochs: 1,
            batch_size: 2,
            ..TrainConfig::default()
        };

        let history = train(&config).unwrap();
        assert_eq!(history.len(), 1);
        assert!(config.model_path.exists());

        let saved = classes::load_class_names(&config.class_names_path).unwrap();
        assert_eq!(saved, vec!["Clay soil", "Red soil"]);

        // The service must be able to load what the trainer wrote.
        let model =
            crate::model::SoilModel::load(&config.model_path, config.variant, saved.len()).unwrap();
        let input = Tensor::zeros([1, 3, 224, 224], (tch::Kind::Float, Device::Cpu));
        let raw = model.predict(&input).unwrap();
        assert_eq!(raw.probabilities.len(), 2);
        assert!(raw.ph.is_some());
    }

    #[test]
    fn synthetic_targets_stay_in_placeholder_band() {
        let mut rng = StdRng::seed_from_u64(7);
        let targets = synthetic_ph_targets(64, &mut rng, Device::Cpu);
        assert!(targets.min().double_value(&[]) >= 6.0);
        assert!(targets.max().double_value(&[]) <= 7.0);
    }
}
