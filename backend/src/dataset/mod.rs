//! Training dataset loading.
//!
//! The directory layout is one subdirectory per class:
//!
//! ```text
//! Dataset/Train/
//! ├── Alluvial soil/
//! │   ├── Alluvial_1.jpg
//! │   └── ...
//! ├── Black Soil/
//! └── ...
//! ```
//!
//! Class directories are discovered in sorted order; that order is the
//! class ordering the trainer persists and the service relies on.

pub mod hygiene;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tch::{Device, Tensor};
use walkdir::WalkDir;

use crate::preprocess;

/// Extensions the loader accepts; everything else in a class directory is
/// ignored (hygiene tooling exists to weed those out beforehand).
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "bmp"];

#[derive(Debug, Clone)]
pub struct ImageSample {
    pub path: PathBuf,
    pub label: usize,
}

#[derive(Debug)]
pub struct SoilDataset {
    pub classes: Vec<String>,
    pub samples: Vec<ImageSample>,
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

impl SoilDataset {
    pub fn from_directory<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.exists() {
            anyhow::bail!("Dataset directory does not exist: {:?}", root);
        }

        let mut class_dirs: Vec<String> = Vec::new();
        for entry in fs::read_dir(root)
            .with_context(|| format!("Failed to read dataset directory {:?}", root))?
        {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    if !name.starts_with('.') {
                        class_dirs.push(name.to_string());
                    }
                }
            }
        }
        class_dirs.sort();

        if class_dirs.is_empty() {
            anyhow::bail!(
                "No class directories found in {:?}. Expected structure: <root>/<class_name>/*.jpg",
                root
            );
        }

        let mut samples = Vec::new();
        for (label, class_name) in class_dirs.iter().enumerate() {
            for entry in WalkDir::new(root.join(class_name))
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path().to_path_buf();
                if has_image_extension(&path) {
                    samples.push(ImageSample { path, label });
                }
            }
        }

        if samples.is_empty() {
            anyhow::bail!("No images found under {:?}", root);
        }

        Ok(Self {
            classes: class_dirs,
            samples,
        })
    }

    /// Seeded shuffle followed by an 80/20-style split; the same seed
    /// reproduces the same partition run over run.
    pub fn split(&self, validation_fraction: f64, seed: u64) -> (Vec<&ImageSample>, Vec<&ImageSample>) {
        let mut shuffled: Vec<&ImageSample> = self.samples.iter().collect();
        let mut rng = StdRng::seed_from_u64(seed);
        shuffled.shuffle(&mut rng);

        let val_count = ((shuffled.len() as f64) * validation_fraction).round() as usize;
        let val_count = val_count.min(shuffled.len());
        let validation = shuffled.split_off(shuffled.len() - val_count);
        (shuffled, validation)
    }
}

/// Decode and stack one batch of samples into input and label tensors.
pub fn load_batch(samples: &[&ImageSample], device: Device) -> Result<(Tensor, Tensor)> {
    let mut images = Vec::with_capacity(samples.len());
    let mut labels = Vec::with_capacity(samples.len());

    for sample in samples {
        let bytes = fs::read(&sample.path)
            .with_context(|| format!("Failed to read {:?}", sample.path))?;
        let tensor = preprocess::decode_and_preprocess(&bytes)
            .with_context(|| format!("Failed to decode {:?}", sample.path))?;
        images.push(tensor);
        labels.push(sample.label as i64);
    }

    let images = Tensor::cat(&images, 0).to_device(device);
    let labels = Tensor::from_slice(&labels).to_device(device);
    Ok((images, labels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat};

    fn write_png(path: &Path) {
        DynamicImage::new_rgb8(16, 16)
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    fn sample_dataset(root: &Path) {
        for class in ["Red soil", "Clay soil"] {
            let dir = root.join(class);
            fs::create_dir_all(&dir).unwrap();
            for i in 0..5 {
                write_png(&dir.join(format!("{}_{}.png", class, i)));
            }
        }
        // Non-image noise the loader must skip.
        fs::write(root.join("Red soil").join("notes.txt"), "not an image").unwrap();
    }

    #[test]
    fn discovers_classes_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        sample_dataset(dir.path());

        let dataset = SoilDataset::from_directory(dir.path()).unwrap();
        assert_eq!(dataset.classes, vec!["Clay soil", "Red soil"]);
        assert_eq!(dataset.samples.len(), 10);
    }

    #[test]
    fn split_is_reproducible_for_a_fixed_seed() {
        let dir = tempfile::tempdir().unwrap();
        sample_dataset(dir.path());
        let dataset = SoilDataset::from_directory(dir.path()).unwrap();

        let (train_a, val_a) = dataset.split(0.2, 123);
        let (train_b, val_b) = dataset.split(0.2, 123);

        assert_eq!(val_a.len(), 2);
        assert_eq!(train_a.len(), 8);
        let paths = |v: &[&ImageSample]| v.iter().map(|s| s.path.clone()).collect::<Vec<_>>();
        assert_eq!(paths(&train_a), paths(&train_b));
        assert_eq!(paths(&val_a), paths(&val_b));
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SoilDataset::from_directory(dir.path()).is_err());
    }
}
