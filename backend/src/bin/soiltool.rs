//! Offline maintenance CLI for the soil analysis service: model training,
//! corruption scanning, quarantine, and format conversion. These are
//! one-shot, single-operator batch jobs, not service infrastructure.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use backend::dataset::hygiene;
use backend::model::ModelVariant;
use backend::training::{self, TrainConfig};

#[derive(Parser, Debug)]
#[command(name = "soiltool")]
#[command(version)]
#[command(about = "Dataset hygiene and model training for the soil analysis service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train a soil model and write the model + class-name artifacts
    Train {
        /// Directory of class-labeled training images
        #[arg(short, long, default_value = "Dataset/Train")]
        data_dir: PathBuf,

        /// Output path for the model weights
        #[arg(long, default_value = "soil_model.ot")]
        model_path: PathBuf,

        /// Output path for the class-name list
        #[arg(long, default_value = "soil_classes.txt")]
        class_names_path: PathBuf,

        /// Train the classifier-only variant (no pH head)
        #[arg(long, default_value = "false")]
        classifier_only: bool,

        /// Number of training epochs
        #[arg(short, long, default_value = "10")]
        epochs: usize,

        /// Batch size
        #[arg(short, long, default_value = "32")]
        batch_size: usize,

        /// Learning rate
        #[arg(short, long, default_value = "0.001")]
        learning_rate: f64,

        /// Fraction of images held out for validation
        #[arg(long, default_value = "0.2")]
        validation_split: f64,

        /// Random seed for the train/validation split
        #[arg(long, default_value = "123")]
        seed: u64,
    },

    /// Scan a directory tree for images that fail to decode
    CheckImages {
        /// Directory to scan
        dir: PathBuf,
    },

    /// Move invalid files into a quarantine directory
    Clean {
        /// Dataset root to clean
        dir: PathBuf,

        /// Quarantine destination
        #[arg(long, default_value = "quarantine_invalid_files")]
        quarantine: PathBuf,

        /// Quarantine exactly the files listed (one path per line)
        /// instead of scanning
        #[arg(long)]
        from_list: Option<PathBuf>,
    },

    /// Re-encode webp/tiff images as JPEG
    Convert {
        /// Dataset root to convert
        dir: PathBuf,

        /// Keep the original files after conversion
        #[arg(long, default_value = "false")]
        keep_originals: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data_dir,
            model_path,
            class_names_path,
            classifier_only,
            epochs,
            batch_size,
            learning_rate,
            validation_split,
            seed,
        } => {
            let config = TrainConfig {
                data_dir,
                model_path,
                class_names_path,
                variant: if classifier_only {
                    ModelVariant::Classifier
                } else {
                    ModelVariant::DualHead
                },
                epochs,
                batch_size,
                learning_rate,
                validation_split,
                seed,
            };
            let history = training::train(&config)?;
            if let Some(last) = history.last() {
                println!(
                    "Training complete: final loss {:.4}, validation accuracy {:.2}%",
                    last.train_loss,
                    last.val_accuracy * 100.0
                );
            }
        }

        Commands::CheckImages { dir } => {
            println!("--- Checking for corrupted images in {:?} ---", dir);
            let report = hygiene::check_images(&dir)?;
            for path in &report.corrupted {
                println!("  corrupted: {:?}", path);
            }
            println!(
                "--- Check complete: {} corrupted files found out of {} ---",
                report.corrupted.len(),
                report.scanned
            );
            if report.corrupted.is_empty() {
                println!("All images checked are valid.");
            } else {
                println!("Please remove the corrupted images before training.");
            }
        }

        Commands::Clean {
            dir,
            quarantine,
            from_list,
        } => {
            let report = match from_list {
                Some(list_path) => {
                    let listed = read_path_list(&list_path)?;
                    hygiene::quarantine_listed(&listed, &dir, &quarantine)?
                }
                None => hygiene::clean_dataset(&dir, &quarantine)?,
            };
            println!(
                "--- Cleanup complete: {} of {} files moved to {:?} ({} failed) ---",
                report.moved, report.scanned, quarantine, report.failed
            );
            if report.moved > 0 {
                println!("Review the quarantine directory, then delete it once confirmed.");
            } else {
                println!("No invalid files found. Your dataset appears clean!");
            }
        }

        Commands::Convert { dir, keep_originals } => {
            let report = hygiene::convert_images(&dir, keep_originals)?;
            println!(
                "--- Conversion complete: {} files converted to JPEG ({} failed) ---",
                report.converted, report.failed
            );
            if report.converted == 0 {
                println!("No convertible files were found.");
            }
        }
    }

    Ok(())
}

fn read_path_list(path: &PathBuf) -> Result<Vec<PathBuf>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file list {:?}", path))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}
