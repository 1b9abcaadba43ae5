//! Dataset hygiene batch jobs: corruption scanning, quarantine of invalid
//! files, and format conversion.
//!
//! Each job is a single sequential pass over the tree. There are no
//! retries and no rollback; an interrupted run leaves the filesystem in
//! whatever state the last processed file produced.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{ImageFormat, ImageReader};
use log::{info, warn};
use walkdir::WalkDir;

/// Extensions the corruption scan attempts to decode.
const CHECKED_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "bmp", "webp", "tiff"];

/// Extensions `clean_dataset` treats as legitimate dataset members.
const ALLOWED_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "gif", "bmp", "tiff", "webp"];

/// Source formats the converter re-encodes to JPEG.
const CONVERT_EXTENSIONS: [&str; 2] = ["webp", "tiff"];

#[derive(Debug, Default)]
pub struct CheckReport {
    pub scanned: usize,
    pub corrupted: Vec<PathBuf>,
}

#[derive(Debug, Default)]
pub struct CleanReport {
    pub scanned: usize,
    pub moved: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
pub struct ConvertReport {
    pub converted: usize,
    pub failed: usize,
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

fn decodes_cleanly(path: &Path) -> bool {
    ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .ok()
        .and_then(|reader| reader.decode().ok())
        .is_some()
}

/// Rename where possible, copy-and-delete across filesystems.
fn move_file(src: &Path, dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }
    if fs::rename(src, dst).is_err() {
        fs::copy(src, dst).with_context(|| format!("Failed to copy {:?} to {:?}", src, dst))?;
        fs::remove_file(src).with_context(|| format!("Failed to remove {:?}", src))?;
    }
    Ok(())
}

/// Walk `dir` and attempt to decode every file with an image extension.
/// Files that fail to decode are reported, not touched.
pub fn check_images(dir: &Path) -> Result<CheckReport> {
    if !dir.is_dir() {
        anyhow::bail!("Directory not found at {:?}", dir);
    }

    let mut report = CheckReport::default();
    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        match extension_of(path) {
            Some(ext) if CHECKED_EXTENSIONS.contains(&ext.as_str()) => {}
            _ => continue,
        }

        report.scanned += 1;
        if !decodes_cleanly(path) {
            info!("Found corrupted file: {:?}", path);
            report.corrupted.push(path.to_path_buf());
        }
    }

    Ok(report)
}

/// Move every invalid file (bad extension or failed decode) under `root`
/// into `quarantine`, preserving the path relative to `root`.
pub fn clean_dataset(root: &Path, quarantine: &Path) -> Result<CleanReport> {
    if !root.is_dir() {
        anyhow::bail!("Dataset directory not found at {:?}", root);
    }
    fs::create_dir_all(quarantine)
        .with_context(|| format!("Failed to create quarantine directory {:?}", quarantine))?;

    let mut report = CleanReport::default();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        report.scanned += 1;

        let reason = match extension_of(path) {
            Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => {
                if decodes_cleanly(path) {
                    continue;
                }
                "corrupted or unreadable image file"
            }
            _ => "invalid extension",
        };

        let relative = path.strip_prefix(root).unwrap_or(path);
        let destination = quarantine.join(relative);
        info!("Moving invalid file {:?} ({})", path, reason);
        match move_file(path, &destination) {
            Ok(()) => report.moved += 1,
            Err(err) => {
                warn!("Could not quarantine {:?}: {}", path, err);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Quarantine an explicit list of files. Missing entries are skipped with
/// a warning; the relative layout under `root` is preserved.
pub fn quarantine_listed(paths: &[PathBuf], root: &Path, quarantine: &Path) -> Result<CleanReport> {
    fs::create_dir_all(quarantine)
        .with_context(|| format!("Failed to create quarantine directory {:?}", quarantine))?;

    let mut report = CleanReport::default();
    for path in paths {
        report.scanned += 1;
        if !path.exists() {
            warn!("File not found, skipping: {:?}", path);
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path.as_path());
        let destination = quarantine.join(relative);
        match move_file(path, &destination) {
            Ok(()) => {
                info!("Moved {:?} to {:?}", path, destination);
                report.moved += 1;
            }
            Err(err) => {
                warn!("Could not quarantine {:?}: {}", path, err);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Re-encode every webp/tiff file under `root` as an RGB JPEG alongside
/// the original. Originals are deleted after a successful conversion
/// unless `keep_originals` is set.
pub fn convert_images(root: &Path, keep_originals: bool) -> Result<ConvertReport> {
    if !root.is_dir() {
        anyhow::bail!("Dataset directory not found at {:?}", root);
    }

    let mut report = ConvertReport::default();
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        match extension_of(path) {
            Some(ext) if CONVERT_EXTENSIONS.contains(&ext.as_str()) => {}
            _ => continue,
        }

        let jpg_path = path.with_extension("jpg");
        info!("Converting {:?} to {:?}", path, jpg_path);

        let converted = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(anyhow::Error::from)
            .and_then(|reader| reader.decode().map_err(anyhow::Error::from))
            .and_then(|img| {
                // JPEG has no alpha; flatten to RGB before encoding.
                image::DynamicImage::ImageRgb8(img.to_rgb8())
                    .save_with_format(&jpg_path, ImageFormat::Jpeg)
                    .map_err(anyhow::Error::from)
            });

        match converted {
            Ok(()) => {
                report.converted += 1;
                if !keep_originals {
                    if let Err(err) = fs::remove_file(path) {
                        warn!("Converted but could not delete original {:?}: {}", path, err);
                    }
                }
            }
            Err(err) => {
                warn!("Error converting {:?}: {}", path, err);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;

    fn write_png(path: &Path) {
        DynamicImage::new_rgb8(8, 8)
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn check_reports_truncated_images() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("good.png"));
        fs::write(dir.path().join("bad.jpg"), b"\xff\xd8\xff\xe0 truncated").unwrap();
        fs::write(dir.path().join("ignored.txt"), b"not checked").unwrap();

        let report = check_images(dir.path()).unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.corrupted.len(), 1);
        assert!(report.corrupted[0].ends_with("bad.jpg"));
    }

    #[test]
    fn clean_moves_invalid_files_preserving_layout() {
        let root = tempfile::tempdir().unwrap();
        let quarantine = tempfile::tempdir().unwrap();

        let class_dir = root.path().join("Red soil");
        fs::create_dir_all(&class_dir).unwrap();
        write_png(&class_dir.join("ok.png"));
        fs::write(class_dir.join("junk.exe"), b"mz").unwrap();
        fs::write(class_dir.join("broken.png"), b"not a png").unwrap();

        let report = clean_dataset(root.path(), quarantine.path()).unwrap();
        assert_eq!(report.moved, 2);
        assert_eq!(report.failed, 0);
        assert!(class_dir.join("ok.png").exists());
        assert!(!class_dir.join("junk.exe").exists());
        assert!(quarantine.path().join("Red soil").join("junk.exe").exists());
        assert!(quarantine.path().join("Red soil").join("broken.png").exists());
    }

    #[test]
    fn quarantine_listed_skips_missing_files() {
        let root = tempfile::tempdir().unwrap();
        let quarantine = tempfile::tempdir().unwrap();
        let present = root.path().join("present.png");
        write_png(&present);

        let report = quarantine_listed(
            &[present.clone(), root.path().join("absent.png")],
            root.path(),
            quarantine.path(),
        )
        .unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.moved, 1);
        assert!(!present.exists());
        assert!(quarantine.path().join("present.png").exists());
    }

    #[test]
    fn convert_rewrites_webp_as_jpeg() {
        let root = tempfile::tempdir().unwrap();
        let webp = root.path().join("soil.webp");
        DynamicImage::new_rgb8(8, 8)
            .save_with_format(&webp, ImageFormat::WebP)
            .unwrap();

        let report = convert_images(root.path(), false).unwrap();
        assert_eq!(report.converted, 1);
        assert!(!webp.exists());
        assert!(root.path().join("soil.jpg").exists());
    }
}
