//! Class-name list handling.
//!
//! The trainer writes one label per line, in the discovered directory
//! order; the service reads them back in the same order so that the
//! classifier's arg-max index maps to the label it was trained against.

use std::fs;
use std::io;
use std::path::Path;

use log::warn;

/// Labels used when the class-name file is missing but a model loaded.
pub const DEFAULT_SOIL_CLASSES: [&str; 4] =
    ["Alluvial soil", "Black Soil", "Clay soil", "Red soil"];

pub fn load_class_names(path: &Path) -> io::Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Startup read with the original fallback: a missing or unreadable file
/// degrades to the default four-class list rather than refusing to start.
pub fn load_class_names_or_default(path: &Path) -> Vec<String> {
    match load_class_names(path) {
        Ok(classes) if !classes.is_empty() => classes,
        Ok(_) => {
            warn!("Class names file {:?} is empty. Using the default class list.", path);
            default_class_list()
        }
        Err(err) => {
            warn!(
                "Class names file {:?} not found ({}). Please ensure the trainer ran successfully. \
                 Using the default class list.",
                path, err
            );
            default_class_list()
        }
    }
}

pub fn default_class_list() -> Vec<String> {
    DEFAULT_SOIL_CLASSES.iter().map(|s| s.to_string()).collect()
}

pub fn save_class_names(path: &Path, names: &[String]) -> io::Result<()> {
    let mut contents = String::new();
    for name in names {
        contents.push_str(name);
        contents.push('\n');
    }
    fs::write(path, contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("soil_classes.txt");
        let names: Vec<String> = DEFAULT_SOIL_CLASSES.iter().map(|s| s.to_string()).collect();

        save_class_names(&path, &names).unwrap();
        let loaded = load_class_names(&path).unwrap();

        assert_eq!(loaded, names);
    }

    #[test]
    fn skips_blank_lines_and_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("soil_classes.txt");
        fs::write(&path, "Alluvial soil\n\n  Black Soil  \n").unwrap();

        let loaded = load_class_names(&path).unwrap();
        assert_eq!(loaded, vec!["Alluvial soil", "Black Soil"]);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_class_names_or_default(&dir.path().join("nope.txt"));
        assert_eq!(loaded, default_class_list());
    }
}
