use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::plot::PlotStyle;
use crate::signature::SignatureConfig;

// ---------------------------------------------------------------------------
// Analysis configuration
// ---------------------------------------------------------------------------

/// Everything a run needs. Loaded from an optional JSON file, then
/// overridden from the command line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Root of the original dataset.
    pub data_dir: PathBuf,
    /// Where rendered plots go.
    pub out_dir: PathBuf,
    /// Paths below are relative to `data_dir`.
    pub labels_file: PathBuf,
    pub submission_file: PathBuf,
    pub features_archive: PathBuf,
    /// Directory prefix of feature tables inside the archive.
    pub archive_prefix: String,

    pub digits: u32,
    pub mass_min: f64,
    pub mass_max: f64,

    pub max_lines: usize,
    pub line_offset: f64,
    pub image_width: u32,
    pub image_height: u32,

    /// Leave zero-signal samples out of the plot instead of failing.
    pub skip_zero_signal: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/orig"),
            out_dir: PathBuf::from("data/proc/phase1"),
            labels_file: PathBuf::from("phase1/train_labels.csv"),
            submission_file: PathBuf::from("submission_format.csv"),
            features_archive: PathBuf::from("phase1/train_features.zip"),
            archive_prefix: "train_features/".to_string(),
            digits: 2,
            mass_min: 5.0,
            mass_max: 600.0,
            max_lines: 10,
            line_offset: 0.5,
            image_width: 1600,
            image_height: 1000,
            skip_zero_signal: false,
        }
    }
}

impl AnalysisConfig {
    /// Read a JSON config file; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn labels_path(&self) -> PathBuf {
        self.data_dir.join(&self.labels_file)
    }

    pub fn submission_path(&self) -> PathBuf {
        self.data_dir.join(&self.submission_file)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.data_dir.join(&self.features_archive)
    }

    pub fn signature(&self) -> SignatureConfig {
        SignatureConfig {
            digits: self.digits,
            mass_min: self.mass_min,
            mass_max: self.mass_max,
        }
    }

    pub fn plot_style(&self) -> PlotStyle {
        PlotStyle {
            width: self.image_width,
            height: self.image_height,
            max_lines: self.max_lines,
            line_offset: self.line_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: AnalysisConfig =
            serde_json::from_str(r#"{ "digits": 1, "data_dir": "/tmp/mars" }"#).unwrap();
        assert_eq!(cfg.digits, 1);
        assert_eq!(cfg.labels_path(), PathBuf::from("/tmp/mars/phase1/train_labels.csv"));
        assert_eq!(cfg.mass_max, 600.0);
        assert_eq!(cfg.signature().digits, 1);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<AnalysisConfig>(r#"{ "digitz": 1 }"#).is_err());
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("massprint.json");
        std::fs::write(&path, r#"{ "max_lines": 3, "skip_zero_signal": true }"#).unwrap();
        let cfg = AnalysisConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.plot_style().max_lines, 3);
        assert!(cfg.skip_zero_signal);
    }
}
