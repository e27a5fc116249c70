//! Scoring configuration loading.

use std::path::Path;

use parcel_watch_risk_models::config::ScoringConfig;

use crate::IngestError;

/// Loads the scoring configuration from `path`, or the embedded default
/// when no path is given.
///
/// Fields missing from the file take their default values.
///
/// # Errors
///
/// * [`IngestError::MissingInput`] if `path` does not exist
/// * [`IngestError::Config`] if the file is not valid TOML or fails
///   validation
pub fn load_scoring_config(path: Option<&Path>) -> Result<ScoringConfig, IngestError> {
    match path {
        Some(path) => {
            if !path.is_file() {
                return Err(IngestError::MissingInput {
                    path: path.to_path_buf(),
                });
            }
            log::info!("Loading scoring config from {}", path.display());
            Ok(ScoringConfig::from_toml_str(&std::fs::read_to_string(path)?)?)
        }
        None => Ok(ScoringConfig::embedded()?),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write_config(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "parcel_watch_config_{name}_{}.toml",
            std::process::id()
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn no_path_uses_embedded_default() {
        let config = load_scoring_config(None).unwrap();
        assert_eq!(config, ScoringConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let path = write_config("partial", "case_window_days = 90\n\n[weights]\ncase = 4.0\n");
        let config = load_scoring_config(Some(&path)).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.case_window_days, 90);
        assert!((config.weights.case - 4.0).abs() < f64::EPSILON);
        assert!((config.weights.complaint - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.thresholds, ScoringConfig::default().thresholds);
    }

    #[test]
    fn invalid_thresholds_are_rejected() {
        let path = write_config("invalid", "[thresholds]\nmoderate = 8.0\nhigh = 7.0\n");
        let err = load_scoring_config(Some(&path)).unwrap_err();
        fs::remove_file(&path).unwrap();

        assert!(matches!(err, IngestError::Config(_)));
    }

    #[test]
    fn missing_file_is_reported() {
        let path = std::env::temp_dir().join("parcel_watch_config_does_not_exist.toml");
        let err = load_scoring_config(Some(&path)).unwrap_err();
        assert!(matches!(err, IngestError::MissingInput { .. }));
    }
}
