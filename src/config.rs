use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::schema::CountdownConfig;

/// Reads and validates a YAML config. `None` yields the built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<CountdownConfig> {
    let Some(path) = path else {
        let config = CountdownConfig::default();
        config.validate()?;
        return Ok(config);
    };

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = parse_config(&contents)
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

pub fn parse_config(contents: &str) -> Result<CountdownConfig> {
    // An empty document deserializes as unit, not as an empty mapping.
    let config: CountdownConfig = if contents.trim().is_empty() {
        CountdownConfig::default()
    } else {
        serde_yaml::from_str(contents).map_err(|error| {
            let location = error
                .location()
                .map(|location| format!("line {}, column {}", location.line(), location.column()))
                .unwrap_or_else(|| "unknown location".to_owned());
            anyhow!("failed to parse yaml at {location}: {error}")
        })?
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn partial_document_keeps_defaults() {
        let config = parse_config(
            "max_frames: 10\nexpired_message: OFERTA ENCERRADA\nfonts:\n  label_size: 20\n",
        )
        .unwrap();
        assert_eq!(config.max_frames, 10);
        assert_eq!(config.expired_message.as_deref(), Some("OFERTA ENCERRADA"));
        assert_eq!(config.fonts.label_size, 20.0);
        assert_eq!(config.fonts.numeral_size, 64.0);
        assert_eq!(config.timezone, "America/Sao_Paulo");
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(parse_config("\n").unwrap(), CountdownConfig::default());
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = parse_config("canvas:\n  width: 600\n  depth: 3\n")
            .unwrap_err()
            .to_string();
        assert!(err.contains("depth"), "{err}");
    }

    #[test]
    fn validation_runs_after_parse() {
        assert!(parse_config("timezone: Nowhere/City\n").is_err());
    }

    #[test]
    fn candidates_can_be_pinned() {
        let hash = "ab".repeat(32);
        let config = parse_config(&format!(
            "fonts:\n  candidates:\n    - path: fonts/Bold.ttf\n      sha256: {hash}\n"
        ))
        .unwrap();
        assert_eq!(config.fonts.candidates.len(), 1);
        assert_eq!(config.fonts.candidates[0].path, PathBuf::from("fonts/Bold.ttf"));
        assert_eq!(config.fonts.candidates[0].sha256.as_deref(), Some(hash.as_str()));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("countdown.yaml");
        fs::write(&path, "workers: 2\n").unwrap();
        assert_eq!(load_config(Some(&path)).unwrap().workers, 2);
        assert!(load_config(Some(&dir.path().join("missing.yaml"))).is_err());
        assert_eq!(load_config(None).unwrap(), CountdownConfig::default());
    }
}
