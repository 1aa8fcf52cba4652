use super::types::*;
use crate::config::{expand_env_vars, expand_tilde};
use regex::Regex;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml_string = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string)
}

/// Parse and validate a YAML config. Missing sections and fields take their
/// defaults; a document with no content yields the default config.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    // Expand environment variables in the YAML string before parsing
    let yaml_string = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml_string)?;

    let mut config = if is_blank_document(&yaml_string) {
        Config::default()
    } else {
        serde_yaml::from_str(&yaml_string)?
    };

    expand_paths(&mut config);
    validate_config(&config)?;

    Ok(config)
}

fn is_blank_document(yaml: &str) -> bool {
    yaml.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---"
    })
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let re = Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var pattern");
    let mut unexpanded_vars: Vec<String> = re
        .captures_iter(yaml_string)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    Err(ConfigError::Validation(format!(
        "environment variables are not set: {}",
        unexpanded_vars.join(", ")
    )))
}

/// Expands tilde (~) in all PathBuf fields in the config.
fn expand_paths(config: &mut Config) {
    config.watch.directory = expand_tilde(&config.watch.directory);
    config.sink.path = expand_tilde(&config.sink.path);
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    for pattern in &config.watch.exclude {
        if let Err(e) = Regex::new(pattern) {
            errors.push(format!("watch.exclude: invalid regex '{}': {}", pattern, e));
        }
    }

    validate_nonzero("watch.poll_interval", config.watch.poll_interval, &mut errors);
    validate_nonzero(
        "sink.health_check_interval",
        config.sink.health_check_interval,
        &mut errors,
    );

    validate_identifier("sink.database", &config.sink.database, &mut errors);
    validate_identifier("sink.collection", &config.sink.collection, &mut errors);

    if config.sink.path.as_os_str().is_empty() {
        errors.push("sink.path: must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

fn validate_nonzero(context: &str, value: Duration, errors: &mut Vec<String>) {
    if value.is_zero() {
        errors.push(format!("{}: must be greater than zero", context));
    }
}

fn validate_identifier(context: &str, value: &str, errors: &mut Vec<String>) {
    if value.trim().is_empty() {
        errors.push(format!("{}: must not be empty", context));
    } else if value.contains('"') {
        errors.push(format!("{}: must not contain quotes", context));
    }
}

/// Compile the exclude patterns of a validated config
pub fn compile_excludes(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| {
                ConfigError::Validation(format!("watch.exclude: invalid regex '{}': {}", p, e))
            })
        })
        .collect()
}
