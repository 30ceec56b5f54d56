//! Model configuration loading.
//!
//! The YAML body is parsed as written, so period labels, chain names and
//! variant names keep their case. `OSO_`-prefixed environment variables
//! then override individual settings, using `__` between nested keys
//! (`OSO_ALLOCATION__BUDGET=5000`). An override matches an existing key
//! case-insensitively.

use std::path::Path;

use config::{Config, Environment, Map, Source, Value};
use oso_core::config::{ModelConfig, ModelConfigFile};
use oso_core::error::ConfigError;
use serde_yaml::{Mapping, Value as Yaml};
use tracing::debug;

/// Environment variable prefix for overrides.
pub const ENV_PREFIX: &str = "OSO";

/// Load and validate the model configuration at `path`.
pub fn load_model_config(path: impl AsRef<Path>) -> Result<ModelConfig, ConfigError> {
    load_with_env(path.as_ref(), None)
}

/// Load `path`, taking overrides from `env` instead of the process
/// environment when given.
fn load_with_env(
    path: &Path,
    env: Option<Map<String, String>>,
) -> Result<ModelConfig, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
    let mut document: Yaml =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Load(e.to_string()))?;

    let overrides = Config::builder()
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .source(env),
        )
        .build()
        .and_then(|settings| settings.collect())
        .map_err(|e| ConfigError::Load(e.to_string()))?;
    if !overrides.is_empty() {
        debug!(count = overrides.len(), "applying environment overrides");
        apply_overrides(&mut document, overrides)?;
    }

    let file: ModelConfigFile =
        serde_yaml::from_value(document).map_err(|e| ConfigError::Load(e.to_string()))?;
    let model = ModelConfig::try_from(file)?;

    debug!(
        path = %path.display(),
        metrics = model.simulation.metrics.len(),
        chains = model.simulation.chains.len(),
        allocation = model.allocation.is_some(),
        "loaded model config"
    );
    Ok(model)
}

/// Merge the nested override table into `document`.
///
/// Leaf values are reparsed as YAML scalars so `5000` lands as a number.
fn apply_overrides(document: &mut Yaml, overrides: Map<String, Value>) -> Result<(), ConfigError> {
    if !document.is_mapping() {
        *document = Yaml::Mapping(Mapping::new());
    }
    let Yaml::Mapping(map) = document else {
        return Ok(());
    };

    for (key, value) in overrides {
        let slot = map
            .keys()
            .find(|k| k.as_str().is_some_and(|s| s.eq_ignore_ascii_case(&key)))
            .cloned()
            .unwrap_or_else(|| Yaml::String(key.clone()));

        match value.clone().into_table() {
            Ok(table) => {
                if !map.contains_key(&slot) {
                    map.insert(slot.clone(), Yaml::Mapping(Mapping::new()));
                }
                if let Some(child) = map.get_mut(&slot) {
                    apply_overrides(child, table)?;
                }
            }
            Err(_) => {
                let raw = value
                    .into_string()
                    .map_err(|e| ConfigError::Load(format!("{ENV_PREFIX} override {key}: {e}")))?;
                let scalar = serde_yaml::from_str(&raw).unwrap_or(Yaml::String(raw));
                map.insert(slot, scalar);
            }
        }
    }
    Ok(())
}

/// Check that both snapshot files referenced by `model` exist.
pub fn validate_paths(model: &ModelConfig) -> Result<(), ConfigError> {
    for path in [
        model.data_snapshot.projects_path(),
        model.data_snapshot.metrics_path(),
    ] {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
    }
    Ok(())
}
