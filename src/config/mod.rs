pub mod layer;
pub mod merge;
pub mod properties;
pub mod types;

#[cfg(test)]
mod tests;

pub use layer::{ConfigLayer, LayerSet};
pub use types::{ConfigError, ConnectionArgs, ConnectionParameters, EffectiveConfiguration};

use crate::constants::{
    CLEAN_DISABLED_KEY, DEFAULT_ENGINE, DEFAULT_LOCATIONS, ENGINE_KEY, ENV_PREFIX, LOCATIONS_KEY,
    PASSWORD_KEY, TARGET_KEY, URL_KEY, USER_KEY,
};
use std::path::Path;

/// Captures the layer stack for one invocation and resolves it into the
/// effective configuration. Layers are registered in precedence order; the
/// merge happens exactly once, at `resolve`.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    layers: LayerSet,
}

impl ConfigBuilder {
    /// Starts a stack seeded with the built-in convention defaults.
    pub fn new() -> Self {
        Self {
            layers: LayerSet::default().with(defaults_layer()),
        }
    }

    /// The properties-file layer. A missing file contributes no entries; a
    /// present-but-broken file is fatal.
    pub fn with_file(mut self, path: &Path) -> Result<Self, ConfigError> {
        if let Some(entries) = properties::load(path)? {
            self.layers.push(ConfigLayer::new("file", entries));
        }
        Ok(self)
    }

    /// The FLYRUN_-prefixed environment namespace, collected automatically.
    /// FLYRUN_URL, FLYRUN_USER and FLYRUN_PASSWORD are the individual
    /// connection conveniences; every other variable maps to the engine's
    /// camelCase key form (FLYRUN_CLEAN_DISABLED -> cleanDisabled).
    pub fn with_environment(self) -> Self {
        self.with_environment_from(std::env::vars())
    }

    pub fn with_environment_from(
        mut self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut entries: Vec<(String, String)> = vars
            .into_iter()
            .filter_map(|(name, value)| {
                let suffix = name.strip_prefix(ENV_PREFIX)?;
                (!suffix.is_empty()).then(|| (engine_key(suffix), value))
            })
            .collect();
        // Process environment iteration order is arbitrary.
        entries.sort();
        self.layers.push(ConfigLayer::new("environment", entries));
        self
    }

    /// The programmatic layer, set explicitly by calling code.
    pub fn with_overrides<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self.layers.push(ConfigLayer::new("overrides", entries));
        self
    }

    /// The final command-line layer. Only the fixed whitelist of keys can be
    /// set from the command line: url, user, password, target.
    pub fn with_cli(mut self, args: &ConnectionArgs, target: Option<&str>) -> Self {
        let mut entries = Vec::new();
        if let Some(url) = &args.url {
            entries.push((URL_KEY.to_string(), url.clone()));
        }
        if let Some(user) = &args.user {
            entries.push((USER_KEY.to_string(), user.clone()));
        }
        if let Some(password) = &args.password {
            entries.push((PASSWORD_KEY.to_string(), password.clone()));
        }
        if let Some(target) = target {
            entries.push((TARGET_KEY.to_string(), target.to_string()));
        }
        self.layers.push(ConfigLayer::new("command-line", entries));
        self
    }

    /// Read-only view of the captured layers, in precedence order.
    pub fn layers(&self) -> &LayerSet {
        &self.layers
    }

    pub fn resolve(self) -> EffectiveConfiguration {
        merge::merge(&self.layers)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn defaults_layer() -> ConfigLayer {
    ConfigLayer::new(
        "defaults",
        vec![
            (URL_KEY.to_string(), String::new()),
            (USER_KEY.to_string(), String::new()),
            (PASSWORD_KEY.to_string(), String::new()),
            (TARGET_KEY.to_string(), String::new()),
            (LOCATIONS_KEY.to_string(), DEFAULT_LOCATIONS.to_string()),
            (ENGINE_KEY.to_string(), DEFAULT_ENGINE.to_string()),
            // Destructive cleanup stays off until explicitly allowed.
            (CLEAN_DISABLED_KEY.to_string(), "true".to_string()),
        ],
    )
}

/// Maps a FLYRUN_ suffix to the engine's camelCase key form.
fn engine_key(suffix: &str) -> String {
    let mut parts = suffix.split('_').filter(|part| !part.is_empty());
    let mut key = String::new();
    if let Some(first) = parts.next() {
        key.push_str(&first.to_ascii_lowercase());
    }
    for part in parts {
        let lower = part.to_ascii_lowercase();
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            key.push(first.to_ascii_uppercase());
            key.extend(chars);
        }
    }
    key
}
