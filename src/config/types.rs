use crate::constants::{PASSWORD_KEY, URL_KEY, USER_KEY};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// The single merged key/value map used for one operation invocation.
/// Iteration order is the key order, so identical layer contents always
/// render identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectiveConfiguration {
    entries: BTreeMap<String, String>,
}

impl EffectiveConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn take(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    /// Removes `key`, treating an empty value as absent. The built-in defaults
    /// layer seeds several keys with empty strings so that the override law
    /// applies uniformly; extraction is where "empty" becomes "not set".
    pub fn take_nonempty(&mut self, key: &str) -> Option<String> {
        self.take(key).filter(|value| !value.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for EffectiveConfiguration {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Database connection parameters, handed to the engine through its dedicated
/// connection channel rather than the generic parameter map.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParameters {
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl ConnectionParameters {
    /// Pulls the connection keys out of the merged configuration. The keys are
    /// removed so that credentials never ride along in the generic map.
    pub fn extract(configuration: &mut EffectiveConfiguration) -> Result<Self, ConfigError> {
        let url = configuration
            .take_nonempty(URL_KEY)
            .ok_or(ConfigError::MissingUrl)?;
        let user = configuration.take_nonempty(USER_KEY);
        let password = configuration.take_nonempty(PASSWORD_KEY);
        Ok(Self {
            url,
            user,
            password,
        })
    }

    /// The connection url with any inline password masked, safe for output.
    pub fn display_url(&self) -> String {
        mask_url_password(&self.url)
    }
}

// The password must never appear in logs, including Debug output.
impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("url", &mask_url_password(&self.url))
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Mask the password in a database URL for display.
pub fn mask_url_password(url: &str) -> String {
    let Some((protocol, rest)) = url.split_once("://") else {
        return url.to_string();
    };

    // user:pass@host -> user:***@host
    if let Some((user_info, host_and_path)) = rest.split_once('@')
        && let Some((username, _)) = user_info.split_once(':')
    {
        return format!("{}://{}:***@{}", protocol, username, host_and_path);
    }

    url.to_string()
}

/// Connection flags shared by every operation subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct ConnectionArgs {
    #[arg(long, help = "Database JDBC URL")]
    pub url: Option<String>,

    #[arg(long, help = "Database user")]
    pub user: Option<String>,

    #[arg(long, help = "Database password")]
    pub password: Option<String>,
}

/// Configuration failures are fatal and surface before any dispatch work; an
/// operation that hits one never connects to anything.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no database url configured (set `url` in the configuration file, FLYRUN_URL, or --url)")]
    MissingUrl,

    #[error("failed to read configuration file {path}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration file {path} is not valid UTF-8")]
    InvalidEncoding { path: PathBuf },

    #[error("malformed configuration file {path}: line {line} has no `=` separator")]
    MalformedLine { path: PathBuf, line: usize },

    #[error("clean is disabled (set cleanDisabled=false to allow dropping schema objects)")]
    CleanDisabled,
}
