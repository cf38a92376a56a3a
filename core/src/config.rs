//! Layered configuration.
//!
//! Precedence, later layers winning:
//! 1. Defaults ([`MigrationConfig::default`])
//! 2. TOML file (explicit path, else `./listmover.toml` when present)
//! 3. Environment (`LISTMOVER_*`)
//! 4. Caller overrides ([`ConfigOverrides`], filled from CLI flags)
//!
//! ```toml
//! target_collection_name = "Cart and Save For Later"
//! popup_timeout_ms = 7000
//!
//! [selectors]
//! saved_item_container = ".sc-list-item"
//! ```

use std::env;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

pub const DEFAULT_TARGET_COLLECTION: &str = "Cart and Save For Later";
pub const DEFAULT_CONFIG_FILENAME: &str = "listmover.toml";
pub const DEFAULT_ENV_PREFIX: &str = "LISTMOVER";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error loading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parsing error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid value for ${var}: '{value}' (expected: {expected})")]
    InvalidEnvValue {
        var: String,
        value: String,
        expected: &'static str,
    },

    #[error("config validation error: {0}")]
    Validation(String),
}

/// CSS selectors describing the document the workflow drives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// Attribute carrying the item identifier on item containers.
    pub identifier_attribute: String,
    pub cart_item_container: String,
    pub save_for_later: String,
    pub saved_item_container: String,
    pub add_to_list: String,
    /// Becomes visible once the list popup has rendered its entries.
    pub popup_marker: String,
    pub popup_entry: String,
    /// Label element inside a popup entry.
    pub popup_entry_label: String,
    /// Deletion control scoped to saved-for-later items. Containers also
    /// expose other delete controls, so this must stay specific.
    pub delete_saved: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            identifier_attribute: "data-asin".to_string(),
            cart_item_container: "[data-asin]".to_string(),
            save_for_later: r#"input[name^="submit.save-for-later"]"#.to_string(),
            saved_item_container: ".sc-list-item".to_string(),
            add_to_list: r#"input[name^="submit.add-to-list-popover"]"#.to_string(),
            popup_marker: "a.a-dropdown-link span.cldd-list-name".to_string(),
            popup_entry: "a.a-dropdown-link".to_string(),
            popup_entry_label: "span.cldd-list-name".to_string(),
            delete_saved: r#"input[type="submit"][name^="submit.delete-saved."]"#.to_string(),
        }
    }
}

impl Selectors {
    fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("identifier_attribute", &self.identifier_attribute),
            ("cart_item_container", &self.cart_item_container),
            ("save_for_later", &self.save_for_later),
            ("saved_item_container", &self.saved_item_container),
            ("add_to_list", &self.add_to_list),
            ("popup_marker", &self.popup_marker),
            ("popup_entry", &self.popup_entry),
            ("popup_entry_label", &self.popup_entry_label),
            ("delete_saved", &self.delete_saved),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "selectors.{name} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Popup entry label to match exactly (case-sensitive, not trimmed).
    pub target_collection_name: String,
    /// Pause after each committed action before the next query.
    pub settle_pause_ms: u64,
    /// Pause between scrolling a cart control into view and activating it.
    pub scroll_pause_ms: u64,
    pub popup_timeout_ms: u64,
    pub delete_retry_pause_ms: u64,
    /// Total deletion attempts per promoted item.
    pub max_delete_retries: u32,
    /// Skip list promotion when the cart stage aborted.
    pub stop_after_cart_abort: bool,
    /// Directory the JSON file sink writes into.
    pub log_dir: PathBuf,
    pub selectors: Selectors,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            target_collection_name: DEFAULT_TARGET_COLLECTION.to_string(),
            settle_pause_ms: 300,
            scroll_pause_ms: 100,
            popup_timeout_ms: 7_000,
            delete_retry_pause_ms: 300,
            max_delete_retries: 3,
            stop_after_cart_abort: false,
            log_dir: PathBuf::from("logs"),
            selectors: Selectors::default(),
        }
    }
}

impl MigrationConfig {
    pub fn settle_pause(&self) -> Duration {
        Duration::from_millis(self.settle_pause_ms)
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }

    pub fn popup_timeout(&self) -> Duration {
        Duration::from_millis(self.popup_timeout_ms)
    }

    pub fn delete_retry_pause(&self) -> Duration {
        Duration::from_millis(self.delete_retry_pause_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_collection_name.is_empty() {
            return Err(ConfigError::Validation(
                "target_collection_name must not be empty".to_string(),
            ));
        }
        if self.max_delete_retries == 0 {
            return Err(ConfigError::Validation(
                "max_delete_retries must be at least 1".to_string(),
            ));
        }
        self.selectors.validate()
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Highest-precedence layer. `None` leaves the lower layers in place.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub target_collection_name: Option<String>,
    pub settle_pause_ms: Option<u64>,
    pub popup_timeout_ms: Option<u64>,
    pub max_delete_retries: Option<u32>,
    pub log_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    fn apply(self, config: &mut MigrationConfig) {
        if let Some(name) = self.target_collection_name {
            config.target_collection_name = name;
        }
        if let Some(ms) = self.settle_pause_ms {
            config.settle_pause_ms = ms;
        }
        if let Some(ms) = self.popup_timeout_ms {
            config.popup_timeout_ms = ms;
        }
        if let Some(n) = self.max_delete_retries {
            config.max_delete_retries = n;
        }
        if let Some(dir) = self.log_dir {
            config.log_dir = dir;
        }
    }
}

pub struct ConfigLoader {
    file: Option<PathBuf>,
    env_prefix: String,
    skip_file: bool,
    skip_env: bool,
    overrides: ConfigOverrides,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            skip_file: false,
            skip_env: false,
            overrides: ConfigOverrides::default(),
        }
    }

    /// Reads this file instead of `./listmover.toml`. Unlike the default
    /// location, an explicit file must exist.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn skip_file_layer(mut self) -> Self {
        self.skip_file = true;
        self
    }

    pub fn skip_env_layer(mut self) -> Self {
        self.skip_env = true;
        self
    }

    pub fn load(self) -> Result<MigrationConfig, ConfigError> {
        let mut config = if self.skip_file {
            MigrationConfig::default()
        } else {
            match &self.file {
                Some(path) => Self::load_from_file(path)?,
                None => Self::load_optional(Path::new(DEFAULT_CONFIG_FILENAME))?,
            }
        };

        if !self.skip_env {
            Self::apply_env_overrides(&mut config, &self.env_prefix)?;
        }

        self.overrides.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Parses `path` on top of the defaults; keys absent from the file keep
    /// their default values.
    pub fn load_from_file(path: &Path) -> Result<MigrationConfig, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<MigrationConfig, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    fn load_optional(path: &Path) -> Result<MigrationConfig, ConfigError> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::debug!("{} not found, using defaults", path.display());
            Ok(MigrationConfig::default())
        }
    }

    /// Supported variables, for prefix `P`:
    /// `P_TARGET_LIST`, `P_SETTLE_PAUSE_MS`, `P_SCROLL_PAUSE_MS`,
    /// `P_POPUP_TIMEOUT_MS`, `P_DELETE_RETRY_PAUSE_MS`,
    /// `P_MAX_DELETE_RETRIES`, `P_STOP_AFTER_CART_ABORT`, `P_LOG_DIR`.
    pub fn apply_env_overrides(
        config: &mut MigrationConfig,
        prefix: &str,
    ) -> Result<(), ConfigError> {
        if let Some(value) = env_string(prefix, "TARGET_LIST") {
            config.target_collection_name = value;
        }
        if let Some(ms) = env_parse(prefix, "SETTLE_PAUSE_MS", "milliseconds")? {
            config.settle_pause_ms = ms;
        }
        if let Some(ms) = env_parse(prefix, "SCROLL_PAUSE_MS", "milliseconds")? {
            config.scroll_pause_ms = ms;
        }
        if let Some(ms) = env_parse(prefix, "POPUP_TIMEOUT_MS", "milliseconds")? {
            config.popup_timeout_ms = ms;
        }
        if let Some(ms) = env_parse(prefix, "DELETE_RETRY_PAUSE_MS", "milliseconds")? {
            config.delete_retry_pause_ms = ms;
        }
        if let Some(n) = env_parse(prefix, "MAX_DELETE_RETRIES", "positive integer")? {
            config.max_delete_retries = n;
        }
        if let Some(value) = env_string(prefix, "STOP_AFTER_CART_ABORT") {
            let var = format!("{prefix}_STOP_AFTER_CART_ABORT");
            config.stop_after_cart_abort = match value.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => true,
                "false" | "0" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::InvalidEnvValue {
                        var,
                        value,
                        expected: "true/false, 1/0, yes/no, on/off",
                    });
                }
            };
        }
        if let Some(value) = env_string(prefix, "LOG_DIR") {
            config.log_dir = PathBuf::from(value);
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn env_string(prefix: &str, name: &str) -> Option<String> {
    let var = format!("{prefix}_{name}");
    match env::var(&var) {
        Ok(value) if !value.trim().is_empty() => {
            tracing::debug!("Applying env override: {var}={value}");
            Some(value)
        }
        _ => None,
    }
}

fn env_parse<T: FromStr>(
    prefix: &str,
    name: &str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(value) = env_string(prefix, name) else {
        return Ok(None);
    };
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnvValue {
            var: format!("{prefix}_{name}"),
            value,
            expected,
        })
}
