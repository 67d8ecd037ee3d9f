//! Service configuration.
//!
//! Configuration is layered: stock defaults, then an optional `config.toml`,
//! then environment variables. Each layer only needs the keys it overrides.
//!
//! ## Configuration Options
//!
//! ```toml
//! # Comma-separated resolutions; empty allows every resolution.
//! allowed_resolutions = "1920x1080, 1280x720"
//! # Applied to request paths without a leading resolution segment.
//! default_resolution = "1280x720"
//!
//! [master]
//! bucket = "/srv/images/master"        # Directory holding master images
//! url = "https://master.example.com"   # Public base URL of that directory
//!
//! [optimized]
//! bucket = "/srv/images/optimized"
//! url = "https://optimized.example.com"
//!
//! [transcode]
//! quality = 80                       # JPEG and WebP, 1-100
//!
//! [server]
//! bind = "0.0.0.0:8080"
//! ```
//!
//! ## Environment Overrides
//!
//! | Variable | Key |
//! |---|---|
//! | `MASTER_BUCKET` | `master.bucket` |
//! | `MASTER_URL` | `master.url` |
//! | `OPTIMIZED_BUCKET` | `optimized.bucket` |
//! | `OPTIMIZED_URL` | `optimized.url` |
//! | `ALLOWED_RESOLUTIONS` | `allowed_resolutions` |
//! | `DEFAULT_RESOLUTION` | `default_resolution` |
//!
//! Unknown keys in `config.toml` are rejected to catch typos early.

use crate::coordinator::KeyPolicy;
use crate::gateway::Links;
use crate::imaging::Quality;
use crate::key::{AllowedResolutions, Resolution};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Environment variable → (section, key).
const ENV_OVERRIDES: &[(&str, Option<&str>, &str)] = &[
    ("MASTER_BUCKET", Some("master"), "bucket"),
    ("MASTER_URL", Some("master"), "url"),
    ("OPTIMIZED_BUCKET", Some("optimized"), "bucket"),
    ("OPTIMIZED_URL", Some("optimized"), "url"),
    ("ALLOWED_RESOLUTIONS", None, "allowed_resolutions"),
    ("DEFAULT_RESOLUTION", None, "default_resolution"),
];

/// Full service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Master image store.
    pub master: StoreConfig,
    /// Store for resized variants.
    pub optimized: StoreConfig,
    /// Comma-separated allow-list of resolution strings. Empty = all allowed.
    pub allowed_resolutions: String,
    /// Resolution used when a request path carries none.
    pub default_resolution: String,
    pub transcode: TranscodeConfig,
    pub server: ServerConfig,
}

/// A store: where its objects live and where the public reads them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Root directory of the store.
    pub bucket: String,
    /// Public base URL serving the same objects.
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TranscodeConfig {
    /// Lossy encoding quality for JPEG and WebP (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self { quality: 80 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to listen on.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Validate that every required value is present and in range.
    ///
    /// An unparseable `default_resolution` is allowed: it only makes paths
    /// without a resolution segment fail, which is a per-request 403.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let stores = [("master", &self.master), ("optimized", &self.optimized)];
        for (name, store) in stores {
            if store.bucket.trim().is_empty() {
                let msg = format!("{name}.bucket must be set");
                return Err(ConfigError::Validation(msg));
            }
            if store.url.trim().is_empty() {
                let msg = format!("{name}.url must be set");
                return Err(ConfigError::Validation(msg));
            }
        }
        if !(1..=100).contains(&self.transcode.quality) {
            let msg = "transcode.quality must be 1-100";
            return Err(ConfigError::Validation(msg.into()));
        }
        Ok(())
    }

    /// Whether `default_resolution` is a usable resolution segment.
    pub fn has_valid_default_resolution(&self) -> bool {
        Resolution::parse(&self.default_resolution).is_some()
    }

    pub fn key_policy(&self) -> KeyPolicy {
        KeyPolicy {
            default_resolution: self.default_resolution.clone(),
            allowed: AllowedResolutions::parse(&self.allowed_resolutions),
        }
    }

    pub fn links(&self) -> Links {
        Links::new(&self.master.url, &self.optimized.url)
    }

    pub fn quality(&self) -> Quality {
        Quality::new(self.transcode.quality)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ServiceConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Build a sparse overlay from environment variables.
///
/// `lookup` is `std::env::var(..).ok()` in production and a map in tests.
pub fn env_overlay(lookup: impl Fn(&str) -> Option<String>) -> toml::Value {
    let mut root = toml::Table::new();
    for &(var, section, key) in ENV_OVERRIDES {
        let Some(value) = lookup(var) else { continue };
        let value = toml::Value::String(value);
        match section {
            None => {
                root.insert(key.to_string(), value);
            }
            Some(section) => {
                let entry = root
                    .entry(section.to_string())
                    .or_insert(toml::Value::Table(toml::Table::new()));
                if let toml::Value::Table(table) = entry {
                    table.insert(key.to_string(), value);
                }
            }
        }
    }
    toml::Value::Table(root)
}

/// Merge the layers, then deserialize and validate.
pub fn resolve_config(
    layers: impl IntoIterator<Item = toml::Value>,
) -> Result<ServiceConfig, ConfigError> {
    let merged = layers.into_iter().fold(stock_defaults_value(), merge_toml);
    let config: ServiceConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from `path` (if it exists) and the process environment.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let mut layers = Vec::new();
    if let Some(file) = load_raw_config(path)? {
        layers.push(file);
    }
    layers.push(env_overlay(|var| std::env::var(var).ok()));
    resolve_config(layers)
}

/// A documented `config.toml` with every option.
pub fn stock_config_toml() -> &'static str {
    r#"# variant-cache configuration
#
# Every value can also be set through the environment:
#   MASTER_BUCKET, MASTER_URL, OPTIMIZED_BUCKET, OPTIMIZED_URL,
#   ALLOWED_RESOLUTIONS, DEFAULT_RESOLUTION

# Comma-separated list of permitted resolutions, e.g. "1920x1080, 1280x720".
# Empty allows any resolution.
allowed_resolutions = ""

# Resolution applied to request paths that carry none, e.g. "1280x720".
# Left empty, such paths are rejected with 403.
default_resolution = ""

[master]
# Directory holding the master images.
bucket = ""
# Public base URL the master directory is served from.
url = ""

[optimized]
# Directory resized variants are written to.
bucket = ""
# Public base URL the optimized directory is served from.
url = ""

[transcode]
# Quality for lossy JPEG and WebP variants (1-100).
quality = 80

[server]
# Address the HTTP server listens on.
bind = "0.0.0.0:8080"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn complete() -> toml::Value {
        toml::from_str(
            r#"
            default_resolution = "1280x720"
            [master]
            bucket = "/m"
            url = "https://m.example"
            [optimized]
            bucket = "/o"
            url = "https://o.example"
            "#,
        )
        .unwrap()
    }

    fn env(pairs: &[(&str, &str)]) -> toml::Value {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        env_overlay(|var| map.get(var).cloned())
    }

    // =========================================================================
    // Defaults and validation
    // =========================================================================

    #[test]
    fn defaults() {
        let c = ServiceConfig::default();
        assert_eq!(c.transcode.quality, 80);
        assert_eq!(c.server.bind, "0.0.0.0:8080");
        assert!(c.allowed_resolutions.is_empty());
    }

    #[test]
    fn defaults_need_stores() {
        let err = ServiceConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("master.bucket"));
    }

    #[test]
    fn complete_config_validates() {
        let c = resolve_config([complete()]).unwrap();
        assert_eq!(c.master.bucket, "/m");
        assert_eq!(c.optimized.url, "https://o.example");
        assert!(c.has_valid_default_resolution());
    }

    #[test]
    fn missing_optimized_url_rejected() {
        let overlay: toml::Value = toml::from_str(r#"optimized = { url = "" }"#).unwrap();
        let err = resolve_config([complete(), overlay]).unwrap_err();
        assert!(err.to_string().contains("optimized.url"));
    }

    #[test]
    fn quality_out_of_range_rejected() {
        let overlay: toml::Value = toml::from_str("[transcode]\nquality = 0").unwrap();
        assert!(matches!(
            resolve_config([complete(), overlay]),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn invalid_default_resolution_is_not_fatal() {
        let overlay: toml::Value = toml::from_str(r#"default_resolution = "big""#).unwrap();
        let c = resolve_config([complete(), overlay]).unwrap();
        assert!(!c.has_valid_default_resolution());
    }

    #[test]
    fn unknown_key_rejected() {
        let overlay: toml::Value = toml::from_str("[master]\nbukket = \"x\"").unwrap();
        assert!(matches!(
            resolve_config([complete(), overlay]),
            Err(ConfigError::Toml(_))
        ));
    }

    // =========================================================================
    // Derived values
    // =========================================================================

    #[test]
    fn key_policy_parses_allow_list() {
        let overlay: toml::Value =
            toml::from_str(r#"allowed_resolutions = "1920x1080 ,1280x720""#).unwrap();
        let c = resolve_config([complete(), overlay]).unwrap();
        let policy = c.key_policy();
        assert_eq!(policy.default_resolution, "1280x720");
        assert!(policy.resolve("1920x1080/a.jpg").is_ok());
        assert!(policy.resolve("640x480/a.jpg").is_err());
    }

    #[test]
    fn links_use_store_urls() {
        let c = resolve_config([complete()]).unwrap();
        let links = c.links();
        assert_eq!(links.master("a.jpg"), "https://m.example/a.jpg");
        assert_eq!(links.optimized("1x1/a.jpg"), "https://o.example/1x1/a.jpg");
    }

    // =========================================================================
    // Merging and environment
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_preserves_sibling_keys() {
        let base: toml::Value = toml::from_str("[master]\nbucket = \"b\"\nurl = \"u\"").unwrap();
        let overlay: toml::Value = toml::from_str("[master]\nurl = \"v\"").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["master"]["bucket"].as_str(), Some("b"));
        assert_eq!(merged["master"]["url"].as_str(), Some("v"));
    }

    #[test]
    fn env_overlay_builds_nested_tables() {
        let overlay = env(&[
            ("MASTER_BUCKET", "/data/master"),
            ("ALLOWED_RESOLUTIONS", "1x1"),
        ]);
        assert_eq!(overlay["master"]["bucket"].as_str(), Some("/data/master"));
        assert_eq!(overlay["allowed_resolutions"].as_str(), Some("1x1"));
        assert!(overlay.get("optimized").is_none());
    }

    #[test]
    fn env_overrides_file() {
        let c = resolve_config([
            complete(),
            env(&[
                ("OPTIMIZED_URL", "https://cdn.example"),
                ("DEFAULT_RESOLUTION", "640x480"),
            ]),
        ])
        .unwrap();
        assert_eq!(c.optimized.url, "https://cdn.example");
        assert_eq!(c.optimized.bucket, "/o");
        assert_eq!(c.default_resolution, "640x480");
    }

    #[test]
    fn env_alone_is_enough() {
        let c = resolve_config([env(&[
            ("MASTER_BUCKET", "/m"),
            ("MASTER_URL", "https://m"),
            ("OPTIMIZED_BUCKET", "/o"),
            ("OPTIMIZED_URL", "https://o"),
        ])])
        .unwrap();
        assert_eq!(c.master.url, "https://m");
    }

    // =========================================================================
    // Files
    // =========================================================================

    #[test]
    fn load_raw_config_missing_file_is_none() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        assert!(load_raw_config(&path).unwrap().is_none());
    }

    #[test]
    fn load_raw_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "this is [not toml").unwrap();
        assert!(matches!(load_raw_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_raw_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[server]\nbind = \"127.0.0.1:9000\"").unwrap();
        let value = load_raw_config(&path).unwrap().unwrap();
        assert_eq!(value["server"]["bind"].as_str(), Some("127.0.0.1:9000"));
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let parsed: ServiceConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(parsed, ServiceConfig::default());
    }
}
