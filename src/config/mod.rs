//! Configuration handling for Webpacker
//!
//! Parses `webpacker.toml` (or `webpacker.json`) files.

mod schema;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::entries::EntrySpec;

pub use schema::*;

/// Environment variable overriding the `esbuild` executable
pub const ESBUILD_ENV: &str = "WEBPACKER_ESBUILD";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Output directory, relative to the project root or absolute
    #[serde(default)]
    pub output_path: String,

    /// URL prefix of the emitted assets
    #[serde(default)]
    pub public_path: String,

    /// Destination pattern -> source path, list or glob
    #[serde(default)]
    pub entries: EntrySpec,

    /// Destination -> file, directory or glob copied verbatim
    #[serde(default)]
    pub copies: BTreeMap<String, String>,

    #[serde(default)]
    pub source_map: SourceMapSetting,

    #[serde(default)]
    pub hash_output: HashOutputSetting,

    /// Extra paths or globs the watcher ignores
    #[serde(default)]
    pub watch_exclude: Vec<String>,

    #[serde(default)]
    pub format: OutputFormat,

    #[serde(default = "default_target")]
    pub target: String,

    /// Global identifiers replaced at build time
    #[serde(default)]
    pub define: BTreeMap<String, String>,

    /// Modules left out of the bundles
    #[serde(default)]
    pub external: Vec<String>,

    /// File extension -> esbuild loader
    #[serde(default)]
    pub loaders: BTreeMap<String, String>,

    /// esbuild executable
    #[serde(default = "default_esbuild")]
    pub esbuild: String,

    /// Root directory (computed from config file location)
    #[serde(skip)]
    pub root: PathBuf,
}

/// Semantic problems in an otherwise well-formed config file
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no entries or copies configured")]
    Empty,

    #[error("{section} destination `{dest}` must be a relative path inside the output directory")]
    InvalidDestination { section: &'static str, dest: String },

    #[error("{section} destination `{dest}` has an empty source")]
    EmptySource { section: &'static str, dest: String },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: String::new(),
            public_path: String::new(),
            entries: EntrySpec::new(),
            copies: BTreeMap::new(),
            source_map: SourceMapSetting::default(),
            hash_output: HashOutputSetting::default(),
            watch_exclude: Vec::new(),
            format: OutputFormat::default(),
            target: default_target(),
            define: BTreeMap::new(),
            external: Vec::new(),
            loaders: BTreeMap::new(),
            esbuild: default_esbuild(),
            root: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Load configuration from a file path
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let canonical_path = absolute(path.as_ref())?;

        let content = fs::read_to_string(&canonical_path)
            .with_context(|| format!("Failed to read config file: {}", canonical_path.display()))?;

        let mut config = Self::parse(&content, &canonical_path)?;

        // Set root directory to the directory containing the config file
        config.root = canonical_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        if let Ok(bin) = std::env::var(ESBUILD_ENV) {
            debug!("Using esbuild from {}: {}", ESBUILD_ENV, bin);
            config.esbuild = bin;
        }

        config.validate()?;

        Ok(config)
    }

    /// Parse config text; `.json` files are JSON, everything else TOML
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let is_json = path.extension().is_some_and(|ext| ext == "json");

        if is_json {
            serde_json::from_str(content)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            toml::from_str(content).with_context(|| format!("Failed to parse {}", path.display()))
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entries.is_empty() && self.copies.is_empty() {
            return Err(ConfigError::Empty);
        }

        for dest in self.entries.keys() {
            check_destination("entries", dest)?;
        }

        for (dest, src) in &self.copies {
            check_destination("copies", dest)?;
            if src.trim().is_empty() {
                return Err(ConfigError::EmptySource {
                    section: "copies",
                    dest: dest.clone(),
                });
            }
        }

        Ok(())
    }

    /// Get the absolute output directory path
    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.output_path)
    }
}

fn check_destination(section: &'static str, dest: &str) -> Result<(), ConfigError> {
    let path = Path::new(dest);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

    if dest.is_empty() || escapes {
        return Err(ConfigError::InvalidDestination {
            section,
            dest: dest.to_string(),
        });
    }

    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Load a file to be deep-merged over the generated bundler configuration.
///
/// A missing file yields `None`; a broken one is reported and skipped.
pub fn load_overlay(path: &Path) -> Option<Value> {
    if !path.is_file() {
        debug!("No merge file at {}", path.display());
        return None;
    }

    let parsed = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))
        .and_then(|content| {
            if path.extension().is_some_and(|ext| ext == "json") {
                serde_json::from_str::<Value>(&content).map_err(anyhow::Error::from)
            } else {
                toml::from_str::<Value>(&content).map_err(anyhow::Error::from)
            }
        });

    match parsed {
        Ok(value @ Value::Object(_)) => Some(value),
        Ok(_) => {
            warn!("Unable to merge with {}: not a table", path.display());
            None
        }
        Err(e) => {
            warn!("Unable to merge with {}: {:#}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::entries::SourceSpec;

    const SAMPLE: &str = r#"
output_path = "dist"
public_path = "/assets/"
source_map = "auto"
hash_output = true
watch_exclude = ["dist"]

[entries]
"js/[basename].js" = "example/[jt]s/*.[jt]s"
"css/[basename].css" = "example/sass/[^_.]*.s[ac]ss"
"js/vendor.js" = ["lib/a.js", "lib/b.js"]

[copies]
"index.html" = "example/index.html"
images = "example/images"

[define]
DEBUG = "false"
"#;

    #[test]
    fn test_parse_toml() {
        let config = Config::parse(SAMPLE, Path::new("webpacker.toml")).unwrap();

        assert_eq!(config.output_path, "dist");
        assert_eq!(config.public_path, "/assets/");
        assert_eq!(config.entries.len(), 3);
        assert_eq!(
            config.entries["js/vendor.js"],
            SourceSpec::List(vec!["lib/a.js".to_string(), "lib/b.js".to_string()])
        );
        assert_eq!(config.copies["images"], "example/images");
        assert_eq!(config.format, OutputFormat::Iife);
        assert_eq!(config.target, "es2017");
        assert_eq!(config.esbuild, "esbuild");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "output_path": "public",
            "entries": { "js/[name]": "src/*.js" },
            "source_map": false,
            "hash_output": "hashes.json",
            "format": "esm"
        }"#;
        let config = Config::parse(json, Path::new("webpacker.json")).unwrap();

        assert_eq!(config.output_path, "public");
        assert_eq!(config.source_map, SourceMapSetting::Disabled);
        assert_eq!(config.hash_output, HashOutputSetting::Path("hashes.json".to_string()));
        assert_eq!(config.format, OutputFormat::Esm);
    }

    #[test]
    fn test_validate_rejects_escaping_destinations() {
        let mut config = Config::default();
        config
            .entries
            .insert("../outside.js".to_string(), SourceSpec::Auto("a.js".to_string()));

        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidDestination {
                section: "entries",
                dest: "../outside.js".to_string()
            })
        );

        let mut config = Config::default();
        config.copies.insert("/etc/passwd".to_string(), "x".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDestination { section: "copies", .. })
        ));
    }

    #[test]
    fn test_validate_requires_something_to_do() {
        assert_eq!(Config::default().validate(), Err(ConfigError::Empty));
    }

    #[test]
    fn test_load_sets_root() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("webpacker.toml");
        fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.root, dir.path());
        assert_eq!(config.output_dir(), dir.path().join("dist"));
    }

    #[test]
    fn test_load_overlay() {
        let dir = TempDir::new().unwrap();

        assert_eq!(load_overlay(&dir.path().join("missing.json")), None);

        let toml_path = dir.path().join("merge.toml");
        fs::write(&toml_path, "target = \"es2020\"\n[define]\nDEBUG = \"true\"\n").unwrap();
        assert_eq!(
            load_overlay(&toml_path),
            Some(serde_json::json!({ "target": "es2020", "define": { "DEBUG": "true" } }))
        );

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert_eq!(load_overlay(&broken), None);

        let array = dir.path().join("array.json");
        fs::write(&array, "[1, 2]").unwrap();
        assert_eq!(load_overlay(&array), None);
    }
}
