//! Expansion of the user configuration into a full bundler configuration

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{Config, OutputFormat};
use crate::entries::{self, ResolvedEntryTable};
use crate::utils::merge_json;

/// Paths the watcher always ignores
const WATCH_IGNORED: &[&str] = &["node_modules"];

/// Build mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Production,
    Development,
}

impl Mode {
    pub fn is_development(self) -> bool {
        matches!(self, Mode::Development)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Production => f.write_str("production"),
            Mode::Development => f.write_str("development"),
        }
    }
}

/// Everything the bundler backend needs for one compile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundlerConfig {
    pub mode: Mode,

    /// Directory entry and copy sources are resolved against
    pub context: PathBuf,

    pub entry: ResolvedEntryTable,

    pub output: OutputOptions,

    pub source_map: bool,

    pub minify: bool,

    pub format: OutputFormat,

    pub target: String,

    #[serde(default)]
    pub define: BTreeMap<String, String>,

    #[serde(default)]
    pub external: Vec<String>,

    #[serde(default)]
    pub loaders: BTreeMap<String, String>,

    #[serde(default)]
    pub copies: Vec<CopyRule>,

    pub watch_options: WatchOptions,

    /// Hash manifest location, if enabled
    pub hash_output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputOptions {
    pub path: PathBuf,
    pub public_path: String,
}

/// Copy `from` (file, directory or glob) to `to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRule {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchOptions {
    /// Paths or globs, relative to the context
    pub ignored: Vec<String>,
}

/// Expand `config` into the bundler configuration for `mode`.
///
/// Entries are resolved against the filesystem on every call, so callers in
/// watch mode pick up files created since the previous compile.
pub fn build_config(config: &Config, mode: Mode) -> Result<BundlerConfig> {
    let development = mode.is_development();
    let output_dir = config.output_dir();

    let entry = entries::resolve(&config.entries, &config.root)
        .context("Failed to resolve entries")?;

    let copies = config
        .copies
        .iter()
        .map(|(dest, src)| CopyRule {
            from: config.root.join(src),
            to: output_dir.join(dest),
        })
        .collect();

    let ignored = WATCH_IGNORED
        .iter()
        .map(|s| s.to_string())
        .chain(config.watch_exclude.iter().cloned())
        .collect();

    Ok(BundlerConfig {
        mode,
        context: config.root.clone(),
        entry,
        output: OutputOptions {
            path: output_dir,
            public_path: config.public_path.clone(),
        },
        source_map: config.source_map.enabled(development),
        minify: !development,
        format: config.format,
        target: config.target.clone(),
        define: config.define.clone(),
        external: config.external.clone(),
        loaders: config.loaders.clone(),
        copies,
        watch_options: WatchOptions { ignored },
        hash_output: config.hash_output.manifest_path(&config.root),
    })
}

impl BundlerConfig {
    /// Deep-merge `overlay` over this configuration
    pub fn merged(self, overlay: &Value) -> Result<Self> {
        let mut value = serde_json::to_value(&self)?;
        merge_json(&mut value, overlay.clone());
        serde_json::from_value(value).context("Merged configuration is invalid")
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::config::{HashOutputSetting, SourceMapSetting};
    use crate::entries::{EntrySource, SourceSpec};

    fn project() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        for file in ["src/app.js", "src/admin.js", "styles/main.css"] {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }

        let mut config = Config {
            output_path: "dist".to_string(),
            public_path: "/static/".to_string(),
            watch_exclude: vec!["tmp/**".to_string()],
            root: dir.path().to_path_buf(),
            ..Config::default()
        };
        config
            .entries
            .insert("js/[name]".to_string(), SourceSpec::Auto("src/*.js".to_string()));
        config
            .copies
            .insert("css".to_string(), "styles".to_string());

        (dir, config)
    }

    #[test]
    fn test_production_config() {
        let (dir, config) = project();
        let built = build_config(&config, Mode::Production).unwrap();

        assert_eq!(built.mode, Mode::Production);
        assert!(built.minify);
        assert!(!built.source_map);
        assert_eq!(built.output.path, dir.path().join("dist"));
        assert_eq!(built.output.public_path, "/static/");
        assert_eq!(
            built.entry.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["js/admin.js", "js/app.js"]
        );
        assert_eq!(built.entry["js/app.js"], EntrySource::Single("src/app.js".to_string()));
        assert_eq!(
            built.copies,
            vec![CopyRule {
                from: dir.path().join("styles"),
                to: dir.path().join("dist/css"),
            }]
        );
        assert_eq!(built.watch_options.ignored, vec!["node_modules", "tmp/**"]);
        assert_eq!(built.hash_output, Some(dir.path().join("asset-hash.json")));
    }

    #[test]
    fn test_development_config() {
        let (_dir, mut config) = project();
        config.hash_output = HashOutputSetting::Enabled(false);

        let built = build_config(&config, Mode::Development).unwrap();
        assert!(!built.minify);
        assert!(built.source_map);
        assert_eq!(built.hash_output, None);

        config.source_map = SourceMapSetting::Disabled;
        assert!(!build_config(&config, Mode::Development).unwrap().source_map);
    }

    #[test]
    fn test_entries_are_re_resolved() {
        let (dir, config) = project();
        assert_eq!(build_config(&config, Mode::Production).unwrap().entry.len(), 2);

        fs::write(dir.path().join("src/late.js"), "").unwrap();
        assert_eq!(build_config(&config, Mode::Production).unwrap().entry.len(), 3);
    }

    #[test]
    fn test_merge_overlay() {
        let (_dir, config) = project();
        let built = build_config(&config, Mode::Production)
            .unwrap()
            .merged(&json!({
                "target": "es2020",
                "define": { "DEBUG": "false" },
                "output": { "public_path": "https://cdn.example.com/" }
            }))
            .unwrap();

        assert_eq!(built.target, "es2020");
        assert_eq!(built.define["DEBUG"], "false");
        assert_eq!(built.output.public_path, "https://cdn.example.com/");
        assert!(built.minify);
    }

    #[test]
    fn test_merge_overlay_type_error() {
        let (_dir, config) = project();
        let result = build_config(&config, Mode::Production)
            .unwrap()
            .merged(&json!({ "minify": "yes" }));

        assert!(result.is_err());
    }
}
