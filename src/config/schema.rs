//! Configuration schema definitions

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// `source_map = "auto" | true | false`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "FlagOrKeyword", into = "FlagOrKeyword")]
pub enum SourceMapSetting {
    /// On for development builds, off for production
    #[default]
    Auto,
    Enabled,
    Disabled,
}

impl SourceMapSetting {
    pub fn enabled(self, development: bool) -> bool {
        match self {
            SourceMapSetting::Auto => development,
            SourceMapSetting::Enabled => true,
            SourceMapSetting::Disabled => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum FlagOrKeyword {
    Flag(bool),
    Keyword(String),
}

impl TryFrom<FlagOrKeyword> for SourceMapSetting {
    type Error = String;

    fn try_from(value: FlagOrKeyword) -> Result<Self, Self::Error> {
        match value {
            FlagOrKeyword::Flag(true) => Ok(SourceMapSetting::Enabled),
            FlagOrKeyword::Flag(false) => Ok(SourceMapSetting::Disabled),
            FlagOrKeyword::Keyword(k) if k == "auto" => Ok(SourceMapSetting::Auto),
            FlagOrKeyword::Keyword(k) => Err(format!(
                "invalid source_map value `{}`, expected \"auto\", true or false",
                k
            )),
        }
    }
}

impl From<SourceMapSetting> for FlagOrKeyword {
    fn from(value: SourceMapSetting) -> Self {
        match value {
            SourceMapSetting::Auto => FlagOrKeyword::Keyword("auto".to_string()),
            SourceMapSetting::Enabled => FlagOrKeyword::Flag(true),
            SourceMapSetting::Disabled => FlagOrKeyword::Flag(false),
        }
    }
}

/// `hash_output = true | false | "path/to/manifest.json"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HashOutputSetting {
    Enabled(bool),
    Path(String),
}

impl Default for HashOutputSetting {
    fn default() -> Self {
        HashOutputSetting::Enabled(true)
    }
}

impl HashOutputSetting {
    /// Where the manifest is written, if at all
    pub fn manifest_path(&self, root: &Path) -> Option<PathBuf> {
        match self {
            HashOutputSetting::Enabled(true) => Some(root.join(DEFAULT_MANIFEST)),
            HashOutputSetting::Enabled(false) => None,
            HashOutputSetting::Path(path) if path.is_empty() => None,
            HashOutputSetting::Path(path) => Some(root.join(path)),
        }
    }
}

pub const DEFAULT_MANIFEST: &str = "asset-hash.json";

/// Output module format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Iife,
    Esm,
    Cjs,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Iife => "iife",
            OutputFormat::Esm => "esm",
            OutputFormat::Cjs => "cjs",
        }
    }
}

pub fn default_target() -> String {
    "es2017".to_string()
}

pub fn default_esbuild() -> String {
    "esbuild".to_string()
}
