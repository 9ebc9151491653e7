//! Compile results

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::Mode;
use crate::utils::hash_content;

/// What produced an emitted file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetKind {
    Entry,
    SourceMap,
    Copied,
}

/// A file written to the output directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Path relative to the output directory, `/`-separated
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub hash: String,
    pub kind: AssetKind,
}

/// Result of a single compile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileStats {
    /// Changes whenever any emitted asset or diagnostic changes
    pub hash: String,
    pub mode: Mode,
    pub assets: Vec<AssetInfo>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
    pub built_at: DateTime<Local>,
}

impl CompileStats {
    pub fn new(
        mode: Mode,
        assets: Vec<AssetInfo>,
        errors: Vec<String>,
        warnings: Vec<String>,
        duration: Duration,
    ) -> Self {
        let mut stats = Self {
            hash: String::new(),
            mode,
            assets,
            errors,
            warnings,
            duration,
            built_at: Local::now(),
        };
        stats.rehash();
        stats
    }

    /// Recompute `hash` after assets or diagnostics were added
    pub fn rehash(&mut self) {
        let mut fingerprint = String::new();
        for asset in &self.assets {
            fingerprint.push_str(&asset.name);
            fingerprint.push(':');
            fingerprint.push_str(&asset.hash);
            fingerprint.push('\n');
        }
        for message in self.errors.iter().chain(&self.warnings) {
            fingerprint.push_str(message);
            fingerprint.push('\n');
        }
        self.hash = hash_content(fingerprint.as_bytes());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn entry_assets(&self) -> impl Iterator<Item = &AssetInfo> {
        self.assets.iter().filter(|a| a.kind == AssetKind::Entry)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
