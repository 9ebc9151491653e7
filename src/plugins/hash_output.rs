//! Hash manifest of the emitted entry bundles
//!
//! ```json
//! {
//!   "/assets/js/app.js": "3f1c0a9b2d4e6f70",
//!   "hash": "…",
//!   "fullHash": "…",
//!   "builtAt": "3/14/2024, 9:26:53 AM"
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::Plugin;
use crate::bundler::{BundlerConfig, CompileStats};
use crate::utils::clean_path;

/// Keys of the manifest that are not asset URLs
const RESERVED_KEYS: &[&str] = &["hash", "fullHash", "builtAt"];

/// Content of the hash manifest file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashManifest {
    /// Public URL of each entry bundle -> content hash
    #[serde(flatten)]
    pub assets: BTreeMap<String, String>,
    pub hash: String,
    #[serde(rename = "fullHash")]
    pub full_hash: String,
    #[serde(rename = "builtAt")]
    pub built_at: String,
}

impl HashManifest {
    /// Entries whose URL collides with one of the fixed keys are left out
    pub fn from_stats(stats: &CompileStats, public_path: &str) -> Self {
        let mut hasher = Sha256::new();
        let mut assets = BTreeMap::new();
        for asset in stats.entry_assets() {
            let url = public_url(public_path, &asset.name);
            if RESERVED_KEYS.contains(&url.as_str()) {
                warn!("Entry {} is left out of the hash manifest, its key is reserved", asset.name);
                continue;
            }
            hasher.update(asset.name.as_bytes());
            hasher.update(asset.hash.as_bytes());
            assets.insert(url, asset.hash.clone());
        }
        hasher.update(stats.hash.as_bytes());

        Self {
            assets,
            hash: stats.hash.clone(),
            full_hash: hex::encode(hasher.finalize()),
            built_at: stats.built_at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write hash manifest {}", path.display()))
    }
}

/// Join the public path and an asset name the way URL paths are joined
fn public_url(public_path: &str, name: &str) -> String {
    if public_path.is_empty() {
        clean_path(name)
    } else {
        clean_path(&format!("{}/{}", public_path, name))
    }
}

pub struct HashOutputPlugin;

#[async_trait]
impl Plugin for HashOutputPlugin {
    fn name(&self) -> &str {
        "hash-output"
    }

    async fn build_end(&self, config: &BundlerConfig, stats: &mut CompileStats) -> Result<()> {
        let Some(path) = &config.hash_output else {
            return Ok(());
        };

        HashManifest::from_stats(stats, &config.output.public_path).write(path)?;
        debug!("Wrote hash manifest to {}", path.display());

        Ok(())
    }
}
