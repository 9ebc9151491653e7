//! Copy rules: files, directories and globs copied into the output directory

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;
use walkdir::WalkDir;

use super::Plugin;
use crate::bundler::{AssetInfo, AssetKind, BundlerConfig, CompileStats, CopyRule};
use crate::entries::glob;
use crate::utils::{hash_content, relative_path, to_slash};

pub struct CopyPlugin;

impl CopyPlugin {
    /// Copy one rule and return the written files as `(source, target)` pairs.
    ///
    /// A `from` that does not exist is expanded as a glob; every match lands
    /// in `to` under its own file name.
    pub fn copy_rule(rule: &CopyRule, context: &Path) -> Result<Vec<(PathBuf, PathBuf)>> {
        let mut copied = Vec::new();

        if rule.from.is_file() {
            copied.push((rule.from.clone(), rule.to.clone()));
        } else if rule.from.is_dir() {
            for entry in WalkDir::new(&rule.from).min_depth(1) {
                let entry = entry
                    .with_context(|| format!("Failed to read {}", rule.from.display()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let rel = entry.path().strip_prefix(&rule.from).unwrap_or(entry.path());
                copied.push((entry.path().to_path_buf(), rule.to.join(rel)));
            }
        } else {
            for file in glob::expand(&to_slash(&rule.from), context)? {
                let source = PathBuf::from(file);
                let Some(name) = source.file_name() else {
                    continue;
                };
                let target = rule.to.join(name);
                copied.push((source, target));
            }
        }

        for (source, target) in &copied {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::copy(source, target).with_context(|| {
                format!("Failed to copy {} to {}", source.display(), target.display())
            })?;
            debug!("Copied {} -> {}", source.display(), target.display());
        }

        Ok(copied)
    }
}

#[async_trait]
impl Plugin for CopyPlugin {
    fn name(&self) -> &str {
        "copy"
    }

    async fn build_end(&self, config: &BundlerConfig, stats: &mut CompileStats) -> Result<()> {
        if config.copies.is_empty() {
            return Ok(());
        }

        for rule in &config.copies {
            let copied = Self::copy_rule(rule, &config.context)?;

            if copied.is_empty() {
                stats
                    .warnings
                    .push(format!("copies: {} matched no files", rule.from.display()));
                continue;
            }

            for (_, target) in copied {
                let content = fs::read(&target)?;
                let name = relative_path(&config.output.path, &target)
                    .unwrap_or_else(|| to_slash(&target));
                stats.assets.push(AssetInfo {
                    name,
                    size: content.len() as u64,
                    hash: hash_content(&content),
                    path: target,
                    kind: AssetKind::Copied,
                });
            }
        }

        stats.rehash();
        Ok(())
    }
}
