//! Filesystem watching for rebuilds

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tokio::sync::mpsc;
use tracing::warn;

use crate::bundler::{BundlerConfig, CompileStats};
use crate::utils::{relative_path, to_slash};

const DEBOUNCE: Duration = Duration::from_millis(100);

/// Decides which changed paths are irrelevant to the build
pub struct WatchFilter {
    root: PathBuf,
    ignored: GlobSet,
    outputs: Vec<PathBuf>,

    /// Files and directories written by earlier compiles
    emitted: HashSet<PathBuf>,
}

impl WatchFilter {
    pub fn new(config: &BundlerConfig) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();

        for pattern in &config.watch_options.ignored {
            let pattern = pattern.trim_end_matches('/');
            let mut variants = vec![pattern.to_string(), format!("{}/**", pattern)];
            if !pattern.contains('/') {
                variants.push(format!("**/{}", pattern));
                variants.push(format!("**/{}/**", pattern));
            }
            for variant in variants {
                match Glob::new(&variant) {
                    Ok(glob) => {
                        builder.add(glob);
                    }
                    Err(e) => warn!("Ignoring invalid watch_exclude pattern {}: {}", variant, e),
                }
            }
        }

        let mut outputs = vec![config.output.path.clone()];
        if let Some(manifest) = &config.hash_output {
            outputs.push(manifest.clone());
        }

        Ok(Self {
            root: config.context.clone(),
            ignored: builder.build()?,
            outputs,
            emitted: HashSet::new(),
        })
    }

    /// Remember the assets of a compile so their writes are not mistaken for
    /// source changes. Directories created for them inside the root count too.
    pub fn record(&mut self, stats: &CompileStats) {
        for asset in &stats.assets {
            self.emitted.insert(asset.path.clone());
            for dir in asset.path.ancestors().skip(1) {
                if dir == self.root || !dir.starts_with(&self.root) {
                    break;
                }
                self.emitted.insert(dir.to_path_buf());
            }
        }
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.emitted.contains(path) {
            return true;
        }

        // Whole output directory, unless output goes to the root
        let is_output = self
            .outputs
            .iter()
            .any(|out| out != &self.root && path.starts_with(out));
        if is_output {
            return true;
        }

        let rel = relative_path(&self.root, path).unwrap_or_else(|| to_slash(path));
        self.ignored.is_match(&rel)
    }
}

/// Start a recursive, debounced watch of `root`; batches of events arrive on
/// the returned receiver. Dropping the debouncer stops the watch.
pub fn watch(
    root: &Path,
) -> Result<(
    Debouncer<RecommendedWatcher>,
    mpsc::UnboundedReceiver<DebounceEventResult>,
)> {
    let (tx, rx) = mpsc::unbounded_channel();

    let mut debouncer = new_debouncer(DEBOUNCE, move |result: DebounceEventResult| {
        let _ = tx.send(result);
    })?;

    debouncer
        .watcher()
        .watch(root, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", root.display()))?;

    Ok((debouncer, rx))
}
