//! Compile driver
//!
//! Builds the bundler configuration, runs the plugins around the bundler and
//! reports the result. In watch mode this repeats on every relevant change,
//! re-resolving entries each time.

mod report;
mod watcher;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, error};

use crate::bundler::{build_config, Bundler, BundlerConfig, CompileStats, Mode};
use crate::config::Config;
use crate::plugins::PluginManager;
use crate::utils::relative_path;

pub use watcher::WatchFilter;

/// Options of a compile run
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    pub mode: Mode,

    /// Print stats as JSON on stdout
    pub json: bool,

    /// Show a spinner while compiling
    pub progress: bool,

    /// Deep-merged over the generated bundler configuration
    pub merge: Option<Value>,
}

pub struct Compiler {
    config: Config,
    options: CompilerOptions,
    bundler: Arc<dyn Bundler>,
    plugins: PluginManager,

    /// Hash of the last reported compile
    last_hash: Mutex<Option<String>>,
}

impl Compiler {
    pub fn new(config: Config, options: CompilerOptions, bundler: Arc<dyn Bundler>) -> Self {
        Self {
            config,
            options,
            bundler,
            plugins: PluginManager::with_defaults(),
            last_hash: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Expand the user config for this run, including the merge overlay
    pub fn bundler_config(&self) -> Result<BundlerConfig> {
        let built = build_config(&self.config, self.options.mode)?;

        match &self.options.merge {
            Some(overlay) => built.merged(overlay),
            None => Ok(built),
        }
    }

    /// Compile once without reporting
    pub async fn compile(&self) -> Result<CompileStats> {
        let config = self.bundler_config()?;
        debug!(
            "Compiling {} entries with {} in {} mode",
            config.entry.len(),
            self.bundler.name(),
            config.mode
        );

        self.plugins.build_start(&config).await?;

        let spinner = self.options.progress.then(spinner);
        let result = self.bundler.compile(&config).await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        let mut stats = result?;
        self.plugins.build_end(&config, &mut stats).await?;

        Ok(stats)
    }

    /// Print `stats`. JSON goes out on every compile; the summary is skipped
    /// when the previous one had the same hash. Returns whether anything was
    /// printed.
    pub fn report(&self, stats: &CompileStats) -> bool {
        if self.options.json {
            report::print_json(stats);
            return true;
        }

        {
            let mut last = self.last_hash.lock();
            if last.as_deref() == Some(stats.hash.as_str()) {
                return false;
            }
            *last = Some(stats.hash.clone());
        }

        report::print_summary(stats, &self.config.root);
        true
    }

    /// Compile once and report
    pub async fn run(&self) -> Result<CompileStats> {
        let stats = self.compile().await?;
        self.report(&stats);
        Ok(stats)
    }

    /// Compile, then recompile on every relevant change until `shutdown`
    /// resolves. Compile failures are logged and never end the loop.
    pub async fn watch<F, S>(&self, mut on_compiled: F, shutdown: S) -> Result<()>
    where
        F: FnMut(&CompileStats) + Send,
        S: Future<Output = ()> + Send,
    {
        let mut filter = WatchFilter::new(&self.bundler_config()?)?;
        let (_debouncer, mut events) = watcher::watch(&self.config.root)?;

        self.compile_and_report(&mut filter, &mut on_compiled).await;
        eprintln!("{} Watching for changes...\n", "→".blue());

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!("Watch stopped");
                    break;
                }
                batch = events.recv() => match batch {
                    Some(Ok(events)) => {
                        let changed: Vec<PathBuf> = events
                            .into_iter()
                            .map(|event| event.path)
                            .filter(|path| !filter.is_ignored(path))
                            .collect();

                        if changed.is_empty() {
                            continue;
                        }

                        for path in &changed {
                            let display = relative_path(&self.config.root, path)
                                .unwrap_or_else(|| path.display().to_string());
                            eprintln!("  {} File changed: {}", "↻".yellow(), display.dimmed());
                        }

                        self.compile_and_report(&mut filter, &mut on_compiled).await;
                    }
                    Some(Err(e)) => error!("Watch error: {:?}", e),
                    None => break,
                }
            }
        }

        Ok(())
    }

    async fn compile_and_report<F>(&self, filter: &mut WatchFilter, on_compiled: &mut F)
    where
        F: FnMut(&CompileStats) + Send,
    {
        match self.compile().await {
            Ok(stats) => {
                filter.record(&stats);
                self.report(&stats);
                on_compiled(&stats);
            }
            Err(e) => {
                error!("{:#}", e);
                *self.last_hash.lock() = None;
            }
        }
    }
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} {elapsed}") {
        spinner.set_style(style);
    }
    spinner.set_message("Compiling");
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}
