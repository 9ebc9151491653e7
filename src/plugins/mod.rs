//! Plugin system for Webpacker
//!
//! Plugins hook into each compile: `build_start` runs before the bundler,
//! `build_end` after it and may add assets or diagnostics to the stats.

mod copy;
mod hash_output;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::bundler::{BundlerConfig, CompileStats};

pub use copy::CopyPlugin;
pub use hash_output::{HashManifest, HashOutputPlugin};

/// Plugin trait - implement this to hook into compiles
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Plugin name for logging and debugging
    fn name(&self) -> &str;

    /// Called before the bundler runs
    async fn build_start(&self, _config: &BundlerConfig) -> Result<()> {
        Ok(())
    }

    /// Called after the bundler finished
    async fn build_end(&self, _config: &BundlerConfig, _stats: &mut CompileStats) -> Result<()> {
        Ok(())
    }
}

/// Runs registered plugins in registration order
#[derive(Default)]
pub struct PluginManager {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy rules first, then the hash manifest
    pub fn with_defaults() -> Self {
        let mut manager = Self::new();
        manager.register(Arc::new(CopyPlugin));
        manager.register(Arc::new(HashOutputPlugin));
        manager
    }

    /// Register a plugin
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    /// Run build_start hooks
    pub async fn build_start(&self, config: &BundlerConfig) -> Result<()> {
        for plugin in &self.plugins {
            debug!("Running build_start for plugin: {}", plugin.name());
            plugin.build_start(config).await?;
        }
        Ok(())
    }

    /// Run build_end hooks
    pub async fn build_end(&self, config: &BundlerConfig, stats: &mut CompileStats) -> Result<()> {
        for plugin in &self.plugins {
            debug!("Running build_end for plugin: {}", plugin.name());
            plugin.build_end(config, stats).await?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
