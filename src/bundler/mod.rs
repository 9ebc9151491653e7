//! Bundler integration
//!
//! Webpacker does not bundle anything itself. It expands the user config into
//! a [`BundlerConfig`] and hands it to a [`Bundler`] backend.

mod build_config;
mod esbuild;
mod stats;

use anyhow::Result;
use async_trait::async_trait;

pub use build_config::{build_config, BundlerConfig, CopyRule, Mode, OutputOptions, WatchOptions};
pub use esbuild::{asset, EsbuildBundler, Invocation};
pub use stats::{AssetInfo, AssetKind, CompileStats};

/// A bundler backend
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Compile every entry of `config` into its output directory.
    ///
    /// Failures of individual entries are reported in the returned stats;
    /// `Err` means the backend itself could not run.
    async fn compile(&self, config: &BundlerConfig) -> Result<CompileStats>;
}
