//! esbuild backend
//!
//! Runs one `esbuild` process per resolved entry. Entries with several source
//! files are bundled through a synthetic stdin module that imports each of
//! them in order.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{AssetInfo, AssetKind, Bundler, BundlerConfig, CompileStats};
use crate::entries::EntrySource;
use crate::utils::{hash_content, to_slash};

/// Bundler backend driving the `esbuild` executable
pub struct EsbuildBundler {
    binary: String,
}

/// Arguments and optional stdin for one esbuild run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl EsbuildBundler {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Build the esbuild invocation for one entry
    pub fn invocation(&self, config: &BundlerConfig, dest: &str, source: &EntrySource) -> Invocation {
        let outfile = config.output.path.join(dest);
        let mut args = Vec::new();
        let mut stdin = None;

        match source {
            EntrySource::Single(src) => args.push(src.clone()),
            EntrySource::Multiple(srcs) => {
                let css = is_stylesheet(dest);
                stdin = Some(
                    srcs.iter()
                        .map(|src| import_statement(src, css))
                        .collect::<Vec<_>>()
                        .join("\n"),
                );
                args.push(format!("--resolve-dir={}", config.context.display()));
                args.push(format!("--sourcefile={}", dest));
                args.push(format!("--loader={}", if css { "css" } else { "js" }));
            }
        }

        args.push("--bundle".to_string());
        args.push(format!("--outfile={}", outfile.display()));
        args.push(format!("--format={}", config.format.as_str()));
        args.push(format!("--target={}", config.target));
        args.push("--log-level=warning".to_string());
        args.push("--color=false".to_string());

        if config.minify {
            args.push("--minify".to_string());
        }
        if config.source_map {
            args.push("--sourcemap".to_string());
        }
        if !config.output.public_path.is_empty() {
            args.push(format!("--public-path={}", config.output.public_path));
        }
        for (key, value) in &config.define {
            args.push(format!("--define:{}={}", key, value));
        }
        for module in &config.external {
            args.push(format!("--external:{}", module));
        }
        for (ext, loader) in &config.loaders {
            let ext = if ext.starts_with('.') { ext.clone() } else { format!(".{}", ext) };
            args.push(format!("--loader:{}={}", ext, loader));
        }

        Invocation { args, stdin }
    }

    async fn run(&self, cwd: &Path, invocation: Invocation) -> Result<std::process::Output> {
        debug!("{} {}", self.binary, invocation.args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(&invocation.args)
            .current_dir(cwd)
            .stdin(if invocation.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to run `{}`, is esbuild installed?", self.binary))?;

        if let (Some(input), Some(mut pipe)) = (invocation.stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes()).await?;
            // Closing stdin lets esbuild start
            drop(pipe);
        }

        Ok(child.wait_with_output().await?)
    }
}

#[async_trait]
impl Bundler for EsbuildBundler {
    fn name(&self) -> &str {
        "esbuild"
    }

    async fn compile(&self, config: &BundlerConfig) -> Result<CompileStats> {
        let start = Instant::now();
        let mut assets = Vec::new();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        fs::create_dir_all(&config.output.path)
            .await
            .with_context(|| format!("Failed to create {}", config.output.path.display()))?;

        for (dest, source) in &config.entry {
            if source.is_empty() {
                warn!("No entry found for {}", dest);
                warnings.push(format!("{}: no entry found", dest));
                continue;
            }

            let output = self
                .run(&config.context, self.invocation(config, dest, source))
                .await?;
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

            if !output.status.success() {
                errors.push(format!("{}: {}", dest, stderr));
                continue;
            }
            if !stderr.is_empty() {
                warnings.push(format!("{}: {}", dest, stderr));
            }

            let outfile = config.output.path.join(dest);
            assets.push(asset(dest.clone(), outfile.clone(), AssetKind::Entry).await?);

            if config.source_map {
                let map = PathBuf::from(format!("{}.map", outfile.display()));
                if fs::try_exists(&map).await.unwrap_or(false) {
                    assets.push(asset(format!("{}.map", dest), map, AssetKind::SourceMap).await?);
                }
            }
        }

        Ok(CompileStats::new(
            config.mode,
            assets,
            errors,
            warnings,
            start.elapsed(),
        ))
    }
}

/// Describe an emitted file
pub async fn asset(name: String, path: PathBuf, kind: AssetKind) -> Result<AssetInfo> {
    let content = fs::read(&path)
        .await
        .with_context(|| format!("Failed to read output {}", path.display()))?;

    Ok(AssetInfo {
        name: name.replace('\\', "/"),
        size: content.len() as u64,
        hash: hash_content(&content),
        path,
        kind,
    })
}

fn is_stylesheet(dest: &str) -> bool {
    Path::new(dest).extension().is_some_and(|ext| ext == "css")
}

/// `import "./src/a.js";` or `@import "./src/a.css";`
fn import_statement(src: &str, css: bool) -> String {
    let path = Path::new(src);
    let specifier = if path.is_absolute() || src.starts_with("./") || src.starts_with("../") {
        to_slash(path)
    } else {
        format!("./{}", to_slash(path))
    };
    let quoted = serde_json::to_string(&specifier).unwrap_or_else(|_| format!("\"{}\"", specifier));

    if css {
        format!("@import {};", quoted)
    } else {
        format!("import {};", quoted)
    }
}
