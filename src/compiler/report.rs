//! Human and JSON output of compile stats

use std::path::Path;

use colored::Colorize;

use crate::bundler::{AssetKind, CompileStats};
use crate::utils::{format_duration, format_size, relative_path};

/// Print the stats as pretty JSON on stdout
pub fn print_json(stats: &CompileStats) {
    match serde_json::to_string_pretty(stats) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!("Failed to serialize stats: {}", e),
    }
}

/// Print a colored summary on stderr
pub fn print_summary(stats: &CompileStats, root: &Path) {
    let headline = format!(
        "Compiled {} asset(s) in {} ({}, hash {})",
        stats.assets.len(),
        format_duration(stats.duration),
        stats.mode,
        stats.hash
    );

    if stats.has_errors() {
        eprintln!("\n{} {}\n", "✗".red().bold(), headline);
    } else {
        eprintln!("\n{} {}\n", "✓".green().bold(), headline);
    }

    let mut assets: Vec<_> = stats.assets.iter().collect();
    assets.sort_by(|a, b| a.name.cmp(&b.name));

    for asset in assets {
        let display = relative_path(root, &asset.path).unwrap_or_else(|| asset.name.clone());
        let tag = match asset.kind {
            AssetKind::Entry => "",
            AssetKind::SourceMap => " [map]",
            AssetKind::Copied => " [copied]",
        };

        eprintln!(
            "  {} {} {}{}",
            "•".dimmed(),
            display.cyan(),
            format_size(asset.size).dimmed(),
            tag.dimmed()
        );
    }

    for warning in &stats.warnings {
        eprintln!("\n{} {}", "WARNING".yellow().bold(), warning);
    }

    for error in &stats.errors {
        eprintln!("\n{} {}", "ERROR".red().bold(), error);
    }

    if stats.assets.is_empty() && !stats.has_errors() {
        eprintln!("  {} No entry found.", "•".dimmed());
    }

    eprintln!();
}
