//! Config file scaffolding

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

/// File name used when `--out` is a directory
pub const CONFIG_FILE_NAME: &str = "webpacker.toml";

const TEMPLATE: &str = r#"# Webpacker configuration

# Output directory, relative to this file
output_path = "dist"

# URL prefix of the emitted assets
public_path = ""

# "auto" enables source maps in development only
source_map = "auto"

# true writes asset-hash.json next to this file; a string sets another path
hash_output = true

# Paths the watcher ignores, in addition to node_modules
watch_exclude = ["dist"]

# Destination -> source. A source is a file, a list of files or a glob.
# [name], [basename] and [ext] in a destination are replaced per matched file.
[entries]
"js/[basename].js" = "src/js/*.[jt]s"
"css/[basename].css" = "src/css/[^_.]*.css"

# Destination -> file, directory or glob copied into the output directory
[copies]
"index.html" = "src/index.html"
"images" = "src/images"
"#;

/// Generate a webpacker config file
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Config output path; a directory gets `webpacker.toml` inside it
    #[arg(short, long, default_value = CONFIG_FILE_NAME)]
    pub out: PathBuf,
}

impl InitCommand {
    pub fn execute(&self) -> Result<ExitCode> {
        let path = self.target();

        if path.exists() {
            eprintln!("{} {} already exists", "✗".red(), path.display());
            return Ok(ExitCode::FAILURE);
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, TEMPLATE)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        eprintln!(
            "{} {} created successfully",
            "✓".green(),
            path.display().to_string().cyan()
        );
        Ok(ExitCode::SUCCESS)
    }

    fn target(&self) -> PathBuf {
        if self.out.is_dir() {
            self.out.join(CONFIG_FILE_NAME)
        } else {
            self.out.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::TempDir;

    use super::*;
    use crate::config::Config;

    #[test]
    fn test_template_is_valid_config() {
        let config = Config::parse(TEMPLATE, Path::new(CONFIG_FILE_NAME)).unwrap();

        config.validate().unwrap();
        assert_eq!(config.output_path, "dist");
        assert_eq!(config.entries.len(), 2);
        assert_eq!(config.copies.len(), 2);
    }

    #[test]
    fn test_directory_gets_file_name() {
        let dir = TempDir::new().unwrap();
        let cmd = InitCommand {
            out: dir.path().to_path_buf(),
        };

        cmd.execute().unwrap();
        assert!(dir.path().join(CONFIG_FILE_NAME).is_file());
    }

    #[test]
    fn test_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "# mine").unwrap();

        let cmd = InitCommand { out: path.clone() };

        cmd.execute().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "# mine");
    }
}
