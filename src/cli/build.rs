//! Compile commands: `production`, `development` and `watch`

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::Cli;
use crate::bundler::Mode;
use crate::config::Config;
use crate::server::shutdown_signal;

/// Exit status of a compile that reported errors
const EXIT_COMPILE_ERRORS: u8 = 2;

#[derive(Args, Debug, Default)]
pub struct BuildCommand {
    /// Override `output_path` from the config file
    #[arg(long)]
    pub output_path: Option<String>,

    /// Override `public_path` from the config file
    #[arg(long)]
    pub public_path: Option<String>,
}

impl BuildCommand {
    pub async fn execute(&self, cli: &Cli, mode: Mode, watch: bool) -> Result<ExitCode> {
        let mut config = cli.load_config()?;
        self.apply(&mut config);

        let compiler = cli.compiler(config, mode);

        if watch {
            eprintln!("{} Compiling for {} in watch mode...", "→".blue(), mode);
            compiler.watch(|_| {}, shutdown_signal()).await?;
            return Ok(ExitCode::SUCCESS);
        }

        eprintln!("{} Compiling for {}...", "→".blue(), mode);
        let stats = compiler.run().await?;

        if stats.has_errors() {
            Ok(ExitCode::from(EXIT_COMPILE_ERRORS))
        } else {
            Ok(ExitCode::SUCCESS)
        }
    }

    /// Apply command-line overrides to the loaded config
    pub fn apply(&self, config: &mut Config) {
        if let Some(output_path) = &self.output_path {
            config.output_path = output_path.clone();
        }
        if let Some(public_path) = &self.public_path {
            config.public_path = public_path.clone();
        }
    }
}
