//! Command-line interface for Webpacker
//!
//! Subcommands:
//! - `production` (default): production compile
//! - `development`: development compile
//! - `watch`: development compile, recompiling on change
//! - `server`: watch plus a live-reloading dev server
//! - `init`: write a template config file

mod build;
mod init;
mod server;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use crate::bundler::{EsbuildBundler, Mode};
use crate::compiler::{Compiler, CompilerOptions};
use crate::config::{load_overlay, Config};

pub use build::BuildCommand;
pub use init::InitCommand;
pub use server::ServerCommand;

/// Webpacker - compile entry patterns into bundles
#[derive(Parser, Debug)]
#[command(name = "webpacker")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the webpacker config file
    #[arg(short, long, global = true, env = "WEBPACKER_CONFIG", default_value = "webpacker.toml")]
    pub config: String,

    /// JSON or TOML file deep-merged over the generated bundler config
    #[arg(short, long, global = true, default_value = "webpacker.merge.json")]
    pub merge: String,

    /// Show a spinner while compiling
    #[arg(short, long, global = true)]
    pub progress: bool,

    /// Force colored output
    #[arg(long, global = true, conflicts_with = "no_color")]
    pub color: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Print compile stats as JSON
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile assets for production
    #[command(alias = "prod")]
    Production(BuildCommand),

    /// Compile assets for development
    #[command(alias = "dev")]
    Development(BuildCommand),

    /// Compile assets for development and recompile on change
    Watch(BuildCommand),

    /// Compile assets and start the dev server
    Server(ServerCommand),

    /// Generate a webpacker config file
    Init(InitCommand),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<ExitCode> {
        self.apply_color();
        print_banner();

        match &self.command {
            None => BuildCommand::default().execute(self, Mode::Production, false).await,
            Some(Commands::Production(cmd)) => cmd.execute(self, Mode::Production, false).await,
            Some(Commands::Development(cmd)) => cmd.execute(self, Mode::Development, false).await,
            Some(Commands::Watch(cmd)) => cmd.execute(self, Mode::Development, true).await,
            Some(Commands::Server(cmd)) => cmd.execute(self).await,
            Some(Commands::Init(cmd)) => cmd.execute(),
        }
    }

    /// Whether output is colored: the flags win, then terminal detection
    pub fn color_enabled(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            console::colors_enabled_stderr()
        }
    }

    fn apply_color(&self) {
        let enabled = self.color_enabled();
        colored::control::set_override(enabled);
        console::set_colors_enabled(enabled);
        console::set_colors_enabled_stderr(enabled);
    }

    fn load_config(&self) -> Result<Config> {
        info!("Loading configuration from {}", self.config);
        Config::load(&self.config)
    }

    fn compiler(&self, config: Config, mode: Mode) -> Compiler {
        let bundler = Arc::new(EsbuildBundler::new(config.esbuild.clone()));
        let options = CompilerOptions {
            mode,
            json: self.json,
            progress: self.progress,
            merge: load_overlay(Path::new(&self.merge)),
        };

        Compiler::new(config, options, bundler)
    }
}

/// Print the Webpacker banner
fn print_banner() {
    eprintln!(
        "\n{} {} {}\n",
        "⚡".cyan(),
        "Webpacker".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_production_is_default() {
        let cli = Cli::try_parse_from(["webpacker"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config, "webpacker.toml");
        assert_eq!(cli.merge, "webpacker.merge.json");
    }

    #[test]
    fn test_aliases() {
        let cli = Cli::try_parse_from(["webpacker", "prod"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Production(_))));

        let cli = Cli::try_parse_from(["webpacker", "dev", "-c", "site.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Development(_))));
        assert_eq!(cli.config, "site.toml");
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["webpacker", "watch", "-j", "-p", "--no-color"]).unwrap();

        assert!(matches!(cli.command, Some(Commands::Watch(_))));
        assert!(cli.json);
        assert!(cli.progress);
        assert!(!cli.color_enabled());
    }

    #[test]
    fn test_color_flags_conflict() {
        assert!(Cli::try_parse_from(["webpacker", "--color", "--no-color"]).is_err());

        let cli = Cli::try_parse_from(["webpacker", "--color"]).unwrap();
        assert!(cli.color_enabled());
    }

    #[test]
    fn test_server_options() {
        let cli =
            Cli::try_parse_from(["webpacker", "server", "--port", "9000", "--no-live-reload"])
                .unwrap();
        let Some(Commands::Server(cmd)) = cli.command else {
            panic!("expected server command");
        };

        assert_eq!(cmd.port, Some(9000));
        assert_eq!(cmd.host, "localhost");
        assert!(cmd.no_live_reload);
    }
}
