//! Dev server command implementation

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::{BuildCommand, Cli};
use crate::bundler::Mode;
use crate::server::{shutdown_signal, DevServer, DevServerOptions};

/// Compile, watch and serve the output directory
#[derive(Args, Debug)]
pub struct ServerCommand {
    #[command(flatten)]
    pub build: BuildCommand,

    /// Host to bind to
    #[arg(long, default_value = "localhost")]
    pub host: String,

    /// Port to listen on; defaults to the first free port from 8080
    #[arg(long)]
    pub port: Option<u16>,

    /// Open browser automatically
    #[arg(long)]
    pub open: bool,

    /// Do not reload pages after a recompile
    #[arg(long)]
    pub no_live_reload: bool,
}

impl ServerCommand {
    pub async fn execute(&self, cli: &Cli) -> Result<ExitCode> {
        let mut config = cli.load_config()?;
        self.build.apply(&mut config);

        let compiler = Arc::new(cli.compiler(config, Mode::Development));
        let handle = DevServer::new(compiler, self.options()).start().await?;

        if !self.no_live_reload {
            eprintln!("  {} Live reload {}", "•".dimmed(), "enabled".green());
        }
        eprintln!("  {} Press {} to stop\n", "•".dimmed(), "Ctrl+C".yellow());

        handle.run_until(shutdown_signal()).await?;
        Ok(ExitCode::SUCCESS)
    }

    fn options(&self) -> DevServerOptions {
        DevServerOptions {
            host: self.host.clone(),
            port: self.port,
            open: self.open,
            live_reload: !self.no_live_reload,
        }
    }
}
