//! Webpacker library
//!
//! Entry pattern resolution, bundler configuration, compile driver and dev
//! server behind the `webpacker` command.

pub mod bundler;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod entries;
pub mod plugins;
pub mod server;
pub mod utils;

pub use bundler::Bundler;
pub use cli::Cli;
pub use compiler::Compiler;
pub use config::Config;
pub use entries::{resolve, EntrySpec, ResolvedEntryTable};
