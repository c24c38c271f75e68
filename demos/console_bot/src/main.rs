//! Console Bot
//!
//! A chat bot whose "platform" is the terminal: every line typed on stdin is
//! raised as a `message_received` event, and everything the plugins send is
//! printed to stdout.
//!
//! Plugins live in `src/plugins/` and are switched on by the manifests in
//! `plugins/`. Edit a manifest and type `!reload <name>` to apply it without
//! restarting.
//!
//! # Usage
//!
//! ```bash
//! cd demos/console_bot
//! cargo run --package console-bot
//! cargo run --package console-bot -- --plugin-dir ./other-plugins --user alice
//! ```

mod console;
mod plugins;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use hearth::core::Services;
use hearth::runtime::config::{ConfigLoader, validate_config};
use hearth::runtime::HearthRuntime;
use tracing::info;

use crate::console::ConsoleSession;

#[derive(Debug, Parser)]
#[command(version, about = "Chat with Hearth plugins from the terminal")]
struct Cli {
    /// Configuration file (default: search for hearth.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. "production"
    #[arg(short, long)]
    profile: Option<String>,

    /// Override the plugin manifest directory
    #[arg(long)]
    plugin_dir: Option<PathBuf>,

    /// Name you chat as
    #[arg(short, long, default_value = "you")]
    user: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run(cli));
    // the stdin reader may still be parked in a blocking read
    runtime.shutdown_background();
    result
}

async fn run(cli: Cli) -> Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.file(path);
    }
    if let Some(profile) = &cli.profile {
        loader = loader.profile(profile);
    }
    let mut config = loader.load()?;
    if let Some(dir) = cli.plugin_dir {
        config.plugins.dir = dir;
    }
    validate_config(&config)?;

    let services = Services::in_memory().with_session(Arc::new(ConsoleSession::new(&cli.user)));
    let bot = Arc::new(HearthRuntime::with_services(&config, services));

    let input = tokio::spawn(console::read_stdin(Arc::clone(&bot), cli.user));
    bot.run().await?;
    input.abort();

    let replies = bot.host().services().metrics.get("echo.replies");
    info!(replies, "Console bot stopped");
    Ok(())
}
