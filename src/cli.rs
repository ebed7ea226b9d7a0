use std::path::{Path, PathBuf};

mod parse;
mod render;
mod show;
mod terminal;

use anyhow::Context as _;
use clap::ArgAction;
use parse::Parse;
use render::Render;
use show::Show;
use tsid::Config;

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);

        let config = load_config(self.config.as_deref())?;
        self.command.run(&config)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::debug!("no configuration file given, using defaults");
        return Ok(Config::default());
    };
    let config = Config::load(path)
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("loading {}", path.display()))?;
    tracing::info!(path = %path.display(), "loaded configuration");
    Ok(config)
}

#[derive(Debug, clap::Parser)]
pub enum Command {
    /// Rewrite the identifiers of a markdown document into colored anchors
    Render(Render),

    /// Parse identifiers and print their syntax tree
    Parse(Parse),

    /// List the identifiers of a document in their colors
    Show(Show),
}

impl Command {
    fn run(self, config: &Config) -> anyhow::Result<()> {
        match self {
            Self::Render(command) => command.run(config)?,
            Self::Parse(command) => command.run(config)?,
            Self::Show(command) => command.run(config)?,
        }
        Ok(())
    }
}
