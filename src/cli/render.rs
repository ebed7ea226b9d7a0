use std::{fs, path::PathBuf};

use anyhow::Context as _;
use clap::Parser;
use tracing::instrument;
use tsid::{Config, Document};

#[derive(Debug, Parser)]
#[command(about = "Rewrite the identifiers of a markdown document into colored anchors")]
pub struct Render {
    /// The markdown document to read
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the rewritten document
    #[arg(short, long)]
    output: PathBuf,

    /// Also write the per-identifier backgrounds as JSON
    #[arg(long, value_name = "FILE")]
    styles: Option<PathBuf>,
}

impl Render {
    #[instrument(level = "debug", skip(config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let text = fs::read_to_string(&self.input)
            .with_context(|| format!("failed to read {}", self.input.display()))?;
        let document = Document::new(text, config)
            .with_context(|| format!("failed to load {}", self.input.display()))?;

        let output = document.substitute()?;
        fs::write(&self.output, output)
            .with_context(|| format!("failed to write {}", self.output.display()))?;
        tracing::info!(
            identifiers = document.registry().len(),
            output = %self.output.display(),
            "rendered document"
        );

        if let Some(path) = &self.styles {
            let styles = serde_json::to_string_pretty(&document.styles()?)?;
            fs::write(path, styles)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        Ok(())
    }
}
