use std::{fs, path::PathBuf};

use anyhow::Context as _;
use clap::Parser;
use tracing::instrument;
use tsid::{Config, Document, document::Colored, domain::Grammar};

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "List the identifiers of a document in their colors")]
pub struct Show {
    /// The markdown document to read
    file: PathBuf,
}

impl Show {
    #[instrument(level = "debug", skip(config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let text = fs::read_to_string(&self.file)
            .with_context(|| format!("failed to read {}", self.file.display()))?;
        let document = Document::new(text, config)
            .with_context(|| format!("failed to load {}", self.file.display()))?;
        let registry = document.registry();

        if registry.is_empty() {
            println!("{}", "No identifiers found".dim());
            return Ok(());
        }

        let width = registry.len().saturating_sub(1).to_string().len() + 1;
        for (identifier, _) in registry.iter() {
            let colored = document.colored(identifier)?;
            let class = registry.class(identifier).unwrap_or_default();
            let status = if registry.is_defined(identifier) {
                "defined".success()
            } else {
                "undefined".warning()
            };
            println!(
                "{}  {}  {status}",
                format!("{class:>width$}").dim(),
                paint(&colored, &config.grammar)
            );
        }
        Ok(())
    }
}

/// The identifier with each segment drawn over its own color, brackets
/// handled as in the HTML rendering.
fn paint(colored: &Colored, grammar: &Grammar) -> String {
    let text = colored.text();
    let stripped = text.len() - text.trim_start_matches(grammar.open).len();
    colored
        .segments()
        .iter()
        .map(|segment| {
            let start = segment.span.start.max(stripped);
            let chunk: String = text[start..segment.span.end]
                .chars()
                .map(|c| {
                    if c == grammar.open || c == grammar.close {
                        ' '
                    } else {
                        c
                    }
                })
                .collect();
            chunk.highlight(segment.color.rgb())
        })
        .collect()
}
