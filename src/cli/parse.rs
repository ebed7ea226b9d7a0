use clap::Parser;
use tracing::instrument;
use tsid::{Config, Term};

use super::terminal::Colorize;

#[derive(Debug, Parser)]
#[command(about = "Parse identifiers and print their syntax tree")]
pub struct Parse {
    /// The identifiers to parse
    #[arg(required = true)]
    identifiers: Vec<String>,
}

impl Parse {
    #[instrument(level = "debug", skip(config))]
    pub fn run(self, config: &Config) -> anyhow::Result<()> {
        let parser = tsid::Parser::new(config.grammar)?;
        let mut failed = 0usize;
        for identifier in &self.identifiers {
            match parser.parse(identifier) {
                Ok(thesis) => {
                    println!("{} {}", identifier.success(), format!("({thesis})").dim());
                    print_tree(thesis.value(), 1);
                }
                Err(e) => {
                    failed += 1;
                    println!("{} {}", identifier.warning(), e.to_string().dim());
                }
            }
        }
        if failed > 0 {
            anyhow::bail!("{failed} of {} identifiers failed to parse", self.identifiers.len());
        }
        Ok(())
    }
}

fn print_tree(term: &Term, depth: usize) {
    let indent = "  ".repeat(depth);
    let span = term.span();
    let location = format!("[{}..{})", span.start, span.end).dim();
    match term {
        Term::Number(number) => println!("{indent}Number {} {location}", number.value()),
        Term::Root(root) => println!("{indent}Root {} {location}", root.value()),
        Term::Atom(atom) => {
            let number = atom
                .number()
                .map(|number| number.value().to_string())
                .unwrap_or_default();
            println!(
                "{indent}Atom {}{} {location}",
                atom.root().value().info(),
                number
            );
        }
        Term::Clarification(clarification) => {
            println!("{indent}Clarification {location}");
            print_tree(clarification.first(), depth + 1);
            for part in clarification.other().iter() {
                println!("{indent}  . {part}");
            }
        }
        Term::Version(version) => {
            println!("{indent}Version {location}");
            print_tree(version.first(), depth + 1);
            for part in version.other().iter() {
                println!("{indent}  - {part}");
            }
        }
        Term::Answer(answer) => {
            println!("{indent}Answer {location}");
            for alternative in answer.alternatives() {
                print_tree(alternative, depth + 1);
            }
        }
    }
}
