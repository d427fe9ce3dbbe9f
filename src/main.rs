use std::io::Read;
use std::path::PathBuf;
use std::{fs, io, process};

use anyhow::Context;
use clap::Parser;

/// Interpreter for Prescribe (`.prsd`) source documents.
#[derive(Parser)]
#[command(name = "prescribe", version)]
struct Cli {
    /// Path to a .prsd source document
    path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.path.extension().and_then(|e| e.to_str()) != Some("prsd") {
        anyhow::bail!("expected a .prsd source file: {}", cli.path.display());
    }
    let source = fs::read_to_string(&cli.path)
        .with_context(|| format!("cannot read {}", cli.path.display()))?;

    // Stdin is consumed to end before execution begins.
    let mut stdin = String::new();
    io::stdin()
        .read_to_string(&mut stdin)
        .context("cannot read stdin")?;

    let outcome = prescribe::run_document(&source, &stdin);
    print!("{}", outcome.output);
    if let Some(diagnostic) = outcome.error {
        eprintln!("{diagnostic}");
        process::exit(1);
    }
    Ok(())
}
