use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};

use pomsync_cli::{Announce, CommonArgs};

#[derive(Parser, Debug)]
#[command(name = "process-artifacts")]
#[command(about = "Process Maven artifacts from JSON content.", long_about = None)]
#[command(group(ArgGroup::new("input").required(true).args(["json_content", "json_file"])))]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// JSON content containing Maven artifacts
    #[arg(long)]
    json_content: Option<String>,

    /// Read the artifacts JSON from a file (`-` for stdin).
    #[arg(long)]
    json_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let items = match read_input(&cli).and_then(|json| pomsync_core::parse_batch(&json)) {
        Ok(items) => items,
        Err(err) => {
            eprintln!("{err:#}");
            return ExitCode::from(1);
        }
    };
    pomsync_cli::run(&cli.common, items, Announce::PerItem)
}

fn read_input(cli: &Cli) -> Result<String> {
    if let Some(json) = &cli.json_content {
        return Ok(json.clone());
    }
    match cli.json_file.as_deref() {
        Some(path) if path.as_os_str() == "-" => {
            let mut buf = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)
                .context("read artifacts JSON from stdin")?;
            Ok(buf)
        }
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("read artifacts JSON: {}", path.display())),
        None => anyhow::bail!("one of --json-content or --json-file is required"),
    }
}
