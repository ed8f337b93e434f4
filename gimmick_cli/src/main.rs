use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use gimmick_compiler::{PatternLibrary, Timeline};
use log::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "gimmicks")]
#[command(about = "Compiles gimmick documents into chart BPM changes and stops", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compile a gimmick document.
    Compile {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value_t = Format::Json)]
        format: Format,
        /// Extra pattern definitions layered over the built-ins.
        #[arg(short, long)]
        patterns: Option<PathBuf>,
    },
    /// List the patterns a document can reference.
    Patterns {
        #[arg(short, long)]
        patterns: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// `{"bpms": [...], "stops": [...]}`
    Json,
    /// `#BPMS:...;` and `#STOPS:...;` tags
    Sm,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Json => "timing.json",
            Format::Sm => "timing.sm",
        }
    }

    fn render(self, timeline: &Timeline) -> anyhow::Result<String> {
        match self {
            Format::Json => {
                serde_json::to_string_pretty(timeline).context("failed to serialize timing")
            }
            Format::Sm => Ok(timeline.to_sm_tags()),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Compile {
            input,
            output,
            format,
            patterns,
        } => {
            let library = load_library(patterns.as_deref())?;
            let timeline = gimmick_compiler::compile_file(&input, &library)
                .map_err(|e| anyhow::anyhow!(e.to_string()))
                .with_context(|| format!("compile failed: {}", input.display()))?;

            let rendered = format.render(&timeline)?;
            let out_path = output.unwrap_or_else(|| default_output_path(&input, format));
            fs::write(&out_path, rendered)
                .with_context(|| format!("failed to write: {}", out_path.display()))?;
            info!("wrote {}", out_path.display());
        }
        Command::Patterns { patterns } => {
            let library = load_library(patterns.as_deref())?;
            for name in library.names() {
                println!("{name}");
            }
        }
    }

    Ok(())
}

fn load_library(extra: Option<&Path>) -> anyhow::Result<PatternLibrary> {
    let mut library = PatternLibrary::builtin();
    if let Some(path) = extra {
        let src = fs::read_to_string(path)
            .with_context(|| format!("failed to read patterns: {}", path.display()))?;
        let defs = PatternLibrary::from_yaml_str(&src)
            .map_err(|e| anyhow::anyhow!(e.to_string()))
            .with_context(|| format!("invalid patterns: {}", path.display()))?;
        if defs.is_empty() {
            warn!("no patterns defined in {}", path.display());
        } else {
            info!("loaded {} patterns from {}", defs.len(), path.display());
        }
        library.extend(defs);
    }
    Ok(library)
}

fn default_output_path(input: &Path, format: Format) -> PathBuf {
    let mut out = input.to_path_buf();
    out.set_extension(format.extension());
    out
}
