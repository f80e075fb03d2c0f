// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nomos_cli::{resolve_target, YamlFileParser};
use nomos_compile::CompileOptions;
use nomos_serialize::Target;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Exit code used for any compile or I/O failure.
const EXIT_RUNTIME_ERROR: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "nomos", version, about = "nomos configuration-scripting-language compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a `.csl` file or directory to a serialized snapshot.
    Compile {
        /// `.csl` source file or directory of source files.
        path: PathBuf,

        /// Output serialization format. `--out`'s file extension takes
        /// precedence when it names a recognized one.
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        /// Write the result here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Convert unknown-alias/fetch-failure errors into warnings.
        #[arg(long)]
        allow_missing_provider: bool,

        /// Elevate warnings to errors.
        #[arg(long)]
        strict_warnings: bool,

        /// Include `Snapshot.metadata` in the serialized output.
        #[arg(long)]
        include_metadata: bool,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum FormatArg {
    Json,
    Yaml,
    Tfvars,
}

impl From<FormatArg> for Target {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Json => Target::Json,
            FormatArg::Yaml => Target::Yaml,
            FormatArg::Tfvars => Target::Tfvars,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("nomos=debug")
    } else {
        EnvFilter::new("nomos=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Compile {
            path,
            format,
            out,
            allow_missing_provider,
            strict_warnings,
            include_metadata,
        } => {
            cmd_compile(
                path,
                format,
                out,
                allow_missing_provider,
                strict_warnings,
                include_metadata,
            )
            .await
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(EXIT_RUNTIME_ERROR);
    }
}

#[allow(clippy::too_many_arguments)]
async fn cmd_compile(
    path: PathBuf,
    format: Option<FormatArg>,
    out: Option<PathBuf>,
    allow_missing_provider: bool,
    strict_warnings: bool,
    include_metadata: bool,
) -> Result<()> {
    let mut options = CompileOptions::new(path, Arc::new(YamlFileParser));
    options.allow_missing_provider = allow_missing_provider;
    options.strict_warnings = strict_warnings;

    let snapshot = nomos_compile::compile(options)
        .await
        .context("compile failed")?;

    let target = resolve_target(format.map(Target::from), out.as_deref());
    let bytes = nomos_serialize::serialize(&snapshot, target, include_metadata)
        .context("serialization failed")?;

    match out {
        Some(path) => {
            std::fs::write(&path, &bytes)
                .with_context(|| format!("write output to {}", path.display()))?;
        }
        None => {
            use std::io::Write;
            std::io::stdout()
                .write_all(&bytes)
                .context("write output to stdout")?;
        }
    }

    if !snapshot.metadata.errors.is_empty() {
        for error in &snapshot.metadata.errors {
            eprintln!("error: {error}");
        }
        std::process::exit(EXIT_RUNTIME_ERROR);
    }

    Ok(())
}
