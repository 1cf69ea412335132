//! OpenAPI merge CLI
//!
//! Command-line interface for consolidating multi-file OpenAPI documents.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use oas_merge::{merge, MergeOptions, OutputFormat, DEFAULT_MAX_DEPTH};

#[derive(Parser)]
#[command(name = "oas-merge")]
#[command(about = "Merge multi-file OpenAPI documents into one self-contained document")]
#[command(version)]
struct Cli {
    /// Log resolution steps (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a root document and the documents it references
    Merge {
        /// Root document
        root: PathBuf,

        /// Other documents that references may point at
        files: Vec<PathBuf>,

        /// Output file
        #[arg(long, short, default_value = "openapi.merged.yaml")]
        output: PathBuf,

        /// Output format: yaml or json (default: from the output extension)
        #[arg(long)]
        format: Option<String>,

        /// Maximum nesting of external references
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: usize,

        /// Write the merged document to stdout instead of the output file
        #[arg(long)]
        stdout: bool,

        /// Print the result and diagnostics as JSON (for automation)
        #[arg(long, conflicts_with = "stdout")]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Commands::Merge {
            root,
            files,
            output,
            format,
            max_depth,
            stdout,
            json,
        } => run_merge(MergeArgs {
            root,
            files,
            output,
            format,
            max_depth,
            stdout,
            json_output: json,
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

struct MergeArgs {
    root: PathBuf,
    files: Vec<PathBuf>,
    output: PathBuf,
    format: Option<String>,
    max_depth: usize,
    stdout: bool,
    json_output: bool,
}

fn run_merge(args: MergeArgs) -> Result<(), u8> {
    let MergeArgs {
        root,
        files,
        output,
        format,
        max_depth,
        stdout,
        json_output,
    } = args;

    let mut options = MergeOptions::new(output).max_depth(max_depth);
    if let Some(name) = format {
        let Some(format) = OutputFormat::parse(&name) else {
            eprintln!("Error: unknown format \"{}\": expected yaml or json", name);
            return Err(2);
        };
        options = options.format(format);
    }

    let mut inputs = Vec::with_capacity(files.len() + 1);
    inputs.push(root);
    inputs.extend(files);

    let outcome = merge(&inputs, &options);

    if json_output {
        let summary = serde_json::to_string(&outcome.summary()).map_err(|e| {
            eprintln!("Error serializing result: {}", e);
            2u8
        })?;
        println!("{}", summary);
    }

    let Some(encoded) = outcome.encode(&options) else {
        if !json_output {
            if let Some(error) = &outcome.error {
                eprintln!("Error: {}", error);
            }
        }
        return Err(outcome.exit_code() as u8);
    };
    let encoded = encoded.map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    if stdout {
        print!("{}", encoded);
        return Ok(());
    }

    if let Some(parent) = outcome.output_location.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                eprintln!("Error creating {}: {}", parent.display(), e);
                3u8
            })?;
        }
    }
    std::fs::write(&outcome.output_location, &encoded).map_err(|e| {
        eprintln!(
            "Error writing to {}: {}",
            outcome.output_location.display(),
            e
        );
        3u8
    })?;

    if !json_output {
        eprintln!(
            "Wrote {} ({} warning(s))",
            outcome.output_location.display(),
            outcome.diagnostics.len()
        );
    }
    Ok(())
}
