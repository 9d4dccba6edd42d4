//! # Folio CLI
//!
//! Usage:
//!   folio sheet.json                 # writes sheet.pdf next to the input
//!   folio sheet.json -o out.pdf
//!   folio sheet.json --layout        # prints the placed pages as JSON

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use folio::FolioError;

#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version, about = "Lay out a sheet and write it to PDF", long_about = None)]
struct Args {
    /// Path to the sheet document (JSON)
    input: PathBuf,

    /// Where to write the PDF (default: the input path with a .pdf extension)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Use debug logging level
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    debug: bool,

    /// Print every warning to stderr after rendering
    #[arg(short = 'w', long = "print-warnings", action = ArgAction::SetTrue)]
    print_warnings: bool,

    /// Print the laid-out pages as JSON instead of writing a PDF
    #[arg(long, action = ArgAction::SetTrue)]
    layout: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), level))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("✗ {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), FolioError> {
    let input = fs::read_to_string(&args.input).map_err(|source| FolioError::Io {
        path: args.input.clone(),
        source,
    })?;
    let base_dir = args.input.parent();

    if args.layout {
        println!("{}", folio::layout_json(&input, base_dir)?);
        return Ok(());
    }

    let output = folio::render_json_with_base(&input, base_dir)?;
    let path = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("pdf"));
    fs::write(&path, &output.pdf).map_err(|source| FolioError::Io {
        path: path.clone(),
        source,
    })?;

    if args.print_warnings {
        for w in &output.warnings {
            eprintln!("warning: {w}");
        }
    }
    eprintln!(
        "✓ Written {} bytes to {} ({} warnings)",
        output.pdf.len(),
        path.display(),
        output.warnings.len()
    );
    Ok(())
}
