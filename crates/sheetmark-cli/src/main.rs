// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// sheetmark — answer-sheet reader.
//
// Entry point. Initialises logging, builds the reader configuration, and
// dispatches to the batch, single-sheet, and config subcommands.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use sheetmark_core::OmrConfig;
use sheetmark_io::{
    BatchRunner, DirectorySink, ImageDirSource, PdfSource, SheetIdentifier, SheetSource,
    StemIdentifier, UnknownIdentifier,
};
use sheetmark_vision::SheetReader;
use tracing_subscriber::EnvFilter;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Parser)]
#[command(name = "sheetmark")]
#[command(about = "Read filled-in multiple-choice answer sheets")]
#[command(version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Process every sheet in a directory.
    Run {
        /// Directory of sheet images (or PDFs with --pdf).
        #[arg(long)]
        input: PathBuf,

        /// Treat the input as a directory of scanned PDFs.
        #[arg(long)]
        pdf: bool,

        /// Results directory.
        #[arg(long, default_value = "Results")]
        output: PathBuf,

        /// Also write annotated images and raw fill scores.
        #[arg(long)]
        audit: bool,

        /// How sheets are assigned an ID.
        #[arg(long, value_enum, default_value_t = IdFrom::Unknown)]
        id_from: IdFrom,

        /// Directory holding the OCR models (for --id-from ocr).
        #[arg(long)]
        ocr_models: Option<PathBuf>,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Process one image and print its answers as JSON.
    Read {
        /// Sheet image.
        #[arg(long)]
        image: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Print the default configuration as JSON.
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum IdFrom {
    /// File every sheet under `unknown_id`.
    Unknown,
    /// Use the input file name (or PDF page name).
    Filename,
    /// Read the printed `ID:` label (needs the `ocr` feature).
    Ocr,
}

#[derive(Debug, Clone, Default, Args)]
struct ConfigArgs {
    /// JSON configuration file; missing fields take defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Canonical sheet width in pixels.
    #[arg(long)]
    width: Option<u32>,

    /// Canonical sheet height in pixels.
    #[arg(long)]
    height: Option<u32>,

    /// Number of questions on the sheet.
    #[arg(long)]
    questions: Option<usize>,

    /// Choices per question.
    #[arg(long)]
    choices: Option<usize>,
}

impl ConfigArgs {
    /// Load the file (or defaults) and apply command-line overrides.
    fn resolve(&self) -> CliResult<OmrConfig> {
        let mut config = match &self.config {
            Some(path) => OmrConfig::from_json_file(path)?,
            None => OmrConfig::default(),
        };
        if let Some(width) = self.width {
            config.target_width = width;
        }
        if let Some(height) = self.height {
            config.target_height = height;
        }
        if let Some(questions) = self.questions {
            config.question_count = questions;
        }
        if let Some(choices) = self.choices {
            config.choice_count = choices;
            config.grid.choice_count = choices;
        }
        Ok(config)
    }
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            input,
            pdf,
            output,
            audit,
            id_from,
            ocr_models,
            config,
        } => run_batch(
            &input,
            pdf,
            &output,
            audit,
            id_from,
            ocr_models.as_deref(),
            &config,
        ),
        Commands::Read { image, config } => read_one(&image, &config),
        Commands::Config => print_default_config(),
    }
}

fn run_batch(
    input: &Path,
    pdf: bool,
    output: &Path,
    audit: bool,
    id_from: IdFrom,
    ocr_models: Option<&Path>,
    config: &ConfigArgs,
) -> CliResult<()> {
    let reader = SheetReader::new(config.resolve()?)?;
    let identifier = build_identifier(id_from, ocr_models)?;
    let source: Box<dyn SheetSource> = if pdf {
        Box::new(PdfSource::new(input))
    } else {
        Box::new(ImageDirSource::new(input))
    };
    let sink = DirectorySink::new(output).with_audit(audit);

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        "Reading sheets"
    );
    let summary = BatchRunner::new(&reader).run(source.as_ref(), identifier.as_ref(), &sink)?;

    for failure in &summary.failed {
        eprintln!("failed: {}: {}", failure.entry, failure.error);
    }
    println!(
        "{} sheet(s) processed, {} failed; results in {}",
        summary.processed,
        summary.failed.len(),
        output.display()
    );
    Ok(())
}

fn build_identifier(
    id_from: IdFrom,
    ocr_models: Option<&Path>,
) -> CliResult<Box<dyn SheetIdentifier>> {
    match id_from {
        IdFrom::Unknown => Ok(Box::new(UnknownIdentifier)),
        IdFrom::Filename => Ok(Box::new(StemIdentifier)),
        IdFrom::Ocr => ocr_identifier(ocr_models),
    }
}

#[cfg(feature = "ocr")]
fn ocr_identifier(models: Option<&Path>) -> CliResult<Box<dyn SheetIdentifier>> {
    use sheetmark_io::{OcrIdentifier, OcrModels};

    let models = models.map(OcrModels::from_dir).unwrap_or_default();
    Ok(Box::new(OcrIdentifier::new(models)?))
}

#[cfg(not(feature = "ocr"))]
fn ocr_identifier(_models: Option<&Path>) -> CliResult<Box<dyn SheetIdentifier>> {
    Err("sheetmark was built without OCR support; rebuild with `--features ocr`".into())
}

fn read_one(image_path: &Path, config: &ConfigArgs) -> CliResult<()> {
    let reader = SheetReader::new(config.resolve()?)?;
    let image = image::open(image_path).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", image_path.display(), e).into()
    })?;
    let image = image::DynamicImage::ImageRgb8(image.to_rgb8());

    let answers = reader.read_answers(&image)?;
    println!("{}", serde_json::to_string_pretty(&answers)?);
    Ok(())
}

fn print_default_config() -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(&OmrConfig::default())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults() {
        let cli = Cli::try_parse_from(["sheetmark", "run", "--input", "scans"]).expect("parse");
        match cli.command {
            Commands::Run {
                input,
                pdf,
                output,
                audit,
                id_from,
                ..
            } => {
                assert_eq!(input, PathBuf::from("scans"));
                assert!(!pdf);
                assert!(!audit);
                assert_eq!(output, PathBuf::from("Results"));
                assert_eq!(id_from, IdFrom::Unknown);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn overrides_apply_to_config() {
        let cli = Cli::try_parse_from([
            "sheetmark",
            "read",
            "--image",
            "s.png",
            "--questions",
            "100",
            "--choices",
            "4",
            "--width",
            "600",
        ])
        .expect("parse");
        let Commands::Read { config, .. } = cli.command else {
            panic!("expected read");
        };
        let resolved = config.resolve().expect("config");
        assert_eq!(resolved.question_count, 100);
        assert_eq!(resolved.choice_count, 4);
        assert_eq!(resolved.grid.choice_count, 4);
        assert_eq!(resolved.target_width, 600);
        assert_eq!(resolved.target_height, 980);
        assert!(resolved.validate().is_ok());
    }

    #[test]
    fn id_source_values() {
        let cli = Cli::try_parse_from([
            "sheetmark",
            "run",
            "--input",
            "in",
            "--id-from",
            "filename",
            "--pdf",
            "--audit",
        ])
        .expect("parse");
        let Commands::Run {
            id_from, pdf, audit, ..
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(id_from, IdFrom::Filename);
        assert!(pdf && audit);
        assert!(Cli::try_parse_from(["sheetmark", "run", "--input", "in", "--id-from", "barcode"]).is_err());
    }

    #[test]
    fn missing_config_file_is_reported() {
        let args = ConfigArgs {
            config: Some(PathBuf::from("/nonexistent/sheetmark.json")),
            ..ConfigArgs::default()
        };
        assert!(args.resolve().is_err());
    }
}
