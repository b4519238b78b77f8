//! epubmd - EPUB to Markdown converter

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use epubmd::{
    CancelToken, ConversionOptions, ConversionOutput, Format, ImageHandling, OutputStructure,
};

#[derive(Parser)]
#[command(name = "epubmd")]
#[command(version, about = "Convert EPUB ebooks to Markdown", long_about = None)]
#[command(after_help = "EXAMPLES:
    epubmd book.epub                    Write ./book/ with one file per chapter
    epubmd --structure single --zip *.epub -o out
                                        One book.md per input, zipped
    epubmd -i book.epub                 Show book metadata")]
struct Cli {
    /// Input EPUB files
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Directory receiving one output per input
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output: PathBuf,

    /// Markdown dialect
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Embed images as data URLs or write them to images/
    #[arg(long, value_enum)]
    images: Option<ImageHandling>,

    /// One file per chapter or a single book.md
    #[arg(long, value_enum)]
    structure: Option<OutputStructure>,

    /// Write <stem>.zip instead of a <stem>/ directory
    #[arg(long)]
    zip: bool,

    /// JSON file with conversion options; flags take precedence
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show book metadata without converting
    #[arg(short, long)]
    info: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log each pipeline stage
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    let result = if cli.info {
        cli.inputs.iter().try_for_each(|path| show_info(path))
    } else {
        run(&cli)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(cli: &Cli) {
    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("epubmd={level}")));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn load_options(cli: &Cli) -> Result<ConversionOptions, String> {
    let mut options = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("{}: {e}", path.display()))?;
            serde_json::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))?
        }
        None => ConversionOptions::default(),
    };

    if let Some(format) = cli.format {
        options.format = format;
    }
    if let Some(images) = cli.images {
        options.image_handling = images;
    }
    if let Some(structure) = cli.structure {
        options.output_structure = structure;
    }
    Ok(options)
}

fn run(cli: &Cli) -> Result<(), String> {
    let options = load_options(cli)?;
    tracing::debug!(?options, "loaded options");

    let results = epubmd::convert_all(&cli.inputs, &options, &CancelToken::new());

    let mut failed = 0;
    for (input, result) in cli.inputs.iter().zip(results) {
        let written = result
            .map_err(|e| e.to_string())
            .and_then(|output| write_output(cli, &options, input, &output));
        match written {
            Ok(target) => {
                if !cli.quiet {
                    println!("{} -> {}", input.display(), target.display());
                }
            }
            Err(e) => {
                eprintln!("error: {}: {e}", input.display());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} of {} conversions failed", cli.inputs.len()));
    }
    Ok(())
}

fn write_output(
    cli: &Cli,
    options: &ConversionOptions,
    input: &Path,
    output: &ConversionOutput,
) -> Result<PathBuf, String> {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "book".to_string());

    if cli.zip {
        std::fs::create_dir_all(&cli.output).map_err(|e| e.to_string())?;
        let target = cli.output.join(format!("{stem}.zip"));
        let file = File::create(&target).map_err(|e| format!("{}: {e}", target.display()))?;
        let mut writer = epubmd::write_zip(output, options.output_structure, BufWriter::new(file))
            .map_err(|e| e.to_string())?;
        writer.flush().map_err(|e| e.to_string())?;
        Ok(target)
    } else {
        let target = cli.output.join(stem);
        epubmd::write_to_dir(output, options.output_structure, &target)
            .map_err(|e| e.to_string())?;
        Ok(target)
    }
}

fn show_info(path: &Path) -> Result<(), String> {
    let document = epubmd::open_document(path).map_err(|e| e.to_string())?;

    let meta = &document.metadata;
    println!("File: {}", path.display());
    println!("Title: {}", meta.title);
    if let Some(ref creator) = meta.creator {
        println!("Author: {creator}");
    }
    if let Some(ref language) = meta.language {
        println!("Language: {language}");
    }
    if let Some(ref publisher) = meta.publisher {
        println!("Publisher: {publisher}");
    }
    if let Some(ref desc) = meta.description {
        let desc = desc.trim();
        match desc.char_indices().nth(200) {
            Some((end, _)) => println!("Description: {}...", &desc[..end]),
            None => println!("Description: {desc}"),
        }
    }
    println!("Cover: {}", if meta.cover_image.is_some() { "yes" } else { "no" });
    println!("Chapters: {}", document.chapters.len());
    println!("TOC entries: {}", document.outline.len());
    println!("Images: {}", document.images.len());
    println!();

    Ok(())
}
