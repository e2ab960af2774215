//! pdf2md CLI - PDF to Markdown converter

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdf2md::render::to_json;
use pdf2md::{
    ConfigError, Conversion, ConversionOptions, Converter, Error, ExtractionStats, ImageFormat,
    JsonFormat,
};

#[derive(Parser)]
#[command(name = "pdf2md")]
#[command(version)]
#[command(about = "Convert PDF documents to Markdown by layout reconstruction", long_about = None)]
struct Cli {
    /// Input PDF files
    #[arg(value_name = "FILE", required = true)]
    inputs: Vec<PathBuf>,

    /// Output file, or output directory when several inputs are given
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Directory for extracted images (default: next to the output)
    #[arg(long, value_name = "DIR")]
    images: Option<PathBuf>,

    /// Image format: png, jpg or jpeg
    #[arg(long, value_name = "FORMAT", default_value = "png")]
    image_format: String,

    /// Resolution limit for extracted images
    #[arg(long, value_name = "DPI", default_value_t = 150)]
    image_dpi: u32,

    /// Do not extract images
    #[arg(long)]
    no_images: bool,

    /// Render link text without link targets
    #[arg(long)]
    no_links: bool,

    /// Do not detect headings
    #[arg(long)]
    no_headings: bool,

    /// Do not emit bold and italic markers
    #[arg(long)]
    no_formatting: bool,

    /// Do not detect lists
    #[arg(long)]
    no_lists: bool,

    /// Do not detect tables
    #[arg(long)]
    no_tables: bool,

    /// Text between pages (\n and \t escapes are expanded)
    #[arg(long, value_name = "TEXT", env = "PDF2MD_PAGE_SEPARATOR")]
    page_separator: Option<String>,

    /// Write the classified block tree as JSON instead of Markdown
    #[arg(long)]
    json: bool,

    /// Print progress and extraction statistics
    #[arg(short, long)]
    verbose: bool,
}

/// Where a converted document is written.
#[derive(Debug, Clone, PartialEq)]
enum Destination {
    Stdout,
    File(PathBuf),
}

impl Destination {
    /// Directory that relative image paths are resolved against.
    fn base_dir(&self) -> PathBuf {
        match self {
            Destination::Stdout => PathBuf::from("."),
            Destination::File(path) => match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        }
    }
}

impl Cli {
    fn is_batch(&self) -> bool {
        self.inputs.len() > 1
    }

    fn options(&self) -> Result<ConversionOptions, ConfigError> {
        let mut options = ConversionOptions::new()
            .with_image_format(self.image_format.parse::<ImageFormat>()?)
            .with_image_dpi(self.image_dpi)
            .with_images(!self.no_images)
            .with_hyperlinks(!self.no_links)
            .with_headings(!self.no_headings)
            .with_formatting(!self.no_formatting)
            .with_lists(!self.no_lists)
            .with_tables(!self.no_tables);
        if let Some(separator) = &self.page_separator {
            options = options.with_page_separator(unescape(separator));
        }
        options.validate()?;
        Ok(options)
    }

    fn destination(&self, stem: &str) -> Destination {
        let extension = if self.json { "json" } else { "md" };
        match &self.output {
            None => Destination::Stdout,
            Some(out) if self.is_batch() || out.is_dir() => {
                Destination::File(out.join(format!("{stem}.{extension}")))
            }
            Some(out) => Destination::File(out.clone()),
        }
    }

    /// Image directory as referenced from the Markdown.
    ///
    /// Batches get one subdirectory per input so page-numbered names
    /// never collide.
    fn image_reference_dir(&self, stem: &str) -> Option<PathBuf> {
        match (&self.images, self.is_batch()) {
            (Some(dir), true) => Some(dir.join(stem)),
            (Some(dir), false) => Some(dir.clone()),
            (None, true) => Some(PathBuf::from(stem)),
            (None, false) => None,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let options = match cli.options() {
        Ok(options) => options,
        Err(e) => {
            let err = Error::from(e);
            eprintln!("{}: {}", "Error".red().bold(), err);
            return ExitCode::from(err.exit_code() as u8);
        }
    };

    let failures = if cli.is_batch() {
        run_batch(&cli, &options)
    } else {
        run_single(&cli, &options)
    };

    if failures == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run_single(cli: &Cli, options: &ConversionOptions) -> usize {
    let input = &cli.inputs[0];
    match process_file(cli, options, input) {
        Ok(stats) => {
            if cli.verbose {
                print_stats(input, &stats);
            }
            0
        }
        Err(e) => {
            eprintln!("{}: {}: {}", "Error".red().bold(), input.display(), e);
            1
        }
    }
}

fn run_batch(cli: &Cli, options: &ConversionOptions) -> usize {
    let pb = ProgressBar::new(cli.inputs.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut failures = 0;
    let mut total = ExtractionStats::new();
    for input in &cli.inputs {
        pb.set_message(input.display().to_string());
        match process_file(cli, options, input) {
            Ok(stats) => total.merge(&stats),
            Err(e) => {
                failures += 1;
                pb.println(format!("{}: {}: {}", "Error".red().bold(), input.display(), e));
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("Done!");

    let converted = cli.inputs.len() - failures;
    eprintln!(
        "\n{} {} converted, {} failed",
        "Finished:".green().bold(),
        converted,
        failures
    );
    if cli.verbose {
        print_stats(Path::new("all inputs"), &total);
    }
    failures
}

/// Convert one input and write its output and images.
fn process_file(
    cli: &Cli,
    options: &ConversionOptions,
    input: &Path,
) -> pdf2md::Result<ExtractionStats> {
    let stem = file_stem(input);
    let destination = cli.destination(&stem);
    let image_dir = cli.image_reference_dir(&stem);

    let mut options = options.clone();
    if let Some(dir) = &image_dir {
        options = options.with_image_dir(dir.clone());
    }
    let conversion = Converter::new(options)?.convert_file(input)?;

    if !conversion.images.is_empty() {
        let relative = image_dir.unwrap_or_default();
        let disk_dir = if cli.images.is_some() {
            relative
        } else {
            destination.base_dir().join(relative)
        };
        write_images(&disk_dir, &conversion)?;
    }

    let text = if cli.json {
        to_json(&conversion.document, JsonFormat::Pretty)?
    } else {
        conversion.markdown
    };
    write_output(&destination, &text)?;
    Ok(conversion.stats)
}

fn write_images(dir: &Path, conversion: &Conversion) -> pdf2md::Result<()> {
    fs::create_dir_all(dir)?;
    for image in &conversion.images {
        let path = dir.join(&image.file_name);
        fs::write(&path, &image.data)?;
        log::info!("wrote image {}", path.display());
    }
    Ok(())
}

fn write_output(destination: &Destination, text: &str) -> pdf2md::Result<()> {
    match destination {
        Destination::Stdout => {
            let mut out = io::stdout().lock();
            writeln!(out, "{}", text)?;
        }
        Destination::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, text)?;
            log::info!("wrote {}", path.display());
        }
    }
    Ok(())
}

fn print_stats(input: &Path, stats: &ExtractionStats) {
    eprintln!();
    eprintln!("{} {}", "Statistics for".cyan().bold(), input.display());
    eprintln!("{}", "─".repeat(40).dimmed());
    eprintln!("{}: {}", "Pages".bold(), stats.page_count);
    eprintln!("{}: {}", "Headings".bold(), stats.heading_count);
    eprintln!("{}: {}", "Paragraphs".bold(), stats.paragraph_count);
    eprintln!("{}: {}", "List items".bold(), stats.list_item_count);
    eprintln!(
        "{}: {} ({} rows)",
        "Tables".bold(),
        stats.table_count,
        stats.table_row_count
    );
    eprintln!("{}: {}", "Code blocks".bold(), stats.code_block_count);
    eprintln!("{}: {}", "Images".bold(), stats.image_count);
    eprintln!("{}: {}", "Links".bold(), stats.link_count);
    eprintln!("{}: {}", "Cross-page merges".bold(), stats.merge_count);
    eprintln!("{}: {}", "Words".bold(), stats.word_count);
    eprintln!("{}: {}", "Characters".bold(), stats.char_count);
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// Expand `\n`, `\t` and `\\` escapes typed on the command line.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
