//! tsr CLI - TSR image tool
//!
//! Converts common raster images to TSR, exports TSR files back to
//! PNG/JPEG/etc., and reports file information.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

use tsrimage::{codec, import, EncodeOptions, ImportOptions, Quality, ResizeAlgorithm};

/// TSR image codec: compact zlib-compressed RGB with median-cut import.
#[derive(Parser, Debug)]
#[command(name = "tsr")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Show verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import an image: halve it, reduce its palette, save as TSR
    Convert(ConvertArgs),
    /// Save an image as TSR losslessly (no downscale, no palette reduction)
    Encode(EncodeArgs),
    /// Decode a TSR file and write it in another format (from extension)
    Export(ExportArgs),
    /// Print name, dimensions, colors and size of a TSR file
    Info(InfoArgs),
}

#[derive(ClapArgs, Debug)]
struct ConvertArgs {
    /// Input image file (PNG, JPEG, GIF, BMP, ...)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output TSR path (defaults to INPUT with a .tsr extension)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Quality level: 100%, 75%, 50% or 25%
    #[arg(short, long, default_value = "100%")]
    quality: Quality,

    /// Filter used for the 50% downscale
    #[arg(long, value_enum, default_value = "bilinear")]
    resize: ResizeArg,

    /// Apply Floyd-Steinberg dithering during palette mapping
    #[arg(long)]
    dither: bool,

    /// zlib compression level (0-9, higher = smaller file)
    #[arg(short = 'c', long, default_value = "9", value_parser = clap::value_parser!(u8).range(0..=9))]
    compression: u8,
}

#[derive(ClapArgs, Debug)]
struct EncodeArgs {
    /// Input image file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output TSR path (defaults to INPUT with a .tsr extension)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// zlib compression level (0-9, higher = smaller file)
    #[arg(short = 'c', long, default_value = "9", value_parser = clap::value_parser!(u8).range(0..=9))]
    compression: u8,
}

#[derive(ClapArgs, Debug)]
struct ExportArgs {
    /// Input TSR file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output image path (defaults to INPUT with a .png extension)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct InfoArgs {
    /// Input TSR file
    #[arg(value_name = "INPUT")]
    input: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResizeArg {
    /// Nearest neighbor (fastest, blocky)
    Nearest,
    /// Bilinear interpolation (balanced)
    Bilinear,
    /// Lanczos3 (sharpest, slowest)
    Lanczos3,
}

impl From<ResizeArg> for ResizeAlgorithm {
    fn from(arg: ResizeArg) -> Self {
        match arg {
            ResizeArg::Nearest => ResizeAlgorithm::Nearest,
            ResizeArg::Bilinear => ResizeAlgorithm::Bilinear,
            ResizeArg::Lanczos3 => ResizeAlgorithm::Lanczos3,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .target(env_logger::Target::Stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Convert(args) => convert(args, cli.verbose),
        Command::Encode(args) => encode(args, cli.verbose),
        Command::Export(args) => export(args, cli.verbose),
        Command::Info(args) => info(&args.input),
    }
}

fn convert(args: ConvertArgs, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let options = ImportOptions::builder()
        .quality(args.quality)
        .resize_algorithm(args.resize.into())
        .dithering(args.dither)
        .build();
    let output = args
        .output
        .unwrap_or_else(|| args.input.with_extension("tsr"));

    let start = Instant::now();
    let matrix = import::import_path(&args.input, &options)?;
    let import_time = start.elapsed();

    let start = Instant::now();
    codec::save(
        &output,
        &matrix,
        &EncodeOptions {
            compression_level: args.compression,
        },
    )?;
    let encode_time = start.elapsed();

    if verbose {
        eprintln!("Loaded: {:?}", args.input);
        eprintln!("  Quality: {}", options.quality);
        eprintln!("  Resize: {:?}", options.resize_algorithm);
        eprintln!("  Dithering: {}", options.dithering);
        eprintln!("  Import time: {:.2?}", import_time);
        eprintln!("Output: {:?}", output);
        eprintln!("  Dimensions: {}x{}", matrix.width(), matrix.height());
        eprintln!("  Colors: {}", matrix.distinct_colors());
        eprintln!("  Encode time: {:.2?}", encode_time);
    }
    report_sizes(&args.input, &output)
}

fn encode(args: EncodeArgs, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let output = args
        .output
        .unwrap_or_else(|| args.input.with_extension("tsr"));

    let start = Instant::now();
    let source = fs::read(&args.input)?;
    let image = import::decode_source(&source)?;
    let matrix = import::matrix_from_image(&image)?;
    codec::save(
        &output,
        &matrix,
        &EncodeOptions {
            compression_level: args.compression,
        },
    )?;

    if verbose {
        eprintln!("Loaded: {:?}", args.input);
        eprintln!("  Dimensions: {}x{}", matrix.width(), matrix.height());
        eprintln!("Output: {:?}", output);
        eprintln!("  Compression level: {}", args.compression);
        eprintln!("  Encode time: {:.2?}", start.elapsed());
    }
    report_sizes(&args.input, &output)
}

fn export(args: ExportArgs, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let output = args
        .output
        .unwrap_or_else(|| args.input.with_extension("png"));

    let start = Instant::now();
    let matrix = codec::load(&args.input)?;
    let image = import::matrix_to_image(&matrix)?;
    image.save(&output)?;

    if verbose {
        eprintln!("Loaded: {:?}", args.input);
        eprintln!("  Dimensions: {}x{}", matrix.width(), matrix.height());
        eprintln!("Output: {:?}", output);
        eprintln!("  Export time: {:.2?}", start.elapsed());
    }
    report_sizes(&args.input, &output)
}

fn info(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(path)?;
    let header = codec::read_header(&data)?;
    let matrix = codec::decode(&data)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    println!("File name: {}", name);
    println!("Dimensions: {}x{}", header.width, header.height);
    println!("Colors: {}", matrix.distinct_colors());
    println!("File size: {}", format_size(data.len() as u64));
    Ok(())
}

fn report_sizes(input: &Path, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let input_size = fs::metadata(input)?.len();
    let output_size = fs::metadata(output)?.len();
    let ratio = if input_size > 0 {
        output_size as f64 / input_size as f64 * 100.0
    } else {
        0.0
    };
    eprintln!(
        "{} -> {} ({:.1}%)",
        format_size(input_size),
        format_size(output_size),
        ratio
    );
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
