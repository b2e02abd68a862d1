use crate::constants::{
    DEFAULT_EXTENSION, DEFAULT_GARBAGE_LEVEL, DEFAULT_MAX_DIMENSION, DEFAULT_QUALITY,
    MAX_GARBAGE_LEVEL, MAX_QUALITY, MIN_MAX_DIMENSION, MIN_QUALITY, OUTPUT_SUFFIX,
};
use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "pdf-squeeze",
    about = "Compress PDF files by re-compressing images",
    long_about = "pdf-squeeze shrinks PDF documents by re-encoding every embedded image as JPEG, \
                  downscaling images that are larger than a maximum dimension, and then removing \
                  unused or duplicated objects and deflating streams when the document is saved.",
    version,
    after_help = "EXAMPLES:\n  \
    pdf-squeeze scan.pdf\n  \
    pdf-squeeze scan.pdf -o small.pdf -q 50 -m 1600\n  \
    pdf-squeeze report.pdf --skip-small-jpeg --garbage 3\n  \
    pdf-squeeze report.pdf --list"
)]
pub struct Args {
    #[arg(help = "Input PDF file path")]
    pub input: PathBuf,

    #[arg(
        short = 'o',
        long,
        help = "Output PDF file path (default: <input>_compressed.pdf)",
        long_help = "Where to write the compressed document. Defaults to the input path with \
                     '_compressed' appended to the file stem. The input file is never overwritten."
    )]
    pub output: Option<PathBuf>,

    #[arg(
        short = 'q',
        long,
        default_value_t = DEFAULT_QUALITY,
        value_parser = clap::value_parser!(u8).range(MIN_QUALITY as i64..=MAX_QUALITY as i64),
        help = "JPEG quality (1-100), default 30",
        long_help = "JPEG quality from 1 (smallest) to 100 (best looking) used when re-encoding images."
    )]
    pub quality: u8,

    #[arg(
        short = 'm',
        long = "max-dim",
        default_value_t = DEFAULT_MAX_DIMENSION,
        value_parser = clap::value_parser!(u32).range(MIN_MAX_DIMENSION as i64..),
        help = "Maximum dimension for images, default 2000",
        long_help = "Images whose width or height exceeds this many pixels are scaled down, \
                     preserving aspect ratio, so that the larger side equals this value."
    )]
    pub max_dim: u32,

    #[arg(
        short = 'g',
        long,
        default_value_t = DEFAULT_GARBAGE_LEVEL,
        value_parser = clap::value_parser!(u8).range(0..=MAX_GARBAGE_LEVEL as i64),
        help = "Object cleanup level (0-4), default 4",
        long_help = "0 keeps every object, 1 removes unreferenced objects, 2 also removes empty \
                     streams, 3 also renumbers objects, 4 also merges identical streams."
    )]
    pub garbage: u8,

    #[arg(long, help = "Do not deflate uncompressed streams when saving")]
    pub no_deflate: bool,

    #[arg(
        long,
        help = "Keep JPEG images that are already within the size limit",
        long_help = "By default every image is re-encoded. With this flag, images that are \
                     already JPEG and not larger than --max-dim are left byte for byte as they are."
    )]
    pub skip_small_jpeg: bool,

    #[arg(
        long,
        help = "List the images of the document and exit without writing anything"
    )]
    pub list: bool,

    #[arg(long, conflicts_with = "verbose", help = "Only print warnings and errors")]
    pub quiet: bool,

    #[arg(short = 'v', long, help = "Print a line for every image processed")]
    pub verbose: bool,
}

impl Args {
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.input))
    }
}

/// Derives `<dir>/<stem>_compressed.<ext>` from the input path, keeping the
/// input's extension and falling back to `.pdf` when it has none.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let extension = input
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());

    input.with_file_name(format!("{}{}.{}", stem, OUTPUT_SUFFIX, extension))
}
