use anyhow::{Context, Result};
use clap::Parser;
use log::warn;
use pdf_squeeze::utils::print_compression_result;
use pdf_squeeze::validation::is_pdf_file;
use pdf_squeeze::{compress_pdf, logger, print_document_info, Args, CompressionOptions};

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(args.quiet, args.verbose);

    let options = CompressionOptions::new(
        Some(args.quality),
        Some(args.max_dim),
        Some(args.garbage),
        !args.no_deflate,
        args.skip_small_jpeg,
    )?;

    if !is_pdf_file(&args.input) {
        warn!("{:?} does not have a .pdf extension", args.input);
    }

    if args.list {
        return print_document_info(&args.input, options.max_dimension)
            .with_context(|| format!("failed to read {}", args.input.display()));
    }

    let output = args.output_path();
    if !args.quiet {
        println!("🗜️  Compressing PDF: {:?}", args.input);
        println!("📁 Output: {:?}", output);
        println!(
            "⚙️  Quality: {}, max dimension: {} px, garbage level: {}",
            options.quality, options.max_dimension, options.garbage
        );
    }

    let report = compress_pdf(&args.input, &output, &options)
        .with_context(|| format!("failed to compress {}", args.input.display()))?;

    if !args.quiet {
        print_compression_result(&report);
    }

    Ok(())
}
