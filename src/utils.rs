//! Console helpers: the page progress bar and the size summary.

use crate::constants::{
    COMPRESSED_SIZE_PREFIX, COMPRESSION_RATIO_PREFIX, ORIGINAL_SIZE_PREFIX, PROGRESS_BAR_CHARS,
    INFO_PREFIX, PROGRESS_BAR_TEMPLATE, SUCCESS_PREFIX, WARNING_PREFIX,
};
use crate::processing::CompressionReport;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// The bar is hidden when informational output is switched off, so `--quiet`
/// runs print nothing but warnings and errors.
pub fn create_progress_bar(len: u64) -> ProgressBar {
    if !log::log_enabled!(log::Level::Info) {
        return ProgressBar::with_draw_target(Some(len), ProgressDrawTarget::hidden());
    }

    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar().template(PROGRESS_BAR_TEMPLATE) {
        pb.set_style(style.progress_chars(PROGRESS_BAR_CHARS));
    }
    pb
}

/// Human readable size with binary units, e.g. `512 B` or `1.50 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let exponent = match bytes {
        0 => 0,
        _ => ((63 - bytes.leading_zeros()) / 10).min(UNITS.len() as u32 - 1),
    };
    if exponent == 0 {
        return format!("{} B", bytes);
    }

    let scaled = bytes as f64 / (1u64 << (10 * exponent)) as f64;
    format!("{:.2} {}", scaled, UNITS[exponent as usize])
}

/// Percentage saved; negative when the output grew.
pub fn calculate_compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
    match original_size {
        0 => 0.0,
        original => (1.0 - compressed_size as f64 / original as f64) * 100.0,
    }
}

/// Print the end-of-run summary
pub fn print_compression_result(report: &CompressionReport) {
    println!(
        "🖼️  Images: {} found, {} recompressed ({} resized), {} left unchanged",
        report.images_found,
        report.images_recompressed,
        report.images_resized,
        report.images_skipped
    );
    println!(
        "🧹 Objects removed: {}",
        report.optimize.objects_removed()
    );
    println!(
        "{} {} ({})",
        ORIGINAL_SIZE_PREFIX,
        report.original_size,
        format_file_size(report.original_size)
    );
    println!(
        "{} {} ({})",
        COMPRESSED_SIZE_PREFIX,
        report.compressed_size,
        format_file_size(report.compressed_size)
    );

    if report.original_size == 0 {
        return;
    }

    let ratio = report.reduction();
    println!("{} {:.1}%", COMPRESSION_RATIO_PREFIX, ratio);

    println!("{}", size_verdict(ratio));
}

/// Closing line of the summary for a given reduction percentage.
pub fn size_verdict(ratio: f64) -> String {
    match ratio {
        r if r > 0.0 => format!("{} Saved {:.1}% of the original size", SUCCESS_PREFIX, r),
        r if r < 0.0 => format!(
            "{}  Output is {:.1}% larger than the input",
            WARNING_PREFIX,
            r.abs()
        ),
        _ => format!("{} Output is the same size as the input", INFO_PREFIX),
    }
}
