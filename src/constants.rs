pub const DEFAULT_QUALITY: u8 = 30;
pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 100;

pub const DEFAULT_MAX_DIMENSION: u32 = 2000;
pub const MIN_MAX_DIMENSION: u32 = 1;

pub const DEFAULT_GARBAGE_LEVEL: u8 = 4;
pub const MAX_GARBAGE_LEVEL: u8 = 4;

/// Suffix appended to the input stem when no output path is given.
pub const OUTPUT_SUFFIX: &str = "_compressed";
pub const DEFAULT_EXTENSION: &str = "pdf";

/// Every PDF starts with this marker, possibly after some leading junk.
pub const PDF_MAGIC: &[u8] = b"%PDF-";
/// How far into the file the header may appear.
pub const PDF_HEADER_SEARCH_WINDOW: usize = 1024;

pub const PROGRESS_BAR_TEMPLATE: &str =
    "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} pages {msg}";
pub const PROGRESS_BAR_CHARS: &str = "#>-";

// Common output message prefixes
pub const ORIGINAL_SIZE_PREFIX: &str = "📊 Original size:";
pub const COMPRESSED_SIZE_PREFIX: &str = "📈 Compressed size:";
pub const COMPRESSION_RATIO_PREFIX: &str = "🎯 Reduction:";
pub const SUCCESS_PREFIX: &str = "✅";
pub const WARNING_PREFIX: &str = "⚠️";
pub const INFO_PREFIX: &str = "📋";

/// Images with more pixels than this are left alone instead of being decoded.
pub const MAX_IMAGE_PIXELS: u64 = 16_384 * 16_384;
