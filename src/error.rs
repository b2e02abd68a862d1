use lopdf::ObjectId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Image processing error: {0}")]
    ImageProcessing(#[from] image::ImageError),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Not a readable PDF document: {0}")]
    InvalidPdf(PathBuf),

    #[error("Invalid quality value: {0}. Must be between 1 and 100")]
    InvalidQuality(u8),

    #[error("Invalid maximum dimension: {0}. Must be at least 1 pixel")]
    InvalidMaxDimension(u32),

    #[error("Invalid garbage level: {0}. Must be between 0 and 4")]
    InvalidGarbageLevel(u8),

    #[error("Output path {0} is the same file as the input")]
    SameInputOutput(PathBuf),

    #[error("Output directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Failed to decode image {} {}: {reason}", id.0, id.1)]
    ImageDecode { id: ObjectId, reason: String },

    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    #[error("Failed to write output file: {0}")]
    Persist(#[from] tempfile::PersistError),
}

impl CompressionError {
    /// Whether the image should be left as it is rather than aborting the run.
    pub fn is_skippable(&self) -> bool {
        matches!(self, CompressionError::UnsupportedImage(_))
    }
}

pub type Result<T> = std::result::Result<T, CompressionError>;
