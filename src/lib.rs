pub mod cli;
pub mod constants;
pub mod decode;
pub mod error;
pub mod formats;
pub mod images;
pub mod info;
pub mod logger;
pub mod optimize;
pub mod processing;
pub mod utils;
pub mod validation;

pub use cli::{default_output_path, Args};
pub use error::{CompressionError, Result};
pub use formats::{ImageEncoding, PdfColorSpace};
pub use images::{collect_document_images, collect_page_images, ImageRef};
pub use info::{get_document_info, print_document_info, DocumentInfo};
pub use optimize::{optimize_document, save_document, GarbageLevel, OptimizeStats};
pub use processing::{
    compress_pdf, encode_jpeg, fit_dimensions, load_document, recompress_image, resize_image,
    CompressionOptions, CompressionReport,
};
pub use validation::{validate_input_path, validate_output_path};
