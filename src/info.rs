use crate::constants::INFO_PREFIX;
use crate::error::Result;
use crate::images::{collect_document_images, ImageRef};
use crate::processing::{fit_dimensions, load_document};
use crate::utils::format_file_size;
use crate::validation::validate_input_path;
use std::fs;
use std::path::Path;

/// Summary of the images of a document, as shown by `--list`.
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub pages: usize,
    pub file_size: u64,
    pub images: Vec<ImageRef>,
}

impl DocumentInfo {
    pub fn oversized(&self, max_dimension: u32) -> usize {
        self.images
            .iter()
            .filter(|img| img.largest_side() > max_dimension)
            .count()
    }

    pub fn image_bytes(&self) -> usize {
        self.images.iter().map(|img| img.stream_len).sum()
    }
}

pub fn get_document_info(input_path: &Path) -> Result<DocumentInfo> {
    validate_input_path(input_path)?;

    let file_size = fs::metadata(input_path)?.len();
    let doc = load_document(input_path)?;

    Ok(DocumentInfo {
        pages: doc.get_pages().len(),
        file_size,
        images: collect_document_images(&doc),
    })
}

/// One line of the inventory table.
pub fn describe_image(image: &ImageRef, max_dimension: u32) -> String {
    let plan = match fit_dimensions(image.width, image.height, max_dimension) {
        _ if image.is_mask => "kept (stencil mask)".to_string(),
        Some((w, h)) => format!("-> {}x{}", w, h),
        None => "size ok".to_string(),
    };

    format!(
        "  p{:<4} {:>5} {:<3} {:>5}x{:<5} {:<9} {:<24} {:>2} bpc {:>10}  {}",
        image.page,
        image.id.0,
        image.id.1,
        image.width,
        image.height,
        image.encoding.to_string(),
        image.color_space,
        image.bits_per_component,
        format_file_size(image.stream_len as u64),
        plan
    )
}

pub fn print_document_info(input_path: &Path, max_dimension: u32) -> Result<()> {
    let info = get_document_info(input_path)?;

    println!("{} Analyzing PDF: {:?}", INFO_PREFIX, input_path);
    println!("  📦 File size: {}", format_file_size(info.file_size));
    println!("  📄 Pages: {}", info.pages);
    println!(
        "  🖼️  Images: {} ({} of image data)",
        info.images.len(),
        format_file_size(info.image_bytes() as u64)
    );
    println!(
        "  📏 Larger than {} px: {}",
        max_dimension,
        info.oversized(max_dimension)
    );

    if info.images.is_empty() {
        return Ok(());
    }

    println!();
    println!(
        "  {:<5} {:>5} {:<3} {:>11} {:<9} {:<24} {:>6} {:>10}  {}",
        "page", "obj", "gen", "size", "encoding", "colour space", "bits", "stream", "plan"
    );
    for image in &info.images {
        println!("{}", describe_image(image, max_dimension));
    }

    Ok(())
}
