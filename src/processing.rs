use crate::constants::{
    DEFAULT_GARBAGE_LEVEL, DEFAULT_MAX_DIMENSION, DEFAULT_QUALITY, MAX_QUALITY, MIN_MAX_DIMENSION,
    MIN_QUALITY,
};
use crate::decode::decode_image;
use crate::error::{CompressionError, Result};
use crate::formats::ImageEncoding;
use crate::images::{collect_page_images, dict_u32};
use crate::optimize::{optimize_document, save_document, GarbageLevel, OptimizeStats};
use crate::utils::{calculate_compression_ratio, create_progress_bar};
use crate::validation::{validate_input_path, validate_output_path};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};
use log::{debug, info, warn};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Entries of the original image dictionary that still make sense once the
/// samples have been replaced by a JPEG.
const CARRIED_OVER_KEYS: &[&[u8]] = &[b"SMask", b"Interpolate", b"Intent", b"OC", b"Metadata", b"Name"];

#[derive(Debug, Clone)]
pub struct CompressionOptions {
    pub quality: u8,
    pub max_dimension: u32,
    pub garbage: GarbageLevel,
    pub deflate: bool,
    pub skip_small_jpeg: bool,
}

impl CompressionOptions {
    pub fn new(
        quality: Option<u8>,
        max_dimension: Option<u32>,
        garbage: Option<u8>,
        deflate: bool,
        skip_small_jpeg: bool,
    ) -> Result<Self> {
        let quality = quality.unwrap_or(DEFAULT_QUALITY);
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
            return Err(CompressionError::InvalidQuality(quality));
        }

        let max_dimension = max_dimension.unwrap_or(DEFAULT_MAX_DIMENSION);
        if max_dimension < MIN_MAX_DIMENSION {
            return Err(CompressionError::InvalidMaxDimension(max_dimension));
        }

        let garbage = GarbageLevel::try_from(garbage.unwrap_or(DEFAULT_GARBAGE_LEVEL))?;

        Ok(Self {
            quality,
            max_dimension,
            garbage,
            deflate,
            skip_small_jpeg,
        })
    }
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            max_dimension: DEFAULT_MAX_DIMENSION,
            garbage: GarbageLevel::default(),
            deflate: true,
            skip_small_jpeg: false,
        }
    }
}

/// What happened during a run, for the summary printed at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressionReport {
    pub pages: usize,
    pub images_found: usize,
    pub images_recompressed: usize,
    pub images_resized: usize,
    pub images_skipped: usize,
    pub optimize: OptimizeStats,
    pub original_size: u64,
    pub compressed_size: u64,
}

impl CompressionReport {
    /// Size reduction in percent; negative when the file grew.
    pub fn reduction(&self) -> f64 {
        calculate_compression_ratio(self.original_size, self.compressed_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOutcome {
    Recompressed { resized: bool },
    Kept,
}

/// Computes the size an image must be scaled to so that neither side exceeds
/// `max_dimension`, or `None` when it already fits.
///
/// The larger side becomes exactly `max_dimension`; the other side is rounded
/// to the nearest pixel and never drops below 1.
///
/// # Example
/// ```
/// use pdf_squeeze::fit_dimensions;
///
/// assert_eq!(fit_dimensions(4000, 3000, 2000), Some((2000, 1500)));
/// assert_eq!(fit_dimensions(1200, 800, 2000), None);
/// ```
pub fn fit_dimensions(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    let largest = width.max(height);
    if largest <= max_dimension || max_dimension == 0 {
        return None;
    }

    let scale = |side: u32| -> u32 {
        let scaled = (side as u64 * max_dimension as u64 + largest as u64 / 2) / largest as u64;
        scaled.max(1) as u32
    };

    if width >= height {
        Some((max_dimension, scale(height)))
    } else {
        Some((scale(width), max_dimension))
    }
}

/// Downscales `img` in place if it is larger than `max_dimension`.
/// Returns whether the image was resized.
pub fn resize_image(img: &mut DynamicImage, max_dimension: u32) -> bool {
    let (width, height) = img.dimensions();
    match fit_dimensions(width, height, max_dimension) {
        Some((new_width, new_height)) => {
            debug!(
                "Resizing {}x{} -> {}x{}",
                width, height, new_width, new_height
            );
            *img = img.resize_exact(
                new_width,
                new_height,
                image::imageops::FilterType::Lanczos3,
            );
            true
        }
        None => false,
    }
}

/// Encodes an image as baseline JPEG. Grayscale images stay single channel,
/// everything else becomes RGB; alpha is dropped.
///
/// Returns the JPEG bytes and whether they are grayscale.
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<(Vec<u8>, bool)> {
    let mut buffer = Vec::new();
    let grayscale = !img.color().has_color();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        if grayscale {
            encoder.encode_image(&img.to_luma8())?;
        } else {
            encoder.encode_image(&img.to_rgb8())?;
        }
    }

    Ok((buffer, grayscale))
}

/// Builds the replacement image XObject for a JPEG payload.
pub fn build_jpeg_stream(
    original: &Dictionary,
    jpeg: Vec<u8>,
    width: u32,
    height: u32,
    grayscale: bool,
) -> Stream {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    let color_space: &[u8] = if grayscale { b"DeviceGray" } else { b"DeviceRGB" };
    dict.set("ColorSpace", Object::Name(color_space.to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));

    for key in CARRIED_OVER_KEYS {
        if let Ok(value) = original.get(key) {
            dict.set(key.to_vec(), value.clone());
        }
    }
    // A colour key array refers to the old sample values; an explicit mask
    // stream is still valid.
    if let Ok(mask @ Object::Reference(_)) = original.get(b"Mask") {
        dict.set("Mask", mask.clone());
    }

    Stream::new(dict, jpeg).with_compression(false)
}

/// Resizes and re-encodes a decoded image, producing the replacement stream.
pub fn recompress_image(
    mut img: DynamicImage,
    original: &Dictionary,
    options: &CompressionOptions,
) -> Result<(Stream, bool)> {
    let resized = resize_image(&mut img, options.max_dimension);
    let (width, height) = img.dimensions();
    let (jpeg, grayscale) = encode_jpeg(&img, options.quality)?;
    Ok((
        build_jpeg_stream(original, jpeg, width, height, grayscale),
        resized,
    ))
}

/// Re-encodes one image XObject in place.
pub fn recompress_object(
    doc: &mut Document,
    id: ObjectId,
    options: &CompressionOptions,
) -> Result<ImageOutcome> {
    let stream = match doc.get_object(id)? {
        Object::Stream(stream) => stream,
        _ => {
            return Err(CompressionError::UnsupportedImage(format!(
                "object {} {} is not a stream",
                id.0, id.1
            )))
        }
    };

    let width = dict_u32(&stream.dict, b"Width");
    let height = dict_u32(&stream.dict, b"Height");
    let encoding = ImageEncoding::from_dict(&stream.dict);
    let fits = width.max(height) <= options.max_dimension;

    if options.skip_small_jpeg && encoding == ImageEncoding::Dct && fits {
        debug!(
            "Image {} {}: {}x{} JPEG within limit, kept",
            id.0, id.1, width, height
        );
        return Ok(ImageOutcome::Kept);
    }

    let img = decode_image(doc, id, stream)?;
    let original_len = stream.content.len();
    let (replacement, resized) = recompress_image(img, &stream.dict, options)?;

    debug!(
        "Image {} {}: {}x{} {} ({} bytes) -> {}x{} JPEG ({} bytes)",
        id.0,
        id.1,
        width,
        height,
        encoding,
        original_len,
        dict_u32(&replacement.dict, b"Width"),
        dict_u32(&replacement.dict, b"Height"),
        replacement.content.len()
    );

    doc.objects.insert(id, Object::Stream(replacement));
    Ok(ImageOutcome::Recompressed { resized })
}

/// Opens a PDF, mapping parser failures to [`CompressionError::InvalidPdf`].
pub fn load_document(path: &Path) -> Result<Document> {
    Document::load(path).map_err(|e| {
        debug!("lopdf failed to load {:?}: {}", path, e);
        CompressionError::InvalidPdf(path.to_path_buf())
    })
}

/// Recompresses every image of `input` and writes the optimized document to
/// `output`. The input file is never modified; on failure no output file is
/// left behind.
pub fn compress_pdf(
    input: &Path,
    output: &Path,
    options: &CompressionOptions,
) -> Result<CompressionReport> {
    validate_input_path(input)?;
    let output = validate_output_path(input, output)?;

    let original_size = fs::metadata(input)?.len();
    let mut doc = load_document(input)?;
    let pages = doc.get_pages();

    let mut report = CompressionReport {
        pages: pages.len(),
        original_size,
        ..Default::default()
    };

    let pb = create_progress_bar(pages.len() as u64);
    let mut processed: HashSet<ObjectId> = HashSet::new();

    for (page_number, page_id) in pages {
        pb.set_message(format!("page {}", page_number));

        for image_id in collect_page_images(&doc, page_id) {
            if !processed.insert(image_id) {
                continue;
            }
            report.images_found += 1;

            match recompress_object(&mut doc, image_id, options) {
                Ok(ImageOutcome::Recompressed { resized }) => {
                    report.images_recompressed += 1;
                    if resized {
                        report.images_resized += 1;
                    }
                }
                Ok(ImageOutcome::Kept) => report.images_skipped += 1,
                Err(e) if e.is_skippable() => {
                    pb.suspend(|| {
                        warn!(
                            "Page {}: image {} {} left unchanged: {}",
                            page_number, image_id.0, image_id.1, e
                        )
                    });
                    report.images_skipped += 1;
                }
                Err(e) => {
                    pb.abandon();
                    return Err(e);
                }
            }
        }

        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        "Recompressed {} of {} images ({} resized)",
        report.images_recompressed, report.images_found, report.images_resized
    );

    report.optimize = optimize_document(&mut doc, options.garbage, options.deflate);
    save_document(&mut doc, &output)?;
    report.compressed_size = fs::metadata(&output)?.len();

    Ok(report)
}
