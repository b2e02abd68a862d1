#![allow(dead_code)]

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use pdf_squeeze::{collect_page_images, ImageEncoding};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    RawRgb,
    RawGray,
    Jpeg,
    /// Deflated RGB samples
    FlateRgb,
    /// Deflated RGB samples with PNG "Up" row filters
    FlatePredictorRgb,
    /// LZW compressed grayscale samples
    LzwGray,
    /// DeviceCMYK samples chosen to render as the RGB gradient
    RawCmyk,
    /// Four colour DeviceRGB palette, 8-bit indices
    IndexedRgb,
    /// RGB samples tagged with a three component ICC profile
    IccRgb,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageSpec {
    pub width: u32,
    pub height: u32,
    pub kind: ImageKind,
    pub seed: u8,
}

impl ImageSpec {
    pub fn new(kind: ImageKind, width: u32, height: u32, seed: u8) -> Self {
        Self {
            width,
            height,
            kind,
            seed,
        }
    }

    pub fn raw_rgb(width: u32, height: u32, seed: u8) -> Self {
        Self::new(ImageKind::RawRgb, width, height, seed)
    }

    pub fn raw_gray(width: u32, height: u32, seed: u8) -> Self {
        Self::new(ImageKind::RawGray, width, height, seed)
    }

    pub fn jpeg(width: u32, height: u32, seed: u8) -> Self {
        Self::new(ImageKind::Jpeg, width, height, seed)
    }
}

/// A smooth gradient, so JPEG has something realistic to chew on.
pub fn gradient(width: u32, height: u32, seed: u8) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            ((x * 255) / width.max(1)) as u8,
            ((y * 255) / height.max(1)) as u8,
            seed,
        ])
    })
}

pub fn jpeg_bytes(width: u32, height: u32, seed: u8) -> Vec<u8> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 90)
        .encode_image(&gradient(width, height, seed))
        .unwrap();
    bytes
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// LZW with 9-bit codes, emitting every byte as a literal and clearing the
/// table often enough that the code width never grows.
pub fn lzw_literals(data: &[u8]) -> Vec<u8> {
    const CLEAR: u32 = 256;
    const EOD: u32 = 257;

    let mut codes = vec![CLEAR];
    for chunk in data.chunks(200) {
        codes.extend(chunk.iter().map(|&b| b as u32));
        codes.push(CLEAR);
    }
    codes.push(EOD);

    let mut out = Vec::new();
    let (mut buffer, mut bits) = (0u32, 0u32);
    for code in codes {
        buffer = (buffer << 9) | code;
        bits += 9;
        while bits >= 8 {
            out.push((buffer >> (bits - 8)) as u8);
            bits -= 8;
            buffer &= (1 << bits) - 1;
        }
    }
    if bits > 0 {
        out.push((buffer << (8 - bits)) as u8);
    }
    out
}

/// PNG "Up" filtered rows, each prefixed with filter type 2.
fn png_up_rows(samples: &[u8], row_len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() + samples.len() / row_len);
    let mut previous = vec![0u8; row_len];
    for row in samples.chunks(row_len) {
        out.push(2);
        out.extend(row.iter().zip(&previous).map(|(c, p)| c.wrapping_sub(*p)));
        previous = row.to_vec();
    }
    out
}

const PALETTE: [[u8; 3]; 4] = [[200, 30, 30], [30, 160, 60], [40, 60, 210], [240, 220, 90]];

fn palette_index(x: u32, width: u32) -> u8 {
    (x * 4 / width.max(1)).min(3) as u8
}

/// The pixels a viewer would show for the image described by `spec`.
pub fn expected_pixels(spec: &ImageSpec) -> DynamicImage {
    let rgb = gradient(spec.width, spec.height, spec.seed);
    match spec.kind {
        ImageKind::RawGray | ImageKind::LzwGray => DynamicImage::ImageRgb8(rgb).grayscale(),
        ImageKind::IndexedRgb => DynamicImage::ImageRgb8(RgbImage::from_fn(
            spec.width,
            spec.height,
            |x, _| Rgb(PALETTE[palette_index(x, spec.width) as usize]),
        )),
        _ => DynamicImage::ImageRgb8(rgb),
    }
}

fn image_stream(doc: &mut Document, spec: &ImageSpec) -> Stream {
    let rgb = gradient(spec.width, spec.height, spec.seed);
    let gray = DynamicImage::ImageRgb8(rgb.clone()).to_luma8().into_raw();
    let row_len = spec.width as usize * 3;

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => spec.width as i64,
        "Height" => spec.height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };

    let content = match spec.kind {
        ImageKind::RawRgb => rgb.into_raw(),
        ImageKind::RawGray => {
            dict.set("ColorSpace", "DeviceGray");
            gray
        }
        ImageKind::Jpeg => {
            dict.set("Filter", "DCTDecode");
            jpeg_bytes(spec.width, spec.height, spec.seed)
        }
        ImageKind::FlateRgb => {
            dict.set("Filter", "FlateDecode");
            deflate(rgb.as_raw())
        }
        ImageKind::FlatePredictorRgb => {
            dict.set("Filter", "FlateDecode");
            dict.set(
                "DecodeParms",
                dictionary! {
                    "Predictor" => 12,
                    "Colors" => 3,
                    "BitsPerComponent" => 8,
                    "Columns" => spec.width as i64,
                },
            );
            deflate(&png_up_rows(rgb.as_raw(), row_len))
        }
        ImageKind::LzwGray => {
            dict.set("ColorSpace", "DeviceGray");
            dict.set("Filter", "LZWDecode");
            lzw_literals(&gray)
        }
        ImageKind::RawCmyk => {
            dict.set("ColorSpace", "DeviceCMYK");
            rgb.pixels()
                .flat_map(|p| [255 - p[0], 255 - p[1], 255 - p[2], 0])
                .collect()
        }
        ImageKind::IndexedRgb => {
            let lookup: Vec<u8> = PALETTE.iter().flatten().copied().collect();
            dict.set(
                "ColorSpace",
                vec![
                    Object::Name(b"Indexed".to_vec()),
                    Object::Name(b"DeviceRGB".to_vec()),
                    Object::Integer(PALETTE.len() as i64 - 1),
                    Object::String(lookup, StringFormat::Hexadecimal),
                ],
            );
            (0..spec.height)
                .flat_map(|_| (0..spec.width).map(|x| palette_index(x, spec.width)))
                .collect()
        }
        ImageKind::IccRgb => {
            let profile = doc.add_object(Stream::new(
                dictionary! { "N" => 3, "Alternate" => "DeviceRGB" },
                b"not a real profile".to_vec(),
            ));
            dict.set(
                "ColorSpace",
                vec![Object::Name(b"ICCBased".to_vec()), Object::Reference(profile)],
            );
            rgb.into_raw()
        }
    };

    Stream::new(dict, content).with_compression(false)
}

fn add_image(doc: &mut Document, spec: &ImageSpec) -> ObjectId {
    let stream = image_stream(doc, spec);
    doc.add_object(stream)
}

/// Adds a page drawing `images` side by side.
fn add_page(doc: &mut Document, pages_id: ObjectId, images: &[(ObjectId, ImageSpec)]) -> ObjectId {
    let mut xobjects = lopdf::Dictionary::new();
    let mut content = String::new();

    for (index, (image_id, spec)) in images.iter().enumerate() {
        let name = format!("Im{}", index + 1);
        xobjects.set(name.clone(), *image_id);
        content.push_str(&format!(
            "q {} 0 0 {} {} 0 cm /{} Do Q\n",
            spec.width / 10,
            spec.height / 10,
            index * 100,
            name
        ));
    }

    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        "Contents" => content_id,
        "Resources" => dictionary! { "XObject" => xobjects },
    })
}

fn finish(mut doc: Document, pages_id: ObjectId, kids: Vec<Object>) -> Document {
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Builds a document with one page per entry; each page draws its images
/// side by side.
pub fn build_pdf(pages: &[Vec<ImageSpec>]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::new();

    for specs in pages {
        let images: Vec<_> = specs
            .iter()
            .map(|spec| (add_image(&mut doc, spec), *spec))
            .collect();
        kids.push(add_page(&mut doc, pages_id, &images).into());
    }

    finish(doc, pages_id, kids)
}

/// Builds `pages` pages that all draw the same image object.
pub fn build_shared_pdf(spec: ImageSpec, pages: usize) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let image_id = add_image(&mut doc, &spec);

    let kids = (0..pages)
        .map(|_| add_page(&mut doc, pages_id, &[(image_id, spec)]).into())
        .collect();

    finish(doc, pages_id, kids)
}

pub fn write_pdf(dir: &Path, name: &str, pages: &[Vec<ImageSpec>]) -> PathBuf {
    let path = dir.join(name);
    build_pdf(pages).save(&path).unwrap();
    path
}

/// Width, height and encoding of every image reference, page by page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSummary {
    pub page: u32,
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
    pub encoding: ImageEncoding,
}

pub fn summarize(path: &Path) -> (usize, Vec<ImageSummary>) {
    let doc = Document::load(path).unwrap();
    let pages = doc.get_pages();
    let mut images = Vec::new();

    for (page, page_id) in &pages {
        for id in collect_page_images(&doc, *page_id) {
            let stream = doc.get_object(id).unwrap().as_stream().unwrap();
            images.push(ImageSummary {
                page: *page,
                id,
                width: stream.dict.get(b"Width").unwrap().as_i64().unwrap() as u32,
                height: stream.dict.get(b"Height").unwrap().as_i64().unwrap() as u32,
                encoding: ImageEncoding::from_dict(&stream.dict),
            });
        }
    }

    (pages.len(), images)
}

pub fn image_content(path: &Path, id: ObjectId) -> Vec<u8> {
    let doc = Document::load(path).unwrap();
    let stream = doc.get_object(id).unwrap().as_stream().unwrap();
    stream.content.clone()
}

/// Decodes the JPEG stored under `id`.
pub fn jpeg_pixels(path: &Path, id: ObjectId) -> DynamicImage {
    image::load_from_memory_with_format(&image_content(path, id), image::ImageFormat::Jpeg)
        .unwrap()
}

/// Mean absolute difference per RGB channel.
pub fn mean_difference(a: &DynamicImage, b: &DynamicImage) -> f64 {
    let (a, b) = (a.to_rgb8(), b.to_rgb8());
    assert_eq!(a.dimensions(), b.dimensions());
    let total: u64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(x, y)| (*x as i16 - *y as i16).unsigned_abs() as u64)
        .sum();
    total as f64 / a.as_raw().len() as f64
}
