//! Turns the samples of a PDF image XObject into an [`image::DynamicImage`].
//!
//! JPEG streams are handed to the `image` crate as they are. Sample streams
//! (unfiltered, Flate or LZW) are unpacked according to `/ColorSpace`,
//! `/BitsPerComponent` and `/Decode`; CMYK and palette images come out as RGB.
//!
//! Errors come in two flavours. [`CompressionError::UnsupportedImage`] means
//! the image uses something this tool does not handle and should be left as
//! it is. [`CompressionError::ImageDecode`] means the data is broken.

use crate::constants::MAX_IMAGE_PIXELS;
use crate::error::{CompressionError, Result};
use crate::formats::{ImageEncoding, PdfColorSpace};
use crate::images::dict_u32;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Document, Object, ObjectId, Stream};

pub fn decode_image(doc: &Document, id: ObjectId, stream: &Stream) -> Result<DynamicImage> {
    let dict = &stream.dict;

    if matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true))) {
        return Err(CompressionError::UnsupportedImage(
            "stencil masks are kept as they are".to_string(),
        ));
    }

    let width = dict_u32(dict, b"Width");
    let height = dict_u32(dict, b"Height");
    if width == 0 || height == 0 {
        return Err(CompressionError::UnsupportedImage(
            "image without dimensions".to_string(),
        ));
    }
    if width as u64 * height as u64 > MAX_IMAGE_PIXELS {
        return Err(CompressionError::UnsupportedImage(format!(
            "{}x{} exceeds the decoding limit",
            width, height
        )));
    }

    let encoding = ImageEncoding::from_dict(dict);
    match encoding {
        ImageEncoding::Dct => {
            let mut img = decode_jpeg(id, &stream.content)?;
            // The replacement carries no /Decode, so the inversion is baked in.
            if has_inverted_decode(dict) {
                img.invert();
            }
            Ok(img)
        }
        ref e if e.is_sample_stream() => {
            let samples = if *e == ImageEncoding::Raw {
                stream.content.clone()
            } else {
                stream
                    .decompressed_content()
                    .map_err(|err| decode_error(id, err.to_string()))?
            };

            let color_space = match dict.get(b"ColorSpace") {
                Ok(cs) => PdfColorSpace::from_object(doc, cs),
                Err(_) => {
                    return Err(CompressionError::UnsupportedImage(
                        "image without colour space".to_string(),
                    ))
                }
            };
            let bits = match u8::try_from(dict_u32(dict, b"BitsPerComponent")) {
                Ok(bits) => bits,
                Err(_) => {
                    return Err(CompressionError::UnsupportedImage(format!(
                        "{} bits per component",
                        dict_u32(dict, b"BitsPerComponent")
                    )))
                }
            };
            let inverted = has_inverted_decode(dict);

            let layout = SampleLayout {
                width,
                height,
                bits,
                inverted,
            };
            decode_samples(id, &samples, &color_space, layout)
        }
        other => Err(CompressionError::UnsupportedImage(format!(
            "{} images cannot be decoded",
            other
        ))),
    }
}

fn decode_error(id: ObjectId, reason: impl Into<String>) -> CompressionError {
    CompressionError::ImageDecode {
        id,
        reason: reason.into(),
    }
}

fn decode_jpeg(id: ObjectId, data: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory_with_format(data, ImageFormat::Jpeg)
        .map_err(|e| decode_error(id, e.to_string()))
}

/// A `/Decode` array starting with `1 0` flips the sample range.
fn has_inverted_decode(dict: &lopdf::Dictionary) -> bool {
    let Ok(Object::Array(values)) = dict.get(b"Decode") else {
        return false;
    };
    let as_f = |o: &Object| match o {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    };
    matches!(
        (values.first().and_then(as_f), values.get(1).and_then(as_f)),
        (Some(lo), Some(hi)) if lo > hi
    )
}

#[derive(Debug, Clone, Copy)]
pub struct SampleLayout {
    pub width: u32,
    pub height: u32,
    pub bits: u8,
    pub inverted: bool,
}

/// Converts an unpacked sample buffer to pixels.
pub fn decode_samples(
    id: ObjectId,
    samples: &[u8],
    color_space: &PdfColorSpace,
    layout: SampleLayout,
) -> Result<DynamicImage> {
    let SampleLayout {
        width,
        height,
        bits,
        inverted,
    } = layout;

    if let PdfColorSpace::Unsupported(name) = color_space {
        return Err(CompressionError::UnsupportedImage(format!(
            "colour space {}",
            name
        )));
    }

    let packed_allowed = matches!(
        color_space,
        PdfColorSpace::Gray | PdfColorSpace::Indexed { .. }
    );
    match bits {
        8 => {}
        1 | 2 | 4 if packed_allowed => {}
        other => {
            return Err(CompressionError::UnsupportedImage(format!(
                "{} bits per component in {}",
                other, color_space
            )))
        }
    }

    let components = color_space.components();
    let row_bytes = (width as usize * components * bits as usize).div_ceil(8);
    let expected = row_bytes * height as usize;
    if samples.len() < expected {
        return Err(decode_error(
            id,
            format!(
                "sample data too short: {} bytes, expected {}",
                samples.len(),
                expected
            ),
        ));
    }

    let values_per_row = width as usize * components;
    let mut values = Vec::with_capacity(values_per_row * height as usize);
    for row in samples[..expected].chunks(row_bytes) {
        values.extend(unpack_row(row, values_per_row, bits));
    }

    match color_space {
        PdfColorSpace::Gray => {
            let max = max_sample(bits);
            let pixels = values
                .iter()
                .map(|&v| {
                    let v = scale_to_u8(v, max);
                    if inverted {
                        255 - v
                    } else {
                        v
                    }
                })
                .collect();
            GrayImage::from_raw(width, height, pixels)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(|| decode_error(id, "grayscale buffer size mismatch"))
        }
        PdfColorSpace::Rgb => {
            if inverted {
                values.iter_mut().for_each(|v| *v = 255 - *v);
            }
            RgbImage::from_raw(width, height, values)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| decode_error(id, "RGB buffer size mismatch"))
        }
        PdfColorSpace::Cmyk => {
            if inverted {
                values.iter_mut().for_each(|v| *v = 255 - *v);
            }
            let rgb = values.chunks_exact(4).flat_map(cmyk_to_rgb).collect();
            RgbImage::from_raw(width, height, rgb)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| decode_error(id, "CMYK buffer size mismatch"))
        }
        PdfColorSpace::Indexed {
            base,
            hival,
            lookup,
        } => {
            if inverted {
                values
                    .iter_mut()
                    .for_each(|v| *v = *hival - (*v).min(*hival));
            }
            expand_palette(id, width, height, &values, base, *hival, lookup)
        }
        PdfColorSpace::Unsupported(_) => unreachable!("rejected above"),
    }
}

fn expand_palette(
    id: ObjectId,
    width: u32,
    height: u32,
    indices: &[u8],
    base: &PdfColorSpace,
    hival: u8,
    lookup: &[u8],
) -> Result<DynamicImage> {
    let components = base.components();
    let entry = |index: u8| {
        // Out of range indices are clamped, as viewers do.
        let index = index.min(hival) as usize;
        &lookup[index * components..(index + 1) * components]
    };

    match base {
        PdfColorSpace::Gray => {
            let pixels = indices.iter().map(|&i| entry(i)[0]).collect();
            GrayImage::from_raw(width, height, pixels)
                .map(DynamicImage::ImageLuma8)
                .ok_or_else(|| decode_error(id, "palette buffer size mismatch"))
        }
        PdfColorSpace::Rgb => {
            let pixels = indices
                .iter()
                .flat_map(|&i| entry(i).iter().copied())
                .collect();
            RgbImage::from_raw(width, height, pixels)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| decode_error(id, "palette buffer size mismatch"))
        }
        PdfColorSpace::Cmyk => {
            let pixels = indices.iter().flat_map(|&i| cmyk_to_rgb(entry(i))).collect();
            RgbImage::from_raw(width, height, pixels)
                .map(DynamicImage::ImageRgb8)
                .ok_or_else(|| decode_error(id, "palette buffer size mismatch"))
        }
        other => Err(CompressionError::UnsupportedImage(format!(
            "palette over {}",
            other
        ))),
    }
}

/// Splits a byte-aligned row into `count` sample values of `bits` each.
pub fn unpack_row(row: &[u8], count: usize, bits: u8) -> Vec<u8> {
    if bits == 8 {
        return row[..count].to_vec();
    }

    let per_byte = 8 / bits as usize;
    let mask = max_sample(bits) as u8;
    (0..count)
        .map(|i| {
            let byte = row[i / per_byte];
            let shift = 8 - bits as usize * (i % per_byte + 1);
            (byte >> shift) & mask
        })
        .collect()
}

fn max_sample(bits: u8) -> u16 {
    (1u16 << bits) - 1
}

fn scale_to_u8(value: u8, max: u16) -> u8 {
    if max == 255 {
        value
    } else {
        ((value as u16 * 255 + max / 2) / max) as u8
    }
}

pub fn cmyk_to_rgb(cmyk: &[u8]) -> [u8; 3] {
    let k = 255 - cmyk[3] as u16;
    let channel = |c: u8| ((255 - c as u16) * k / 255) as u8;
    [channel(cmyk[0]), channel(cmyk[1]), channel(cmyk[2])]
}
