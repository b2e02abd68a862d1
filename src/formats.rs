/// Image encoding and colour space handling for PDF image XObjects
///
/// This module maps the loosely typed `/Filter` and `/ColorSpace` entries of an
/// image dictionary onto enums, so the decoder can match on them instead of
/// comparing byte strings all over the place.
use lopdf::{Document, Object};
use std::fmt;

/// How the samples of an image stream are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageEncoding {
    /// No filter at all
    Raw,
    /// Zlib/deflate compressed samples
    Flate,
    /// LZW compressed samples
    Lzw,
    /// Baseline or progressive JPEG
    Dct,
    /// JPEG 2000
    Jpx,
    /// JBIG2 bilevel
    Jbig2,
    /// CCITT Group 3/4 fax
    CcittFax,
    /// A chain of filters, or a filter this tool does not know
    Other(String),
}

impl ImageEncoding {
    /// Builds the encoding from the filter names of a stream, in the order they
    /// appear in the dictionary.
    pub fn from_filters(filters: &[Vec<u8>]) -> Self {
        match filters {
            [] => ImageEncoding::Raw,
            [single] => Self::from_filter_name(single),
            many => ImageEncoding::Other(
                many.iter()
                    .map(|f| String::from_utf8_lossy(f).into_owned())
                    .collect::<Vec<_>>()
                    .join("+"),
            ),
        }
    }

    pub fn from_filter_name(name: &[u8]) -> Self {
        match name {
            b"FlateDecode" | b"Fl" => ImageEncoding::Flate,
            b"LZWDecode" | b"LZW" => ImageEncoding::Lzw,
            b"DCTDecode" | b"DCT" => ImageEncoding::Dct,
            b"JPXDecode" => ImageEncoding::Jpx,
            b"JBIG2Decode" => ImageEncoding::Jbig2,
            b"CCITTFaxDecode" | b"CCF" => ImageEncoding::CcittFax,
            other => ImageEncoding::Other(String::from_utf8_lossy(other).into_owned()),
        }
    }

    /// Reads `/Filter` from an image dictionary. Abbreviated names used by
    /// inline images are accepted as well.
    pub fn from_dict(dict: &lopdf::Dictionary) -> Self {
        let filters = match dict.get(b"Filter") {
            Ok(Object::Name(name)) => vec![name.clone()],
            Ok(Object::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_name().ok().map(|n| n.to_vec()))
                .collect(),
            _ => Vec::new(),
        };
        Self::from_filters(&filters)
    }

    /// Encodings whose payload is a plain sample array once the filter is undone.
    pub fn is_sample_stream(&self) -> bool {
        matches!(
            self,
            ImageEncoding::Raw | ImageEncoding::Flate | ImageEncoding::Lzw
        )
    }
}

impl fmt::Display for ImageEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageEncoding::Raw => "raw",
            ImageEncoding::Flate => "Flate",
            ImageEncoding::Lzw => "LZW",
            ImageEncoding::Dct => "JPEG",
            ImageEncoding::Jpx => "JPEG 2000",
            ImageEncoding::Jbig2 => "JBIG2",
            ImageEncoding::CcittFax => "CCITT",
            ImageEncoding::Other(name) => name,
        };
        write!(f, "{}", name)
    }
}

/// The colour spaces the decoder can turn into pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfColorSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed {
        base: Box<PdfColorSpace>,
        hival: u8,
        lookup: Vec<u8>,
    },
    Unsupported(String),
}

impl PdfColorSpace {
    /// Number of colour components per sample.
    pub fn components(&self) -> usize {
        match self {
            PdfColorSpace::Gray | PdfColorSpace::Indexed { .. } => 1,
            PdfColorSpace::Rgb => 3,
            PdfColorSpace::Cmyk => 4,
            PdfColorSpace::Unsupported(_) => 0,
        }
    }

    /// Resolves a `/ColorSpace` value, following references and looking up
    /// ICC profiles and palettes where needed.
    pub fn from_object(doc: &Document, obj: &Object) -> Self {
        let Some(obj) = resolve(doc, obj) else {
            return PdfColorSpace::Unsupported("dangling reference".to_string());
        };

        match obj {
            Object::Name(name) => Self::from_family(name),
            Object::Array(items) => Self::from_array(doc, items),
            _ => PdfColorSpace::Unsupported("malformed colour space".to_string()),
        }
    }

    fn from_family(name: &[u8]) -> Self {
        match name {
            b"DeviceGray" | b"CalGray" | b"G" => PdfColorSpace::Gray,
            b"DeviceRGB" | b"CalRGB" | b"RGB" => PdfColorSpace::Rgb,
            b"DeviceCMYK" | b"CMYK" => PdfColorSpace::Cmyk,
            other => PdfColorSpace::Unsupported(String::from_utf8_lossy(other).into_owned()),
        }
    }

    fn from_array(doc: &Document, items: &[Object]) -> Self {
        let Some(family) = items.first().and_then(|f| f.as_name().ok()) else {
            return PdfColorSpace::Unsupported("empty colour space array".to_string());
        };

        match family {
            b"ICCBased" => Self::from_icc(doc, items.get(1)),
            b"Indexed" | b"I" => Self::from_indexed(doc, items),
            b"CalGray" | b"CalRGB" | b"DeviceGray" | b"DeviceRGB" | b"DeviceCMYK" => {
                Self::from_family(family)
            }
            other => PdfColorSpace::Unsupported(String::from_utf8_lossy(other).into_owned()),
        }
    }

    fn from_icc(doc: &Document, profile: Option<&Object>) -> Self {
        let stream = match profile.and_then(|p| resolve(doc, p)) {
            Some(Object::Stream(stream)) => stream,
            _ => return PdfColorSpace::Unsupported("ICCBased without profile".to_string()),
        };

        match stream.dict.get(b"N").and_then(Object::as_i64) {
            Ok(1) => PdfColorSpace::Gray,
            Ok(3) => PdfColorSpace::Rgb,
            Ok(4) => PdfColorSpace::Cmyk,
            _ => match stream.dict.get(b"Alternate") {
                Ok(alternate) => Self::from_object(doc, alternate),
                Err(_) => PdfColorSpace::Unsupported("ICCBased with unknown /N".to_string()),
            },
        }
    }

    fn from_indexed(doc: &Document, items: &[Object]) -> Self {
        if items.len() != 4 {
            return PdfColorSpace::Unsupported("malformed Indexed colour space".to_string());
        }

        let base = Self::from_object(doc, &items[1]);
        if matches!(
            base,
            PdfColorSpace::Unsupported(_) | PdfColorSpace::Indexed { .. }
        ) {
            return PdfColorSpace::Unsupported(format!("Indexed over {:?}", base));
        }

        let hival = match items[2].as_i64() {
            Ok(v @ 0..=255) => v as u8,
            _ => return PdfColorSpace::Unsupported("Indexed hival out of range".to_string()),
        };

        let lookup = match resolve(doc, &items[3]) {
            Some(Object::String(bytes, _)) => bytes.clone(),
            Some(Object::Stream(stream)) => {
                if stream.dict.has(b"Filter") {
                    match stream.decompressed_content() {
                        Ok(bytes) => bytes,
                        Err(_) => {
                            return PdfColorSpace::Unsupported(
                                "undecodable Indexed palette".to_string(),
                            )
                        }
                    }
                } else {
                    stream.content.clone()
                }
            }
            _ => return PdfColorSpace::Unsupported("Indexed palette missing".to_string()),
        };

        let needed = (hival as usize + 1) * base.components();
        if lookup.len() < needed {
            return PdfColorSpace::Unsupported(format!(
                "Indexed palette too short: {} bytes, expected {}",
                lookup.len(),
                needed
            ));
        }

        PdfColorSpace::Indexed {
            base: Box::new(base),
            hival,
            lookup,
        }
    }
}

impl fmt::Display for PdfColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfColorSpace::Gray => write!(f, "Gray"),
            PdfColorSpace::Rgb => write!(f, "RGB"),
            PdfColorSpace::Cmyk => write!(f, "CMYK"),
            PdfColorSpace::Indexed { base, hival, .. } => {
                write!(f, "Indexed({}, {} colours)", base, *hival as u16 + 1)
            }
            PdfColorSpace::Unsupported(name) => write!(f, "{} (unsupported)", name),
        }
    }
}

/// Follows a single level of indirection.
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}
