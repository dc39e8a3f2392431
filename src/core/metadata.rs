//! Local metadata extraction for PDFs and images.
//!
//! Nothing here fails the request: a document that cannot be parsed is
//! reported as [`DocumentMetadata::Unreadable`] so the parse failure itself
//! becomes a finding.

use crate::domain::model::{DocumentKind, DocumentMetadata, ImageMetadata, PdfMetadata};
use crate::utils::error::Result;
use chrono::NaiveDateTime;
use image::{ImageDecoder, ImageReader};
use lopdf::{Dictionary, Object};
use std::io::Cursor;

pub fn extract_metadata(kind: DocumentKind, data: &[u8]) -> DocumentMetadata {
    match kind {
        DocumentKind::Pdf => extract_pdf_metadata(data),
        DocumentKind::Png | DocumentKind::Jpeg => extract_image_metadata(data),
    }
}

pub fn extract_pdf_metadata(data: &[u8]) -> DocumentMetadata {
    let doc = match load_pdf(data) {
        Ok(doc) => doc,
        // lopdf cannot parse some encrypted files; their bytes still name the handler.
        Err(e) if contains(data, b"/Encrypt") => {
            tracing::debug!("Encrypted PDF could not be opened: {}", e);
            return DocumentMetadata::Pdf(PdfMetadata {
                encrypted: true,
                ..PdfMetadata::default()
            });
        }
        Err(e) => {
            return DocumentMetadata::Unreadable {
                error: e.to_string(),
            }
        }
    };

    let pages = doc.get_pages();
    let mut metadata = PdfMetadata {
        num_pages: pages.len(),
        encrypted: doc.trailer.has(b"Encrypt"),
        ..PdfMetadata::default()
    };

    if let Some(info) = info_dictionary(&doc) {
        metadata.title = info_string(info, b"Title");
        metadata.author = info_string(info, b"Author");
        metadata.subject = info_string(info, b"Subject");
        metadata.creator = info_string(info, b"Creator");
        metadata.producer = info_string(info, b"Producer");
        metadata.creation_date = info_string(info, b"CreationDate")
            .as_deref()
            .and_then(parse_pdf_date);
        metadata.modification_date = info_string(info, b"ModDate")
            .as_deref()
            .and_then(parse_pdf_date);
    }

    // A scanned or screenshotted page has no text layer.
    metadata.text_extractable = pages
        .keys()
        .next()
        .and_then(|first| doc.extract_text(&[*first]).ok())
        .map(|text| !text.trim().is_empty())
        .unwrap_or(false);

    DocumentMetadata::Pdf(metadata)
}

fn load_pdf(data: &[u8]) -> Result<lopdf::Document> {
    Ok(lopdf::Document::load_mem(data)?)
}

/// Text of the first `max_pages` pages, used as model context for PDFs.
pub fn extract_pdf_text(data: &[u8], max_pages: usize) -> Option<String> {
    let doc = load_pdf(data).ok()?;
    let pages: Vec<u32> = doc.get_pages().keys().copied().take(max_pages).collect();
    if pages.is_empty() {
        return None;
    }
    let text = doc.extract_text(&pages).ok()?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn info_dictionary(doc: &lopdf::Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn info_string(info: &Dictionary, key: &[u8]) -> Option<String> {
    match info.get(key).ok()? {
        Object::String(bytes, _) => {
            let decoded = decode_pdf_string(bytes);
            let trimmed = decoded.trim_matches(|c: char| c == '\0' || c.is_whitespace());
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

/// UTF-16BE with BOM, otherwise PDFDocEncoding (treated as Latin-1).
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// Parses `D:YYYYMMDDHHmmSS[OHH'mm']` into ISO-8601 without offset.
pub fn parse_pdf_date(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("D:").unwrap_or(trimmed);
    let stamp = digits.get(..14)?;
    NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S")
        .ok()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
}

pub fn extract_image_metadata(data: &[u8]) -> DocumentMetadata {
    match read_image_metadata(data) {
        Ok(metadata) => DocumentMetadata::Image(metadata),
        Err(e) => DocumentMetadata::Unreadable {
            error: e.to_string(),
        },
    }
}

fn read_image_metadata(data: &[u8]) -> Result<ImageMetadata> {
    let reader = ImageReader::new(Cursor::new(data)).with_guessed_format()?;
    let format = reader
        .format()
        .map(|f| format!("{:?}", f).to_ascii_uppercase())
        .unwrap_or_default();

    let mut decoder = reader.into_decoder()?;
    let (width, height) = decoder.dimensions();
    let color = format!("{:?}", decoder.color_type());
    let exif = decoder.exif_metadata()?;

    let dpi = match format.as_str() {
        "PNG" => png_dpi(data),
        "JPEG" => jpeg_dpi(data),
        _ => None,
    };

    Ok(ImageMetadata {
        format,
        width,
        height,
        color,
        dpi,
        exif_present: exif.as_ref().is_some_and(|e| !e.is_empty()),
        exif_bytes: exif.map(|e| e.len()).unwrap_or(0),
    })
}

/// Reads the `pHYs` chunk. Only metre units carry an absolute density.
pub fn png_dpi(data: &[u8]) -> Option<(f64, f64)> {
    let mut offset = 8;
    while offset + 8 <= data.len() {
        let length = u32::from_be_bytes(data[offset..offset + 4].try_into().ok()?) as usize;
        let chunk_type = &data[offset + 4..offset + 8];
        let body_start = offset + 8;
        let body_end = body_start.checked_add(length)?;
        if body_end > data.len() {
            return None;
        }

        match chunk_type {
            b"pHYs" if length >= 9 => {
                let body = &data[body_start..body_end];
                let ppu_x = u32::from_be_bytes(body[0..4].try_into().ok()?);
                let ppu_y = u32::from_be_bytes(body[4..8].try_into().ok()?);
                if body[8] != 1 {
                    return None;
                }
                return Some((per_metre_to_dpi(ppu_x), per_metre_to_dpi(ppu_y)));
            }
            b"IDAT" | b"IEND" => return None,
            _ => {}
        }

        // length + type + body + crc
        offset = body_end + 4;
    }
    None
}

fn per_metre_to_dpi(ppm: u32) -> f64 {
    ppm as f64 * 0.0254
}

/// Walks the header segments up to SOS. A JFIF density wins; otherwise the
/// EXIF `XResolution` is used.
pub fn jpeg_dpi(data: &[u8]) -> Option<(f64, f64)> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut exif_dpi = None;
    let mut offset = 2;
    while offset + 4 <= data.len() && data[offset] == 0xFF {
        let marker = data[offset + 1];
        if marker == 0xFF {
            offset += 1;
            continue;
        }
        if marker == 0xDA || marker == 0xD9 {
            break;
        }

        let length = u16::from_be_bytes([data[offset + 2], data[offset + 3]]) as usize;
        let Some(body) = data.get(offset + 4..offset + 2 + length.max(2)) else {
            break;
        };
        match marker {
            0xE0 => {
                if let Some(dpi) = jfif_density(body) {
                    return Some(dpi);
                }
            }
            0xE1 => {
                if let Some(tiff) = body.strip_prefix(b"Exif\0\0") {
                    exif_dpi = exif_dpi.or_else(|| exif_resolution(tiff));
                }
            }
            _ => {}
        }
        offset += 2 + length.max(2);
    }
    exif_dpi
}

fn jfif_density(body: &[u8]) -> Option<(f64, f64)> {
    if body.len() < 12 || !body.starts_with(b"JFIF\0") {
        return None;
    }
    let x = u16::from_be_bytes([body[8], body[9]]) as f64;
    let y = u16::from_be_bytes([body[10], body[11]]) as f64;
    match body[7] {
        1 => Some((x, y)),
        2 => Some((x * 2.54, y * 2.54)),
        _ => None,
    }
}

/// Resolution tags of IFD0. A missing `ResolutionUnit` means inches.
fn exif_resolution(tiff: &[u8]) -> Option<(f64, f64)> {
    let little_endian = match tiff.get(..2)? {
        b"II" => true,
        b"MM" => false,
        _ => return None,
    };
    let u16_at = |at: usize| -> Option<u16> {
        let bytes: [u8; 2] = tiff.get(at..at + 2)?.try_into().ok()?;
        Some(if little_endian {
            u16::from_le_bytes(bytes)
        } else {
            u16::from_be_bytes(bytes)
        })
    };
    let u32_at = |at: usize| -> Option<u32> {
        let bytes: [u8; 4] = tiff.get(at..at + 4)?.try_into().ok()?;
        Some(if little_endian {
            u32::from_le_bytes(bytes)
        } else {
            u32::from_be_bytes(bytes)
        })
    };
    let rational_at = |at: usize| -> Option<f64> {
        let denominator = u32_at(at + 4)?;
        if denominator == 0 {
            return None;
        }
        Some(u32_at(at)? as f64 / denominator as f64)
    };

    let ifd = u32_at(4)? as usize;
    let (mut x, mut y, mut unit) = (None, None, 2);
    for i in 0..u16_at(ifd)? as usize {
        let entry = ifd + 2 + i * 12;
        match u16_at(entry)? {
            0x011A => x = rational_at(u32_at(entry + 8)? as usize),
            0x011B => y = rational_at(u32_at(entry + 8)? as usize),
            0x0128 => unit = u16_at(entry + 8)?,
            _ => {}
        }
    }

    let scale = match unit {
        2 => 1.0,
        3 => 2.54,
        _ => return None,
    };
    let x = x? * scale;
    Some((x, y.map_or(x, |y| y * scale)))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
