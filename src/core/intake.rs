use crate::domain::model::{Document, DocumentKind, Upload};
use crate::utils::error::{AnalystError, Result};
use crate::utils::validation::validate_file_extension;
use chrono::Utc;
use sha2::{Digest, Sha256};

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["pdf", "png", "jpg", "jpeg"];
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];
const PDF_SIGNATURE: &[u8] = b"%PDF-";

/// Identifies the content kind from magic bytes, ignoring the filename.
pub fn sniff_kind(data: &[u8]) -> Option<DocumentKind> {
    if data.starts_with(PDF_SIGNATURE) {
        Some(DocumentKind::Pdf)
    } else if data.starts_with(PNG_SIGNATURE) {
        Some(DocumentKind::Png)
    } else if data.starts_with(JPEG_SIGNATURE) {
        Some(DocumentKind::Jpeg)
    } else {
        None
    }
}

/// Size ceiling, then extension allow-list, then content sniffing.
pub fn validate_file(data: &[u8], filename: &str, max_size: usize) -> Result<DocumentKind> {
    if data.len() > max_size {
        return Err(AnalystError::FileTooLarge {
            size: Some(data.len()),
            max: max_size,
        });
    }

    let extension = validate_file_extension("file", filename, &ALLOWED_EXTENSIONS)?;
    let declared = DocumentKind::from_extension(&extension).ok_or_else(|| {
        AnalystError::UnsupportedFileType {
            extension: format!(".{}", extension),
        }
    })?;

    match sniff_kind(data) {
        Some(detected) if detected == declared => Ok(detected),
        Some(detected) => Err(AnalystError::MimeMismatch {
            detected: detected.mime_type().to_string(),
            extension: format!(".{}", extension),
        }),
        None => Err(AnalystError::MimeMismatch {
            detected: "application/octet-stream".to_string(),
            extension: format!(".{}", extension),
        }),
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Compares the file hash against `expected` without early exit.
pub fn verify_integrity(data: &[u8], expected: &str) -> bool {
    let actual = sha256_hex(data);
    if actual.len() != expected.len() {
        return false;
    }
    actual
        .bytes()
        .zip(expected.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

pub fn validate_upload(upload: Upload, max_size: usize) -> Result<Document> {
    let kind = validate_file(&upload.data, &upload.filename, max_size)?;
    let sha256 = sha256_hex(&upload.data);

    Ok(Document {
        filename: upload.filename,
        kind,
        document_type: upload.document_type,
        sha256,
        size: upload.data.len(),
        uploaded_at: Utc::now(),
        user_id: upload.user_id,
        data: upload.data,
    })
}
