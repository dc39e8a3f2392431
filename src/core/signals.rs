use crate::core::metadata::extract_metadata;
use crate::domain::model::{AuthenticitySignals, Document, DocumentMetadata, ImageMetadata, PdfMetadata};

const LEGITIMATE_TOOLS: [&str; 5] = ["quickbooks", "bank", "financial", "acrobat", "microsoft"];
const EDITING_TOOLS: [&str; 5] = ["photoshop", "gimp", "paint", "preview", "pixlr"];
const MIN_DPI: f64 = 150.0;

pub fn analyze_authenticity_signals(document: &Document) -> AuthenticitySignals {
    signals_from_metadata(extract_metadata(document.kind, &document.data))
}

pub fn signals_from_metadata(metadata: DocumentMetadata) -> AuthenticitySignals {
    let mut red_flags = Vec::new();
    let mut positive_signals = Vec::new();

    match &metadata {
        DocumentMetadata::Pdf(pdf) => pdf_signals(pdf, &mut red_flags, &mut positive_signals),
        DocumentMetadata::Image(img) => image_signals(img, &mut red_flags),
        DocumentMetadata::Unreadable { error } => {
            red_flags.push(format!("Document structure could not be read: {}", error));
        }
    }

    AuthenticitySignals {
        red_flags,
        positive_signals,
        metadata,
    }
}

fn pdf_signals(pdf: &PdfMetadata, red_flags: &mut Vec<String>, positive: &mut Vec<String>) {
    if pdf.encrypted {
        red_flags.push("Document is encrypted - unusual for bank statements".to_string());
    }

    if pdf.text_extractable {
        positive.push("Text is extractable - appears to be original digital document".to_string());
    } else {
        red_flags.push("Text not extractable - possible scanned/screenshot document".to_string());
    }

    let creator = pdf.creator.as_deref().unwrap_or("").to_lowercase();
    let producer = pdf.producer.as_deref().unwrap_or("").to_lowercase();
    let tool = if creator.is_empty() { &producer } else { &creator };
    let mentions = |names: &[&str]| {
        names
            .iter()
            .any(|name| creator.contains(name) || producer.contains(name))
    };

    if mentions(&LEGITIMATE_TOOLS) {
        positive.push(format!("Created with legitimate software: {}", tool));
    }
    if mentions(&EDITING_TOOLS) {
        red_flags.push(format!(
            "Created/modified with image editing software: {}",
            tool
        ));
    }

    if pdf.creation_date.is_some() && pdf.modification_date.is_some() {
        positive.push("Document has creation and modification timestamps".to_string());
    }
}

fn image_signals(img: &ImageMetadata, red_flags: &mut Vec<String>) {
    red_flags.push("Document submitted as image rather than original PDF".to_string());

    if img.format == "PNG" && !img.exif_present {
        red_flags.push("PNG with no EXIF data - likely a screenshot".to_string());
    }

    if let Some((dpi_x, _)) = img.dpi {
        if dpi_x < MIN_DPI {
            red_flags.push(format!(
                "Low resolution ({} DPI) - may indicate re-photographed document",
                format_dpi(dpi_x)
            ));
        }
    }
}

/// One decimal place, dropped when it is zero.
fn format_dpi(dpi: f64) -> String {
    let tenths = (dpi * 10.0).round() / 10.0;
    if tenths.fract() == 0.0 {
        format!("{:.0}", tenths)
    } else {
        format!("{:.1}", tenths)
    }
}
