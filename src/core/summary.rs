use crate::core::intake::{sha256_hex, validate_file};
use crate::core::metadata::extract_metadata;
use crate::core::signals::signals_from_metadata;

/// Human-readable file information block shown before analysis.
pub fn file_info_summary(data: &[u8], filename: &str, max_size: usize) -> String {
    let kind = match validate_file(data, filename, max_size) {
        Ok(kind) => kind,
        Err(e) => return format!("File Validation Error: {}", e),
    };

    let signals = signals_from_metadata(extract_metadata(kind, data));
    let hash = sha256_hex(data);

    let mut lines = vec![
        format!("File: {}", filename),
        format!("Size: {:.2} KB", data.len() as f64 / 1024.0),
        format!("Hash: {}...", &hash[..16]),
        String::new(),
    ];

    if !signals.positive_signals.is_empty() {
        lines.push("Positive Signals:".to_string());
        lines.extend(signals.positive_signals.iter().map(|s| format!("  • {}", s)));
        lines.push(String::new());
    }

    if !signals.red_flags.is_empty() {
        lines.push("Red Flags:".to_string());
        lines.extend(signals.red_flags.iter().map(|f| format!("  • {}", f)));
        lines.push(String::new());
    }

    lines.join("\n")
}
