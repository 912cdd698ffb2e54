//! File extension rules shared by the scanner, the filter and the importer.

use std::path::Path;

use compact_str::CompactString;

pub const PDF_EXTENSION: &str = "pdf";

/// Lowercased text after the last dot of the file name.
///
/// Names without a dot and dotfiles (`.gitignore`, `.config.json`) have no
/// extension.
pub fn extension_of(path: &Path) -> Option<CompactString> {
    let name = path.file_name()?.to_string_lossy();
    extension_of_name(&name)
}

pub fn extension_of_name(name: &str) -> Option<CompactString> {
    if name.starts_with('.') {
        return None;
    }
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(CompactString::from(ext.to_lowercase())),
        _ => None,
    }
}

/// Normalizes user input such as `PDF` or `.pdf` to `pdf`.
pub fn normalize(input: &str) -> Option<CompactString> {
    let trimmed = input.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        None
    } else {
        Some(CompactString::from(trimmed.to_lowercase()))
    }
}

pub fn is_pdf(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| ext == PDF_EXTENSION)
}
