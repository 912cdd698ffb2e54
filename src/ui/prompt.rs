use std::io::{BufRead, Write};

use compact_str::CompactString;

use crate::core::extension::normalize;
use crate::models::node::ScanNode;
use crate::models::params::ExtensionFilter;
use crate::store::ExtensionSelector;

/// Asks on stdin which of the discovered extensions to import.
///
/// Enter keeps all of them, `q` or end of input cancels, otherwise a comma or space
/// separated list is read. Unknown extensions are dropped.
pub struct StdinSelector;

impl ExtensionSelector for StdinSelector {
    fn select(&self, root: &ScanNode) -> Option<ExtensionFilter> {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "Found extensions:");
        for ext in &root.extensions {
            let _ = writeln!(stderr, "  {:<10} {:>6} files", ext, root.count_extension(ext));
        }
        let _ = write!(stderr, "Extensions to import [all, q to cancel]: ");
        let _ = stderr.flush();
        drop(stderr);

        read_selection(std::io::stdin().lock(), root)
    }
}

/// Reads one answer from `reader`. End of input cancels.
pub fn read_selection(mut reader: impl BufRead, root: &ScanNode) -> Option<ExtensionFilter> {
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) => {
            tracing::debug!("input closed at the extension prompt");
            None
        }
        Ok(_) => parse_selection(&line, root),
        Err(e) => {
            tracing::warn!("failed to read the extension selection: {}", e);
            None
        }
    }
}

/// Interprets one answer to the extension prompt.
pub fn parse_selection(input: &str, root: &ScanNode) -> Option<ExtensionFilter> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("q") {
        return None;
    }
    if input.is_empty() {
        return Some(ExtensionFilter::new(&root.extensions));
    }

    let chosen: Vec<CompactString> = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter_map(normalize)
        .filter(|ext| {
            let known = root.extensions.contains(ext);
            if !known {
                tracing::warn!("{} does not occur in the scanned folder, ignoring", ext);
            }
            known
        })
        .collect();

    let filter = ExtensionFilter::new(chosen);
    if filter.is_empty() {
        None
    } else {
        Some(filter)
    }
}
