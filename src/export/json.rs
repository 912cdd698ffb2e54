use std::path::Path;

use crate::models::node::ScanNode;

/// Writes the scan tree, aggregated extensions included, as pretty JSON.
pub fn export_json(tree: &ScanNode, output_path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(tree)?;
    std::fs::write(output_path, json)?;
    Ok(())
}
