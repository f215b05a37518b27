use anyhow::{Context, Result};
use std::path::Path;

use super::recipe::Store;

/// Write the collection as pretty JSON to `output`, or to stdout.
pub(crate) fn cmd_export(store: &Store, output: Option<&Path>, json: bool) -> Result<()> {
    let contents = store.export()?;

    let Some(path) = output else {
        println!("{contents}");
        return Ok(());
    };

    std::fs::write(path, &contents)
        .with_context(|| format!("Failed to write export file: {}", path.display()))?;
    let count = store.len();
    if json {
        println!(
            "{}",
            serde_json::json!({ "exported": count, "path": path.display().to_string() })
        );
    } else {
        println!("Exported {count} recipes to {}", path.display());
    }
    Ok(())
}
