//! Setup hooks for preparing submission files before loading.

use std::path::Path;

use anyhow::{Context, Result};

/// Normalize line endings to LF and make sure the file ends with a newline.
///
/// Idempotent; the file is only rewritten when something changes.
pub fn normalize_source(path: &Path) -> Result<()> {
    let original = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mut normalized = original.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }

    if normalized != original {
        std::fs::write(path, &normalized)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::debug!(file = %path.display(), "normalized submission source");
    }
    Ok(())
}
