use nosboot_shared::{NosbootError, NosbootResult};
use std::path::Path;

/// Load the user startup configuration.
///
/// Returns `None` when the file does not exist; the file is not opened in
/// that case. Lines are split on `\n` with a trailing `\r` removed; the rest
/// is returned as raw bytes, so the file need not be UTF-8.
pub async fn load_user_config(path: &Path) -> NosbootResult<Option<Vec<Vec<u8>>>> {
    let exists = tokio::fs::try_exists(path)
        .await
        .map_err(|e| NosbootError::Storage(format!("Failed to stat {}: {}", path.display(), e)))?;
    if !exists {
        tracing::trace!(path = %path.display(), "Startup config not found");
        return Ok(None);
    }

    let content = tokio::fs::read(path)
        .await
        .map_err(|e| NosbootError::Storage(format!("Failed to read {}: {}", path.display(), e)))?;
    let lines = split_lines(&content);

    tracing::trace!(path = %path.display(), lines = lines.len(), "Parsed startup config");
    Ok(Some(lines))
}

fn split_lines(content: &[u8]) -> Vec<Vec<u8>> {
    content
        .split_inclusive(|b| *b == b'\n')
        .map(|line| {
            let line = line.strip_suffix(b"\n").unwrap_or(line);
            line.strip_suffix(b"\r").unwrap_or(line).to_vec()
        })
        .collect()
}
