// src/export.rs
// =============================================================================
// Writes the normalized exams out as pretty-printed JSON (2-space indent).
//
// - An empty set is refused: no file at all rather than a file holding `[]`
// - The file is written to a temporary sibling first and then renamed, so a
//   failure never leaves a half-written converted_exams.json behind
// =============================================================================

use crate::error::{ConvertError, Result};
use crate::exam::NormalizedExam;
use std::path::{Path, PathBuf};
use tracing::info;

pub const EXPORT_FILE_NAME: &str = "converted_exams.json";
pub const EXPORT_MIME_TYPE: &str = "application/json";

pub fn serialize(exams: &[NormalizedExam]) -> Result<Vec<u8>> {
    if exams.is_empty() {
        return Err(ConvertError::ExportRefused);
    }

    let mut bytes =
        serde_json::to_vec_pretty(exams).map_err(|e| ConvertError::ExportFailure(e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Writes `bytes` to `dir/file_name` and returns the final path
pub async fn write_export(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let failure = |what: &str, path: &Path, e: std::io::Error| {
        ConvertError::ExportFailure(format!("{} {}: {}", what, path.display(), e))
    };

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| failure("cannot create", dir, e))?;

    let target = dir.join(file_name);
    let partial = dir.join(format!(".{}.partial", file_name));

    if let Err(e) = tokio::fs::write(&partial, bytes).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(failure("cannot write", &partial, e));
    }

    if let Err(e) = tokio::fs::rename(&partial, &target).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(failure("cannot move into place", &target, e));
    }

    info!(
        "wrote {} ({} bytes, {})",
        target.display(),
        bytes.len(),
        EXPORT_MIME_TYPE
    );
    Ok(target)
}
