// src/ingest/source.rs
// =============================================================================
// Reads the raw exam text.
//
// Two sources, matching the two ways a user hands us a document:
//   - a file path (normally a .json file)
//   - "-" for standard input (pasted text)
//
// Only reading happens here. Parsing is document_set's job.
// =============================================================================

use crate::error::{ConvertError, Result};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    /// "-" means stdin, anything else is a path
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            InputSource::Stdin
        } else {
            InputSource::File(PathBuf::from(arg))
        }
    }

    fn display_path(&self) -> &Path {
        match self {
            InputSource::Stdin => Path::new("<stdin>"),
            InputSource::File(path) => path,
        }
    }
}

pub async fn read_input(source: &InputSource) -> Result<String> {
    let text = match source {
        InputSource::Stdin => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .map_err(|source| ConvertError::Io {
                    path: PathBuf::from("<stdin>"),
                    source,
                })?;
            text
        }
        InputSource::File(path) => {
            if !has_json_extension(path) {
                warn!("{} does not have a .json extension, reading it anyway", path.display());
            }
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConvertError::Io {
                    path: path.clone(),
                    source,
                })?
        }
    };

    debug!("read {} bytes from {}", text.len(), source.display_path().display());
    Ok(text)
}

fn has_json_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dash_means_stdin() {
        assert_eq!(InputSource::from_arg("-"), InputSource::Stdin);
        assert_eq!(
            InputSource::from_arg("exams.json"),
            InputSource::File(PathBuf::from("exams.json"))
        );
    }

    #[test]
    fn json_extension_check() {
        assert!(has_json_extension(Path::new("a/b.json")));
        assert!(has_json_extension(Path::new("B.JSON")));
        assert!(!has_json_extension(Path::new("b.txt")));
        assert!(!has_json_extension(Path::new("json")));
    }

    #[tokio::test]
    async fn reads_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exam.json");
        std::fs::write(&path, r#"{"name": "T"}"#).unwrap();

        let text = read_input(&InputSource::File(path)).await.unwrap();
        assert_eq!(text, r#"{"name": "T"}"#);
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_input(&InputSource::File(dir.path().join("nope.json")))
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::Io { .. }));
    }
}
