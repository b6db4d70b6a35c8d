//! Uploaded-file loader.
//!
//! Maps a filename + raw bytes to a [`LoadedSource`], dispatching text
//! extraction to [`crate::extract`] and deriving the source kind from
//! the file extension.

use anyhow::{bail, Result};

use crate::extract::{extract_file_text, file_extension};
use crate::models::{LoadedSource, SourceKind};

pub fn load_file(filename: &str, bytes: &[u8]) -> Result<LoadedSource> {
    let filename = filename.trim();
    if filename.is_empty() {
        bail!("Filename must not be empty");
    }

    let kind = match file_extension(filename).as_str() {
        "pdf" => SourceKind::Pdf,
        "docx" => SourceKind::Docx,
        "txt" => SourceKind::Text,
        _ => SourceKind::Text, // extract_file_text rejects it below
    };

    let text = extract_file_text(filename, bytes)?;

    Ok(LoadedSource {
        kind,
        origin: filename.to_string(),
        title: None,
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn txt_file_maps_to_text_kind() {
        let loaded = load_file("notes.txt", b"hello there").unwrap();
        assert_eq!(loaded.kind, SourceKind::Text);
        assert_eq!(loaded.origin, "notes.txt");
        assert_eq!(loaded.text, "hello there");
    }

    #[test]
    fn unsupported_file_is_rejected() {
        let err = load_file("image.png", b"\x89PNG").unwrap_err();
        assert!(err.to_string().contains("unsupported file type"));
    }

    #[test]
    fn empty_filename_is_rejected() {
        assert!(load_file("   ", b"data").is_err());
    }
}
