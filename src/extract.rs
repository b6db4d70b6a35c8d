//! Text extraction for uploaded documents (PDF, DOCX, plain text).
//!
//! Loaders supply raw bytes plus a filename; this module returns plain
//! UTF-8 text. Parsing is delegated to `pdf-extract` for PDFs and to a
//! `zip` + `quick-xml` walk over `word/document.xml` for DOCX.

use std::io::Read;

/// Maximum decompressed bytes to read from a single ZIP entry
/// (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// File extensions accepted by [`extract_file_text`].
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "txt"];

/// Extraction error. No panic paths: the pipeline reports these to the user.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedFileType(String),
    Pdf(String),
    Docx(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedFileType(ext) => {
                write!(
                    f,
                    "unsupported file type '{}'; use one of: {}",
                    ext,
                    SUPPORTED_EXTENSIONS.join(", ")
                )
            }
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Docx(e) => write!(f, "DOCX extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Lower-cased extension of a filename, empty when absent.
pub fn file_extension(filename: &str) -> String {
    std::path::Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Extract plain text from an uploaded file, dispatching on extension.
pub fn extract_file_text(filename: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    match file_extension(filename).as_str() {
        "pdf" => extract_pdf(bytes),
        "docx" => extract_docx(bytes),
        "txt" => Ok(String::from_utf8_lossy(bytes).into_owned()),
        other => Err(ExtractError::UnsupportedFileType(other.to_string())),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let text =
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
    // One line per page, blank lines dropped.
    let cleaned: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    Ok(cleaned.join("\n"))
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(e.to_string()))?;
    let mut doc_xml = Vec::new();
    {
        let entry = archive
            .by_name("word/document.xml")
            .map_err(|_| ExtractError::Docx("word/document.xml not found".to_string()))?;
        entry
            .take(MAX_XML_ENTRY_BYTES)
            .read_to_end(&mut doc_xml)
            .map_err(|e| ExtractError::Docx(e.to_string()))?;
        if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
            return Err(ExtractError::Docx(
                "word/document.xml exceeds size limit".to_string(),
            ));
        }
    }
    extract_paragraph_text(&doc_xml)
}

/// Collect `w:t` runs, one output line per `w:p` paragraph; empty
/// paragraphs are dropped.
fn extract_paragraph_text(xml: &[u8]) -> Result<String, ExtractError> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        current.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"p" {
                    let trimmed = current.trim();
                    if !trimmed.is_empty() {
                        paragraphs.push(trimmed.to_string());
                    }
                    current.clear();
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Docx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    // Text outside any closed paragraph still counts.
    let trailing = current.trim();
    if !trailing.is_empty() {
        paragraphs.push(trailing.to_string());
    }
    Ok(paragraphs.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            let body: String = paragraphs
                .iter()
                .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
                .collect();
            let xml = format!(
                "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
                body
            );
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn unsupported_extension_returns_error() {
        let err = extract_file_text("notes.epub", b"data").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFileType(_)));
        assert!(err.to_string().contains("pdf, docx, txt"));
    }

    #[test]
    fn missing_extension_returns_error() {
        let err = extract_file_text("README", b"data").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFileType(_)));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_file_text("bad.pdf", b"not a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn invalid_zip_returns_error_for_docx() {
        let err = extract_file_text("bad.docx", b"not a zip").unwrap_err();
        assert!(matches!(err, ExtractError::Docx(_)));
    }

    #[test]
    fn txt_is_decoded_lossily() {
        let text = extract_file_text("notes.txt", b"plain text body").unwrap();
        assert_eq!(text, "plain text body");
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let bytes = docx_with_paragraphs(&["First paragraph.", "Second paragraph."]);
        let text = extract_file_text("doc.docx", &bytes).unwrap();
        assert_eq!(text, "First paragraph.\nSecond paragraph.");
    }

    #[test]
    fn docx_empty_paragraphs_dropped() {
        let bytes = docx_with_paragraphs(&["Kept.", "   ", "Also kept."]);
        let text = extract_file_text("doc.docx", &bytes).unwrap();
        assert_eq!(text, "Kept.\nAlso kept.");
    }

    #[test]
    fn uppercase_extension_is_accepted() {
        let text = extract_file_text("NOTES.TXT", b"shouting").unwrap();
        assert_eq!(text, "shouting");
    }
}
