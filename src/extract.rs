//! Text extraction for printed nomenclature PDFs.
//!
//! The layout scanner works on plain text; this module turns PDF bytes into
//! that text. Anything that is not a PDF is decoded as a text dump instead.

use crate::source::{SourceEncoding, SourceFile};

/// Extraction error. A damaged PDF is fatal for the run.
#[derive(Debug)]
pub enum ExtractError {
    Pdf(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Where the scanned text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOrigin {
    Pdf,
    Text(SourceEncoding),
}

pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
}

/// Text of `source`: PDF extraction for PDFs, decoding otherwise.
pub fn source_text(source: &SourceFile) -> Result<(String, TextOrigin), ExtractError> {
    if source.is_pdf() {
        let text = extract_pdf(&source.bytes)?;
        return Ok((text, TextOrigin::Pdf));
    }
    let (text, encoding) = source.decode_text();
    Ok((text, TextOrigin::Text(encoding)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn source(name: &str, bytes: &[u8]) -> SourceFile {
        SourceFile {
            path: PathBuf::from(name),
            bytes: bytes.to_vec(),
            digest: String::new(),
        }
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = source_text(&source("tif.pdf", b"not a pdf")).unwrap_err();
        assert!(err.to_string().contains("PDF extraction failed"));
    }

    #[test]
    fn text_dump_is_decoded() {
        let (text, origin) = source_text(&source("tif.txt", "0101 21 000 0\nOtlar\n".as_bytes())).unwrap();
        assert_eq!(origin, TextOrigin::Text(SourceEncoding::Utf8));
        assert!(text.starts_with("0101 21 000 0"));
    }
}
