//! Reading source files for ingestion.
//!
//! Dumps arrive as UTF-8, sometimes with a BOM, and occasionally re-saved
//! as windows-1251 by office tools. [`read_source`] reads the raw bytes
//! once, decodes them, and derives the provenance tag from a SHA-256 of
//! those bytes so the same file always produces the same tag.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Hex characters of the source digest kept in provenance tags.
const DIGEST_PREFIX_LEN: usize = 12;

/// Text encoding a source was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    Windows1251,
}

impl SourceEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceEncoding::Utf8 => "utf-8",
            SourceEncoding::Windows1251 => "windows-1251",
        }
    }
}

/// A source file read into memory.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    /// Lowercase hex SHA-256 of `bytes`.
    pub digest: String,
}

impl SourceFile {
    /// `<label>@<digest prefix>`; `label` defaults to the file name.
    pub fn provenance_tag(&self, label: Option<&str>) -> String {
        let label = match label {
            Some(l) if !l.trim().is_empty() => l.trim().to_string(),
            _ => self
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| self.path.display().to_string()),
        };
        let short = self.digest.get(..DIGEST_PREFIX_LEN).unwrap_or(&self.digest);
        format!("{}@{}", label, short)
    }

    pub fn is_pdf(&self) -> bool {
        self.path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false)
            || self.bytes.starts_with(b"%PDF-")
    }

    /// Decode the bytes as text: UTF-8 first, windows-1251 otherwise.
    pub fn decode_text(&self) -> (String, SourceEncoding) {
        decode_text(&self.bytes)
    }
}

/// Read `path` fully. A missing or unreadable file is fatal for the run.
pub fn read_source(path: &Path) -> Result<SourceFile> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to open source file: {}", path.display()))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = format!("{:x}", hasher.finalize());

    Ok(SourceFile {
        path: path.to_path_buf(),
        bytes,
        digest,
    })
}

pub fn decode_text(bytes: &[u8]) -> (String, SourceEncoding) {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), SourceEncoding::Utf8),
        Err(_) => {
            let (text, _) = encoding_rs::WINDOWS_1251.decode_without_bom_handling(bytes);
            (text.into_owned(), SourceEncoding::Windows1251)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn utf8_with_bom() {
        let (text, enc) = decode_text("\u{FEFF}0101210000\tOtlar".as_bytes());
        assert_eq!(text, "0101210000\tOtlar");
        assert_eq!(enc, SourceEncoding::Utf8);
    }

    #[test]
    fn windows_1251_fallback() {
        // "Пиво" in windows-1251
        let bytes = [0xCF, 0xE8, 0xE2, 0xEE];
        let (text, enc) = decode_text(&bytes);
        assert_eq!(text, "Пиво");
        assert_eq!(enc, SourceEncoding::Windows1251);
    }

    #[test]
    fn provenance_tag_is_stable() {
        let mut f = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        f.write_all(b"0101210000\tOtlar\n").unwrap();
        let a = read_source(f.path()).unwrap();
        let b = read_source(f.path()).unwrap();
        assert_eq!(a.provenance_tag(None), b.provenance_tag(None));
        assert_eq!(a.digest.len(), 64);

        let tag = a.provenance_tag(Some("tif-tn-2022"));
        let (label, digest) = tag.split_once('@').unwrap();
        assert_eq!(label, "tif-tn-2022");
        assert_eq!(digest.len(), 12);
        assert!(a.provenance_tag(None).ends_with(digest));
        assert!(!a.is_pdf());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_source(Path::new("/nonexistent/info.txt")).unwrap_err();
        assert!(err.to_string().contains("Failed to open source file"));
    }
}
