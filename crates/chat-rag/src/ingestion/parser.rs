//! Text extraction for the supported upload formats

use pulldown_cmark::{Event, Parser as MarkdownParser, TagEnd};
use sha2::{Digest, Sha256};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::FileType;

/// Upper bound on pdf-extract before falling back to lopdf
const PDF_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Typographic characters PDF fonts emit that read poorly once extracted
const PDF_REPLACEMENTS: &[(char, &str)] = &[
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2013}', "-"),
    ('\u{2014}', "--"),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{2022}', "* "),
    ('\u{2026}', "..."),
    ('\u{00A0}', " "),
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Extracted document text with metadata
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Detected format
    pub file_type: FileType,
    /// Normalized plain text
    pub content: String,
    /// SHA-256 of `content`
    pub content_hash: String,
    /// Total pages (PDF only)
    pub total_pages: Option<u32>,
}

/// Format-dispatching text extractor
pub struct FileParser;

impl FileParser {
    /// Extract text from `data`. Fails with `FileParse` when nothing usable comes out.
    pub fn parse(filename: &str, file_type: FileType, data: &[u8]) -> Result<ParsedDocument> {
        let (raw, total_pages) = match file_type {
            FileType::Pdf => Self::parse_pdf(filename, data)?,
            FileType::Docx => (Self::parse_docx(filename, data)?, None),
            FileType::Markdown => (Self::parse_markdown(data), None),
            FileType::Txt => (String::from_utf8_lossy(data).into_owned(), None),
        };

        let content = normalize_text(&raw);
        if content.is_empty() {
            return Err(Error::file_parse(filename, "No text content could be extracted"));
        }

        tracing::debug!(
            "Extracted {} characters from {} ({})",
            content.len(),
            filename,
            file_type
        );

        Ok(ParsedDocument {
            file_type,
            content_hash: hash_content(&content),
            content,
            total_pages,
        })
    }

    fn parse_pdf(filename: &str, data: &[u8]) -> Result<(String, Option<u32>)> {
        let total_pages = lopdf::Document::load_mem(data)
            .ok()
            .map(|doc| doc.get_pages().len() as u32);

        let text = Self::extract_pdf_with_timeout(filename, data)?;

        let mut cleaned = text.replace('\0', "");
        for (from, to) in PDF_REPLACEMENTS {
            if cleaned.contains(*from) {
                cleaned = cleaned.replace(*from, to);
            }
        }

        Ok((cleaned, total_pages))
    }

    /// pdf-extract can hang or panic on unusual fonts, so it runs on its own thread
    fn extract_pdf_with_timeout(filename: &str, data: &[u8]) -> Result<String> {
        let owned = data.to_vec();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let _ = tx.send(pdf_extract::extract_text_from_mem(&owned));
        });

        match rx.recv_timeout(PDF_EXTRACT_TIMEOUT) {
            Ok(Ok(text)) if !text.trim().is_empty() => Ok(text),
            Ok(Ok(_)) => Self::extract_pdf_text_fallback(filename, data),
            Ok(Err(e)) => {
                tracing::warn!("pdf-extract failed for {}: {}, trying fallback", filename, e);
                Self::extract_pdf_text_fallback(filename, data)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::error!(
                    "PDF extraction timed out after {}s for {}",
                    PDF_EXTRACT_TIMEOUT.as_secs(),
                    filename
                );
                Self::extract_pdf_text_fallback(filename, data)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!("PDF extraction thread crashed for {}", filename);
                Self::extract_pdf_text_fallback(filename, data)
            }
        }
    }

    /// Page-by-page extraction using lopdf directly
    fn extract_pdf_text_fallback(filename: &str, data: &[u8]) -> Result<String> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        let mut text = String::new();

        for page in page_numbers {
            match doc.extract_text(&[page]) {
                Ok(page_text) => {
                    text.push_str(&page_text);
                    text.push('\n');
                }
                Err(e) => tracing::debug!("Could not extract page {} of {}: {}", page, filename, e),
            }
        }

        if text.trim().is_empty() {
            return Err(Error::file_parse(
                filename,
                "PDF appears to be image-based or has no extractable text",
            ));
        }

        Ok(text)
    }

    fn parse_docx(filename: &str, data: &[u8]) -> Result<String> {
        let doc = docx_rs::read_docx(data).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut content = String::new();
        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                for child in p.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            match child {
                                docx_rs::RunChild::Text(t) => content.push_str(&t.text),
                                docx_rs::RunChild::Tab(_) => content.push('\t'),
                                docx_rs::RunChild::Break(_) => content.push('\n'),
                                _ => {}
                            }
                        }
                    }
                }
                content.push('\n');
            }
        }

        Ok(content)
    }

    /// Render markdown to plain text, keeping block boundaries as blank lines
    fn parse_markdown(data: &[u8]) -> String {
        let source = String::from_utf8_lossy(data);
        let mut text = String::with_capacity(source.len());

        for event in MarkdownParser::new(&source) {
            match event {
                Event::Text(t) | Event::Code(t) => text.push_str(&t),
                Event::SoftBreak | Event::HardBreak => text.push('\n'),
                Event::End(TagEnd::Paragraph)
                | Event::End(TagEnd::Heading(_))
                | Event::End(TagEnd::CodeBlock)
                | Event::End(TagEnd::TableRow) => text.push_str("\n\n"),
                Event::End(TagEnd::Item) | Event::End(TagEnd::TableHead) => text.push('\n'),
                Event::End(TagEnd::TableCell) => text.push('\t'),
                Event::Rule => text.push_str("\n\n"),
                _ => {}
            }
        }

        text
    }
}

/// Trim line ends, collapse runs of blank lines, drop NULs, trim the whole text
fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = 0usize;

    for line in raw.replace("\r\n", "\n").replace('\0', "").lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run == 1 && !out.is_empty() {
                out.push('\n');
            }
            continue;
        }
        blank_run = 0;
        out.push_str(line);
        out.push('\n');
    }

    out.trim().to_string()
}

/// SHA-256 hex digest
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_normalizes_whitespace() {
        let parsed = FileParser::parse(
            "notes.txt",
            FileType::Txt,
            b"First line   \r\n\r\n\r\n\r\nSecond line\n\n",
        )
        .unwrap();

        assert_eq!(parsed.content, "First line\n\nSecond line");
        assert_eq!(parsed.content_hash.len(), 64);
        assert!(parsed.total_pages.is_none());
    }

    #[test]
    fn test_parse_markdown_strips_syntax() {
        let parsed = FileParser::parse(
            "guide.md",
            FileType::Markdown,
            b"# Photosynthesis\n\nPlants use **light** to make `sugar`.\n\n* chlorophyll\n* water\n",
        )
        .unwrap();

        assert!(parsed.content.starts_with("Photosynthesis"));
        assert!(parsed.content.contains("Plants use light to make sugar."));
        assert!(parsed.content.contains("chlorophyll"));
        assert!(!parsed.content.contains("**"));
        assert!(!parsed.content.contains('#'));
    }

    #[test]
    fn test_empty_text_is_parse_error() {
        let err = FileParser::parse("empty.txt", FileType::Txt, b"   \n\n  ").unwrap_err();
        assert!(matches!(err, Error::FileParse { ref filename, .. } if filename == "empty.txt"));
    }

    #[test]
    fn test_corrupt_docx_is_parse_error() {
        let err = FileParser::parse("broken.docx", FileType::Docx, b"not a zip archive").unwrap_err();
        assert!(matches!(err, Error::FileParse { .. }));
    }

    #[test]
    fn test_corrupt_pdf_is_parse_error() {
        let err = FileParser::parse("broken.pdf", FileType::Pdf, b"%PDF-garbage").unwrap_err();
        assert!(matches!(err, Error::FileParse { .. }));
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(hash_content("abc"), hash_content("abc"));
        assert_ne!(hash_content("abc"), hash_content("abd"));
    }
}
