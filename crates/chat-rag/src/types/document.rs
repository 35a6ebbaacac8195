//! Document and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported upload formats
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
}

impl FileType {
    /// All accepted formats, in the order they are advertised
    pub const ALL: [FileType; 4] = [Self::Pdf, Self::Txt, Self::Docx, Self::Markdown];

    /// Detect file type from extension (without the leading dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" | "text" => Some(Self::Txt),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Detect file type from a declared mime type
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or_default().trim().to_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(Self::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(Self::Docx)
            }
            "text/plain" => Some(Self::Txt),
            "text/markdown" | "text/x-markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Detect from the filename extension, falling back to the declared mime type.
    ///
    /// A filename that carries an extension we don't accept is rejected even if
    /// the mime type would match.
    pub fn detect(filename: &str, mime: Option<&str>) -> Option<Self> {
        match std::path::Path::new(filename).extension().and_then(|e| e.to_str()) {
            Some(ext) => Self::from_extension(ext),
            None => mime.and_then(Self::from_mime),
        }
    }

    /// Canonical extension with leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => ".pdf",
            Self::Docx => ".docx",
            Self::Txt => ".txt",
            Self::Markdown => ".md",
        }
    }

    /// Canonical mime type
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            Self::Txt => "text/plain",
            Self::Markdown => "text/markdown",
        }
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF documents",
            Self::Docx => "Microsoft Word documents",
            Self::Txt => "Plain text files",
            Self::Markdown => "Markdown files",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.extension()[1..])
    }
}

/// A document that has been ingested into the knowledge base
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Original filename as uploaded
    pub filename: String,
    /// Display title (defaults to the filename)
    pub title: String,
    /// Optional description supplied at upload
    #[serde(default)]
    pub description: Option<String>,
    /// Declared mime type, or the canonical one for the detected format
    pub mime_type: String,
    /// Detected format
    pub file_type: FileType,
    /// SHA-256 of the extracted text
    pub content_hash: String,
    /// File size in bytes
    pub file_size: u64,
    /// Number of pages (PDF only)
    pub total_pages: Option<u32>,
    /// Length of the extracted text in characters
    pub char_count: usize,
    /// Upload timestamp
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
    /// Chunk IDs in document order
    pub chunk_ids: Vec<Uuid>,
}

impl Document {
    /// Source attribution shared by every chunk of this document
    pub fn source(&self) -> ChunkSource {
        ChunkSource {
            filename: self.filename.clone(),
            title: self.title.clone(),
            file_type: self.file_type,
            page_count: self.total_pages,
        }
    }
}

/// Source information for a chunk (used for citations)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkSource {
    /// Original filename
    pub filename: String,
    /// Document title
    pub title: String,
    /// File type
    pub file_type: FileType,
    /// Total pages in the source document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
}

impl ChunkSource {
    /// Format source for display in prompts and citations
    pub fn format_citation(&self) -> String {
        if self.title.is_empty() || self.title == self.filename {
            self.filename.clone()
        } else {
            format!("{} ({})", self.title, self.filename)
        }
    }
}

/// A chunk of text from a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Text content
    pub text: String,
    /// Character offset into the extracted document text
    pub source_offset: usize,
    /// Chunk index within document
    pub chunk_index: u32,
    /// Source information for citations
    pub source: ChunkSource,
    /// Embedding vector
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Create a new chunk without an embedding
    pub fn new(
        document_id: Uuid,
        text: String,
        source: ChunkSource,
        source_offset: usize,
        chunk_index: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            text,
            source_offset,
            chunk_index,
            source,
            embedding: Vec::new(),
        }
    }

    /// Metadata exposed in search results
    pub fn metadata(&self) -> serde_json::Value {
        let mut meta = serde_json::json!({
            "chunk_id": self.id.to_string(),
            "document_id": self.document_id.to_string(),
            "source": self.source.filename,
            "title": self.source.title,
            "file_type": self.source.file_type,
            "chunk_index": self.chunk_index,
            "source_offset": self.source_offset,
        });

        if let (Some(pages), Some(obj)) = (self.source.page_count, meta.as_object_mut()) {
            obj.insert("page_count".to_string(), serde_json::json!(pages));
        }

        meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_prefers_extension() {
        assert_eq!(FileType::detect("notes.MD", None), Some(FileType::Markdown));
        assert_eq!(
            FileType::detect("report.pdf", Some("text/plain")),
            Some(FileType::Pdf)
        );
        assert_eq!(FileType::detect("script.exe", Some("text/plain")), None);
    }

    #[test]
    fn test_detect_falls_back_to_mime() {
        assert_eq!(
            FileType::detect("upload", Some("text/plain; charset=utf-8")),
            Some(FileType::Txt)
        );
        assert_eq!(FileType::detect("upload", Some("image/png")), None);
        assert_eq!(FileType::detect("upload", None), None);
    }

    #[test]
    fn test_citation_format() {
        let source = ChunkSource {
            filename: "guide.pdf".into(),
            title: "Study Guide".into(),
            file_type: FileType::Pdf,
            page_count: Some(3),
        };
        assert_eq!(source.format_citation(), "Study Guide (guide.pdf)");

        let plain = ChunkSource {
            title: "guide.pdf".into(),
            ..source
        };
        assert_eq!(plain.format_citation(), "guide.pdf");
    }
}
