//! Document ingestion: parsing, chunking, embedding and indexing uploads

mod chunker;
mod parser;
mod processor;

pub use chunker::{TextChunker, TextWindow};
pub use parser::{FileParser, ParsedDocument};
pub use processor::{DocumentIngestor, Upload};
