//! Knowledge-base ingestion.
//!
//! Uploaded documents become datasets that move forward through
//! `pending → parsing → chunking → embedding → indexing → completed`, or to
//! `failed` from whichever stage raised. Text extraction lives in [`parse`],
//! windowing in [`chunk`], vectors in [`embed`] and storage in [`index`];
//! [`IngestPipeline`] ties them to the dataset store.

pub mod chunk;
pub mod config;
pub mod embed;
pub mod error;
pub mod index;
pub mod parse;
pub mod payload;
pub mod pipeline;

pub use chunk::{chunk_text, content_preview};
pub use config::{EmbeddingConfig, IngestConfig};
pub use embed::{Embedder, HashingEmbedder, OpenAiEmbedder, HASHING_DIMENSION};
pub use error::IngestError;
pub use index::{IndexEntry, ScoredChunk, SqliteVectorIndex, VectorIndex};
pub use parse::parse_document;
pub use payload::decode_file_payload;
pub use pipeline::{IngestPipeline, IngestRequest};
