//! Ingested knowledge-base documents.

use serde::{Deserialize, Serialize};

string_enum! {
    /// Ingestion progress of a dataset.
    ///
    /// Moves strictly forward through the pipeline stages; `Failed` can be
    /// reached from any non-terminal stage.
    DatasetStatus, "dataset status" {
        Pending => "pending",
        Parsing => "parsing",
        Chunking => "chunking",
        Embedding => "embedding",
        Indexing => "indexing",
        Completed => "completed",
        Failed => "failed",
    }
}

impl DatasetStatus {
    /// The stage that follows this one on the success path.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Parsing),
            Self::Parsing => Some(Self::Chunking),
            Self::Chunking => Some(Self::Embedding),
            Self::Embedding => Some(Self::Indexing),
            Self::Indexing => Some(Self::Completed),
            Self::Completed | Self::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self -> to` is a legal transition.
    pub fn can_advance_to(self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Self::Failed || self.next() == Some(to)
    }
}

string_enum! {
    /// Declared format of an uploaded document.
    SourceType, "source type" {
        Pdf => "pdf",
        Csv => "csv",
        Excel => "excel",
        /// Markdown export of a Notion page.
        Notion => "notion",
        /// JSON export of an Airtable base.
        Airtable => "airtable",
        Text => "text",
    }
}

/// One ingested document and its indexing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    pub tenant_id: String,
    pub uploaded_by: String,
    pub file_name: String,
    /// Kept as declared by the uploader; unknown values fail ingestion.
    pub source_type: String,
    pub status: DatasetStatus,
    pub vector_count: u32,
    pub content_preview: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
