pub mod json_file;
pub mod postgres;

pub use json_file::{JsonFileSink, StagedFile};
pub use postgres::{PostgresSink, StagedRows};

use crate::pipeline::{Extraction, PipelineError};

/// The configured destinations of an extraction.
pub enum OutputSink {
    Json(JsonFileSink),
    Postgres(PostgresSink),
}

impl OutputSink {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::Postgres(_) => "postgres",
        }
    }

    /// Prepare the write without making it visible.
    pub async fn stage(&self, extraction: &Extraction) -> Result<StagedOutput, PipelineError> {
        match self {
            Self::Json(s) => s.stage(extraction).await.map(StagedOutput::File),
            Self::Postgres(s) => s.stage(extraction).await.map(StagedOutput::Rows),
        }
    }
}

/// A prepared write. Dropping it without `commit` discards it.
pub enum StagedOutput {
    File(StagedFile),
    Rows(StagedRows),
}

impl StagedOutput {
    /// Commit order: open transactions before file renames.
    pub fn commit_rank(&self) -> u8 {
        match self {
            Self::Rows(_) => 0,
            Self::File(_) => 1,
        }
    }

    pub async fn commit(self) -> Result<(), PipelineError> {
        match self {
            Self::File(staged) => staged.commit().map(|_| ()),
            Self::Rows(staged) => staged.commit().await.map(|_| ()),
        }
    }
}
