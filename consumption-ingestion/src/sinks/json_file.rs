use std::path::{Path, PathBuf};

use consumption_store::domain::ConsumptionDocument;
use futures::StreamExt;
use tempfile::TempPath;
use time::{format_description::BorrowedFormatItem, macros::format_description, OffsetDateTime};
use tokio::io::AsyncWriteExt;

use crate::observability;
use crate::pipeline::{Envelope, Extraction, PipelineError, Sink};

const FILE_MONTH_YEAR: &[BorrowedFormatItem<'static>] = format_description!("[month repr:short]_[year repr:last_two]");

/// `en_consumption_{Mon}_{yy}.json`, from the UTC instant of the first reading.
pub fn output_file_name(first_instant: OffsetDateTime) -> Result<String, PipelineError> {
    let stamp = first_instant
        .format(FILE_MONTH_YEAR)
        .map_err(|e| PipelineError::Sink(format!("cannot format file name from {first_instant}: {e}")))?;
    Ok(format!("en_consumption_{stamp}.json"))
}

pub async fn read_document(path: &Path) -> Result<ConsumptionDocument, PipelineError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| PipelineError::Sink(format!("failed to read {}: {e}", path.display())))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| PipelineError::Sink(format!("invalid consumption document {}: {e}", path.display())))
}

/// A fully written document in a hidden temp file beside its target.
///
/// `commit` renames it into place; dropping it uncommitted deletes the temp file.
pub struct StagedFile {
    temp: TempPath,
    target: PathBuf,
}

impl StagedFile {
    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn commit(self) -> Result<PathBuf, PipelineError> {
        let Self { temp, target } = self;
        temp.persist(&target)
            .map_err(|e| PipelineError::Sink(format!("failed to move document into {}: {e}", target.display())))?;

        metrics::counter!("consumption_documents_written_total").increment(1);
        tracing::info!(path = %target.display(), "consumption document written");
        Ok(target)
    }
}

/// Writes each extraction's document to `{dir}/en_consumption_{Mon}_{yy}.json`.
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, extraction: &Extraction) -> Result<PathBuf, PipelineError> {
        let first = extraction
            .first_instant()
            .ok_or_else(|| PipelineError::Sink("extraction holds no readings to name the file after".to_string()))?;
        Ok(self.dir.join(output_file_name(first)?))
    }

    /// Serialize the whole document and write it next to its target without replacing it yet.
    pub async fn stage(&self, extraction: &Extraction) -> Result<StagedFile, PipelineError> {
        let target = self.path_for(extraction)?;
        let bytes = serde_json::to_vec(&extraction.document)
            .map_err(|e| PipelineError::Sink(format!("failed to serialize consumption document: {e}")))?;

        let io_error = |e: std::io::Error| PipelineError::Sink(format!("failed to stage {}: {e}", target.display()));

        tokio::fs::create_dir_all(&self.dir).await.map_err(io_error)?;
        let (file, temp) = tempfile::Builder::new()
            .prefix(".en_consumption")
            .suffix(".json.tmp")
            .tempfile_in(&self.dir)
            .map_err(io_error)?
            .into_parts();

        let mut file = tokio::fs::File::from_std(file);
        file.write_all(&bytes).await.map_err(io_error)?;
        file.sync_all().await.map_err(io_error)?;

        tracing::debug!(path = %target.display(), bytes = bytes.len(), "consumption document staged");
        Ok(StagedFile { temp, target })
    }
}

#[async_trait::async_trait]
impl Sink<Extraction> for JsonFileSink {
    async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<Extraction>, PipelineError>> + Send + Unpin + 'static,
    {
        while let Some(item) = input.next().await {
            let env = item?;
            self.stage(&env.payload).await?.commit()?;
            observability::record_latency(env.received_at);
        }

        Ok(())
    }
}
