use std::{pin::Pin, time::SystemTime};

use consumption_store::domain::{ConsumptionDocument, Day, NormalizedRecord};
use futures::Stream;
use time::{Date, OffsetDateTime};

pub mod consumption;

pub use consumption::ConsumptionPipeline;

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub received_at: SystemTime,
}

impl<T> Envelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            payload,
            received_at: SystemTime::now(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("authentication rejected: {0}")]
    Auth(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
    #[error("sink error: {0}")]
    Sink(String),
    #[error("config error: {0}")]
    Config(String),
}

/// Which provider data set a run extracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retrieval {
    /// Most recent billing cycle. Invoiced readings are taken as final.
    LastInvoiced,
    /// Explicit inclusive date range. Estimated or empty readings are dropped.
    Interval { start: Date, end: Date },
}

impl Retrieval {
    pub fn filters_readings(&self) -> bool {
        matches!(self, Self::Interval { .. })
    }
}

/// The product of one run: the persisted document plus the UTC view of the same readings.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub document: ConsumptionDocument,
    pub normalized: Vec<Day<NormalizedRecord>>,
}

impl Extraction {
    /// UTC instant of the very first reading, used to name the output.
    pub fn first_instant(&self) -> Option<OffsetDateTime> {
        self.normalized.iter().flatten().next().map(|rec| rec.datetime)
    }
}

#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn stream(
        &self,
    ) -> Pin<Box<dyn Stream<Item = Result<Envelope<T>, PipelineError>> + Send>>;
}

#[async_trait::async_trait]
pub trait Sink<T>: Send + Sync {
    async fn run<S>(&self, input: S) -> Result<(), PipelineError>
    where
        S: Stream<Item = Result<Envelope<T>, PipelineError>> + Send + Unpin + 'static;
}
